//! Key-value storage adapters.
//!
//! Bindings only ever talk to a [`StorageArea`]: `get` a raw string or `set`
//! one. Which store sits behind it makes no difference to the binding logic.
//!
//! - [`LocalStorage`] - a context's handle on its origin's persistent store,
//!   shared by every context of the origin. Writes that change a value are
//!   announced to the *other* contexts as a [`StorageEvent`].
//! - [`MemoryStorage`] - a plain in-memory map; each context's session store
//!   is one of these.
//! - [`FnStorage`] - wraps a `get` closure and a `set` closure.

mod func;
mod local;
mod memory;

pub use func::FnStorage;
pub use local::LocalStorage;
pub use memory::MemoryStorage;

use crate::error::StorageError;

/// Uniform interface over a string key-value store.
///
/// No transactional guarantees: concurrent writers race and the last write
/// wins. Errors are failures of the store itself and are passed through to
/// whoever triggered the operation.
pub trait StorageArea: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Cross-context change notification, delivered to every context of an
/// origin except the one that made the write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}
