//! # Tincan Storage
//!
//! Reactive bindings between application state and a key-value store.
//!
//! A binding owns a typed value backed by one storage key. Writing through
//! it persists the value; every other binding to the key sees the change:
//!
//! - in the same context, synchronously, through the context's
//!   [`ChangeNotifier`](runtime::ChangeNotifier);
//! - in sibling contexts of the same [`Origin`](runtime::Origin), through
//!   queued storage events delivered by
//!   [`Context::run_pending`](runtime::Context::run_pending);
//! - for anything else that touches the store, through a polling timer.
//!
//! Values may carry a TTL, after which they fall back to the binding's
//! initial value.
//!
//! ## Layers
//!
//! - [`codec`] - typed value to string and back (JSON by default)
//! - [`envelope`] - the stored `{"value": .., "expires": ..}` wrapper
//! - [`storage`] - the `get`/`set` store interface and its adapters
//! - [`runtime`] - origins, contexts, notifier, timers
//! - [`binding`] - the bindings themselves
//!
//! ```
//! use tincan_storage::runtime::Origin;
//! use tincan_storage::Options;
//!
//! let origin = Origin::new();
//! let tab = origin.open_context();
//! let hook = tab.local_storage_hook();
//!
//! let (first, set_first) = hook.use_storage("count", 0, Options::default()).unwrap();
//! let (second, _) = hook.use_storage("count", 0, Options::default()).unwrap();
//!
//! set_first.set(1).unwrap();
//! assert_eq!(first.get(), 1);
//! assert_eq!(second.get(), 1);
//! ```

pub mod binding;
pub mod clock;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod runtime;
pub mod storage;

// Re-export main types for convenience
pub use binding::{
    use_local_storage, use_session_storage, Binding, BindingConfig, Options, PollingInterval,
    Setter, StorageHook,
};
pub use error::{Error, Result};
pub use runtime::{Context, Origin, Subscription};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        // Basic smoke test
        Context::scope(|| {
            let (value, set_value) = use_session_storage("n", 0, Options::default()).unwrap();
            assert_eq!(value.get(), 0);
            set_value.set(42).unwrap();
            assert_eq!(value.get(), 42);
        });
    }
}
