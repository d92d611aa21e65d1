//! Reactive storage bindings.
//!
//! A [`Binding`] keeps one value in step with one storage key. Bindings to
//! the same key never talk to each other directly; they meet in the store
//! and in their context's [`ChangeNotifier`](crate::runtime::ChangeNotifier).

mod binding;
mod hook;
mod options;

pub use binding::{Binding, Setter};
pub use hook::{use_local_storage, use_session_storage, StorageHook};
pub use options::{BindingConfig, Options, PollingInterval, PollingSetting, DEFAULT_POLLING_INTERVAL};
