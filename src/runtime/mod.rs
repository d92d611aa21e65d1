//! Host model for bindings.
//!
//! An [`Origin`] owns the persistent store shared by its contexts. Each
//! [`Context`] carries the per-context machinery bindings coordinate
//! through: the [`ChangeNotifier`], cross-context storage listeners and
//! polling timers.

mod context;
mod listeners;
mod notifier;
mod timer;

pub use context::{Context, ContextId, Origin};
pub use listeners::Subscription;
pub use notifier::ChangeNotifier;

pub(crate) use context::OriginInner;
pub(crate) use listeners::Listeners;
