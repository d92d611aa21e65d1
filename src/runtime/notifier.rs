use super::listeners::{Listeners, Subscription};

/// In-context broadcast announcing that a key was written.
///
/// Events are namespaced per key as `storageChange.<key>` and carry no
/// payload: listeners are expected to go and re-read the store.
pub struct ChangeNotifier {
    listeners: Listeners<()>,
}

impl ChangeNotifier {
    pub(crate) fn new() -> Self {
        Self {
            listeners: Listeners::new(),
        }
    }

    /// Event name used for `key`.
    pub fn event_name(key: &str) -> String {
        format!("storageChange.{key}")
    }

    pub fn subscribe<F>(&self, key: &str, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners
            .add(&Self::event_name(key), move |_: &()| callback())
    }

    /// Synchronously run every listener for `key`. Returns how many ran.
    pub fn dispatch(&self, key: &str) -> usize {
        let event = Self::event_name(key);
        let ran = self.listeners.emit(&event, &());
        tracing::trace!(event = %event, listeners = ran, "dispatched change");
        ran
    }

    pub fn listener_count(&self, key: &str) -> usize {
        self.listeners.count(&Self::event_name(key))
    }
}
