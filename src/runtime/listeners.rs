use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct ListenerTable<E> {
    next_id: usize,
    topics: HashMap<String, BTreeMap<usize, Callback<E>>>,
}

impl<E> ListenerTable<E> {
    fn contains(&self, topic: &str, id: usize) -> bool {
        self.topics
            .get(topic)
            .is_some_and(|listeners| listeners.contains_key(&id))
    }

    fn remove(&mut self, topic: &str, id: usize) {
        if let Some(listeners) = self.topics.get_mut(topic) {
            listeners.remove(&id);
            if listeners.is_empty() {
                self.topics.remove(topic);
            }
        }
    }
}

/// Registry of callbacks grouped by topic.
///
/// Adding a listener hands back a [`Subscription`]; the listener stays
/// registered exactly as long as the subscription lives.
pub(crate) struct Listeners<E> {
    table: Arc<Mutex<ListenerTable<E>>>,
}

impl<E: 'static> Listeners<E> {
    pub(crate) fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(ListenerTable {
                next_id: 0,
                topics: HashMap::new(),
            })),
        }
    }

    pub(crate) fn add<F>(&self, topic: &str, callback: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = {
            let mut table = self.table.lock();
            let id = table.next_id;
            table.next_id += 1;
            table
                .topics
                .entry(topic.to_string())
                .or_default()
                .insert(id, Arc::new(callback));
            id
        };

        let table: Weak<Mutex<ListenerTable<E>>> = Arc::downgrade(&self.table);
        let topic = topic.to_string();
        Subscription::new(move || {
            if let Some(table) = table.upgrade() {
                table.lock().remove(&topic, id);
            }
        })
    }

    /// Call every listener of `topic`. Returns how many ran.
    ///
    /// The table lock is not held while callbacks run, so a callback may
    /// emit, subscribe or unsubscribe. A listener removed by an earlier
    /// callback in the same round is skipped.
    pub(crate) fn emit(&self, topic: &str, event: &E) -> usize {
        let snapshot: Vec<(usize, Callback<E>)> = {
            let table = self.table.lock();
            match table.topics.get(topic) {
                Some(listeners) => listeners
                    .iter()
                    .map(|(id, callback)| (*id, Arc::clone(callback)))
                    .collect(),
                None => return 0,
            }
        };

        let mut ran = 0;
        for (id, callback) in snapshot {
            if !self.table.lock().contains(topic, id) {
                continue;
            }
            callback(event);
            ran += 1;
        }
        ran
    }

    pub(crate) fn count(&self, topic: &str) -> usize {
        self.table.lock().topics.get(topic).map_or(0, BTreeMap::len)
    }
}

/// RAII guard for a registered listener or timer.
///
/// Dropping it unregisters; nothing fires afterwards.
#[must_use = "dropping a Subscription unregisters it immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Unregister now. Same as dropping.
    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
