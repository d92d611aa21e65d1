use super::listeners::{Listeners, Subscription};
use super::notifier::ChangeNotifier;
use super::timer::Timers;
use crate::binding::StorageHook;
use crate::clock::{Clock, SystemClock};
use crate::storage::{LocalStorage, MemoryStorage, StorageArea, StorageEvent};
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Identifier of a context within its origin.
pub type ContextId = usize;

type Inbox = Arc<Mutex<VecDeque<StorageEvent>>>;

pub(crate) struct OriginInner {
    pub(crate) store: MemoryStorage,
    clock: Arc<dyn Clock>,
    next_context: AtomicUsize,
    inboxes: Mutex<BTreeMap<ContextId, Inbox>>,
}

impl OriginInner {
    /// Queue `event` for every context of the origin except `writer`.
    pub(crate) fn broadcast(&self, writer: ContextId, event: StorageEvent) {
        let inboxes: Vec<Inbox> = self
            .inboxes
            .lock()
            .iter()
            .filter(|(id, _)| **id != writer)
            .map(|(_, inbox)| Arc::clone(inbox))
            .collect();

        tracing::trace!(key = %event.key, writer, receivers = inboxes.len(), "queued storage event");
        for inbox in inboxes {
            inbox.lock().push_back(event.clone());
        }
    }
}

/// A group of contexts sharing one persistent store, like the tabs of a
/// browser origin.
///
/// # Examples
///
/// ```
/// use tincan_storage::runtime::Origin;
/// use tincan_storage::storage::StorageArea;
///
/// let origin = Origin::new();
/// let tab1 = origin.open_context();
/// let tab2 = origin.open_context();
///
/// tab1.local_storage().set("theme", "dark").unwrap();
/// assert_eq!(tab2.local_storage().get("theme").unwrap().as_deref(), Some("dark"));
/// assert!(tab2.session_storage().get("theme").unwrap().is_none());
/// ```
#[derive(Clone)]
pub struct Origin {
    inner: Arc<OriginInner>,
}

impl Origin {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::from_parts(clock, MemoryStorage::new())
    }

    /// Build an origin around an existing persistent store.
    pub fn from_parts(clock: Arc<dyn Clock>, store: MemoryStorage) -> Self {
        Self {
            inner: Arc::new(OriginInner {
                store,
                clock,
                next_context: AtomicUsize::new(0),
                inboxes: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Open a new context (tab) on this origin.
    pub fn open_context(&self) -> Context {
        let id = self.inner.next_context.fetch_add(1, Ordering::SeqCst);
        let inbox: Inbox = Arc::new(Mutex::new(VecDeque::new()));
        self.inner.inboxes.lock().insert(id, Arc::clone(&inbox));
        tracing::debug!(context = id, "opened context");

        Context {
            inner: Arc::new(ContextInner {
                id,
                origin: self.clone(),
                local: Arc::new(LocalStorage::new(Arc::clone(&self.inner), id)),
                session: Arc::new(MemoryStorage::new()),
                notifier: ChangeNotifier::new(),
                storage_listeners: Listeners::new(),
                timers: Timers::new(),
                inbox,
            }),
        }
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.inner.clock)
    }

    /// The persistent store itself, bypassing every context.
    ///
    /// Writes made here reach bindings only through polling.
    pub fn store(&self) -> &MemoryStorage {
        &self.inner.store
    }

    /// Number of contexts still open.
    pub fn context_count(&self) -> usize {
        self.inner.inboxes.lock().len()
    }
}

impl Default for Origin {
    fn default() -> Self {
        Self::new()
    }
}

struct ContextInner {
    id: ContextId,
    origin: Origin,
    local: Arc<LocalStorage>,
    session: Arc<MemoryStorage>,
    notifier: ChangeNotifier,
    storage_listeners: Listeners<StorageEvent>,
    timers: Timers,
    inbox: Inbox,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        self.origin.inner.inboxes.lock().remove(&self.id);
        tracing::debug!(context = self.id, "closed context");
    }
}

/// One cooperative execution context: a browser tab, a window, a worker.
///
/// A context owns its session store, the change notifier its bindings
/// share, the listeners for storage events coming from sibling contexts
/// and the polling timers. Nothing runs on its own: the host calls
/// [`run_pending`](Context::run_pending) from its event loop.
///
/// Contexts are stacked per thread. [`Context::current`] returns the
/// innermost entered context, or a process-wide global one.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Context>> = const { RefCell::new(Vec::new()) };
}

impl Context {
    /// Run `f` with a context on a fresh private origin as the current
    /// context. Everything it created is gone once `f` returns.
    ///
    /// # Examples
    ///
    /// ```
    /// use tincan_storage::runtime::Context;
    /// use tincan_storage::{use_session_storage, Options};
    ///
    /// Context::scope(|| {
    ///     let (theme, set_theme) =
    ///         use_session_storage("theme", "light".to_string(), Options::default()).unwrap();
    ///     set_theme.set("dark".to_string()).unwrap();
    ///     assert_eq!(theme.get(), "dark");
    /// });
    /// ```
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        Origin::new().open_context().enter(f)
    }

    /// The process-wide fallback context.
    pub fn global() -> Context {
        static GLOBAL: OnceLock<Context> = OnceLock::new();
        GLOBAL.get_or_init(|| Origin::new().open_context()).clone()
    }

    /// The innermost entered context, or [`Context::global`].
    pub fn current() -> Context {
        CONTEXT_STACK
            .with(|stack| stack.borrow().last().cloned())
            .unwrap_or_else(Self::global)
    }

    /// Run `f` with this context as the current one.
    pub fn enter<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(self.clone()));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    pub fn origin(&self) -> &Origin {
        &self.inner.origin
    }

    pub fn now_ms(&self) -> i64 {
        self.inner.origin.inner.clock.now_ms()
    }

    /// This context's handle on the origin's persistent store.
    pub fn local_storage(&self) -> Arc<dyn StorageArea> {
        self.inner.local.clone()
    }

    /// This context's private session store.
    pub fn session_storage(&self) -> Arc<dyn StorageArea> {
        self.inner.session.clone()
    }

    /// Binding factory over the persistent store.
    pub fn local_storage_hook(&self) -> StorageHook {
        StorageHook::new(self, self.local_storage())
    }

    /// Binding factory over the session store.
    pub fn session_storage_hook(&self) -> StorageHook {
        StorageHook::new(self, self.session_storage())
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.inner.notifier
    }

    /// Listen for writes to `key` made by other contexts of the origin.
    pub fn on_storage<F>(&self, key: &str, callback: F) -> Subscription
    where
        F: Fn(&StorageEvent) + Send + Sync + 'static,
    {
        self.inner.storage_listeners.add(key, callback)
    }

    /// Call `tick` every `period`, starting one period from now.
    pub fn set_interval<F>(&self, period: Duration, tick: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.timers.set_interval(self.now_ms(), period, tick)
    }

    /// Deliver queued storage events, then fire due timers.
    ///
    /// Returns the number of callbacks that ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let event = self.inner.inbox.lock().pop_front();
            let Some(event) = event else { break };
            tracing::trace!(context = self.inner.id, key = %event.key, "delivering storage event");
            ran += self.inner.storage_listeners.emit(&event.key, &event);
        }
        ran + self.inner.timers.fire_due(self.now_ms())
    }

    /// Storage events waiting for [`run_pending`](Context::run_pending).
    pub fn pending_events(&self) -> usize {
        self.inner.inbox.lock().len()
    }

    /// Earliest timer deadline, for hosts that sleep between turns.
    pub fn next_deadline(&self) -> Option<i64> {
        self.inner.timers.next_deadline()
    }

    /// Number of live interval timers.
    pub fn timer_count(&self) -> usize {
        self.inner.timers.len()
    }

    /// Number of live cross-context listeners for `key`.
    pub fn storage_listener_count(&self, key: &str) -> usize {
        self.inner.storage_listeners.count(key)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").field("id", &self.inner.id).finish()
    }
}
