use super::options::Options;
use crate::clock::duration_ms;
use crate::codec::Codec;
use crate::envelope::Envelope;
use crate::error::Result;
use crate::runtime::{Context, Listeners, Subscription};
use crate::storage::{StorageArea, StorageEvent};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

const WATCH_TOPIC: &str = "value";

struct State<T> {
    /// Envelope the current value came from. Replaced on every write, even
    /// when the store write itself is skipped.
    envelope: Option<Envelope>,
    /// Raw string last read from the store.
    last_seen: Option<String>,
    value: T,
}

pub(crate) struct BindingInner<T> {
    key: String,
    initial: T,
    encoded_initial: String,
    codec: Arc<dyn Codec<T>>,
    ttl: Option<Duration>,
    check_ttl_only_on_load: bool,
    storage: Arc<dyn StorageArea>,
    context: Context,
    state: Mutex<State<T>>,
    watchers: Listeners<T>,
}

impl<T> BindingInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Decode an envelope, falling back to the initial value.
    fn decode(&self, envelope: &Envelope) -> T {
        match self.codec.decode(&envelope.value) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "stored value failed to decode, using initial value");
                self.initial.clone()
            }
        }
    }

    /// Make `envelope`/`value` the binding's current state, notifying
    /// watchers if the encoded value changed.
    fn adopt(&self, envelope: Envelope, value: T, seen: Option<Option<String>>) {
        let changed = {
            let mut state = self.state.lock();
            let changed = state
                .envelope
                .as_ref()
                .map_or(true, |current| current.value != envelope.value);
            state.envelope = Some(envelope);
            state.value = value.clone();
            if let Some(raw) = seen {
                state.last_seen = raw;
            }
            changed
        };

        if changed {
            self.watchers.emit(WATCH_TOPIC, &value);
        }
    }

    /// Write `value` through to storage.
    ///
    /// The binding's own state always takes the new value. The store is
    /// only written, and the change notifier only fired, when the stored
    /// encoded value differs from the new one.
    fn write(&self, value: T) -> Result<()> {
        let encoded = self.codec.encode(&value)?;
        let expires = match self.ttl {
            Some(ttl) if encoded != self.encoded_initial => {
                Some(self.context.now_ms().saturating_add(duration_ms(ttl)))
            }
            _ => None,
        };
        let next = Envelope {
            value: encoded,
            expires,
        };

        self.adopt(next.clone(), value, None);

        let stored = self.storage.get(&self.key)?;
        let stored_value = stored.as_deref().and_then(Envelope::parse).map(|e| e.value);
        if stored_value.as_deref() == Some(next.value.as_str()) {
            tracing::debug!(key = %self.key, "value unchanged, skipping write");
            return Ok(());
        }

        self.storage.set(&self.key, &next.to_raw())?;
        self.context.notifier().dispatch(&self.key);
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        self.write(self.initial.clone())
    }

    /// Handle a raw string read from the store: seed it when absent or
    /// unreadable, reset it when expired, decode it otherwise.
    fn observe(&self, raw: Option<String>) -> Result<()> {
        let envelope = raw.as_deref().and_then(Envelope::parse);
        match envelope {
            None => {
                tracing::debug!(key = %self.key, "no entry, seeding initial value");
                self.state.lock().last_seen = raw;
                self.reset()
            }
            Some(envelope) if envelope.is_expired(self.context.now_ms()) => {
                tracing::debug!(key = %self.key, expires = ?envelope.expires, "entry expired, resetting");
                self.state.lock().last_seen = raw;
                self.reset()
            }
            Some(envelope) => {
                let value = self.decode(&envelope);
                self.adopt(envelope, value, Some(raw));
                Ok(())
            }
        }
    }

    /// Re-read the store. A changed raw string is observed afresh;
    /// otherwise the cached expiry is checked unless TTL is load-only.
    fn check(&self) -> Result<()> {
        let raw = self.storage.get(&self.key)?;
        let (unchanged, expired) = {
            let state = self.state.lock();
            let expired = state
                .envelope
                .as_ref()
                .is_some_and(|envelope| envelope.is_expired(self.context.now_ms()));
            (state.last_seen == raw, expired)
        };

        if !unchanged {
            return self.observe(raw);
        }
        if expired && !self.check_ttl_only_on_load {
            tracing::debug!(key = %self.key, "cached entry expired, resetting");
            return self.reset();
        }
        Ok(())
    }

    /// Background checks have nobody to return an error to.
    fn check_logged(&self, source: &'static str) {
        if let Err(err) = self.check() {
            tracing::warn!(key = %self.key, source, error = %err, "storage check failed");
        }
    }
}

/// A live, two-way binding between a value and one storage key.
///
/// Created by [`StorageHook::use_storage`](super::StorageHook::use_storage).
/// While the binding lives it follows writes from other bindings of the
/// same key (immediately in the same context, on the next
/// [`run_pending`](Context::run_pending) elsewhere), polls the store and
/// enforces the TTL. Dropping it releases its listeners and timer.
pub struct Binding<T> {
    inner: Arc<BindingInner<T>>,
    _subscriptions: Vec<Subscription>,
}

impl<T> Binding<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn create(
        context: &Context,
        storage: Arc<dyn StorageArea>,
        key: &str,
        initial: T,
        options: Options<T>,
    ) -> Result<Self> {
        let encoded_initial = options.codec.encode(&initial)?;
        let inner = Arc::new(BindingInner {
            key: key.to_string(),
            initial: initial.clone(),
            encoded_initial,
            codec: options.codec,
            ttl: options.ttl,
            check_ttl_only_on_load: options.check_ttl_only_on_load,
            storage,
            context: context.clone(),
            state: Mutex::new(State {
                envelope: None,
                last_seen: None,
                value: initial,
            }),
            watchers: Listeners::new(),
        });

        let raw = inner.storage.get(key)?;
        inner.observe(raw)?;

        let mut subscriptions = Vec::with_capacity(3);
        let weak = Arc::downgrade(&inner);
        subscriptions.push(context.notifier().subscribe(key, {
            let weak = Weak::clone(&weak);
            move || {
                if let Some(inner) = weak.upgrade() {
                    inner.check_logged("change notifier");
                }
            }
        }));
        subscriptions.push(context.on_storage(key, {
            let weak = Weak::clone(&weak);
            move |_event: &StorageEvent| {
                if let Some(inner) = weak.upgrade() {
                    inner.check_logged("storage event");
                }
            }
        }));
        if let Some(period) = options.polling_interval.period() {
            subscriptions.push(context.set_interval(period, move || {
                if let Some(inner) = weak.upgrade() {
                    inner.check_logged("polling");
                }
            }));
        }

        tracing::debug!(key, context = context.id(), "binding created");
        Ok(Self {
            inner,
            _subscriptions: subscriptions,
        })
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// The current value.
    pub fn get(&self) -> T {
        self.inner.state.lock().value.clone()
    }

    /// Read the current value without cloning it. `f` must not call back
    /// into this binding.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let state = self.inner.state.lock();
        f(&state.value)
    }

    pub fn initial(&self) -> &T {
        &self.inner.initial
    }

    /// Expiry of the current value in epoch milliseconds, if any.
    pub fn expires_at(&self) -> Option<i64> {
        self.inner
            .state
            .lock()
            .envelope
            .as_ref()
            .and_then(|envelope| envelope.expires)
    }

    /// Set a new value. See [`Setter::set`].
    pub fn set(&self, value: T) -> Result<()> {
        self.inner.write(value)
    }

    /// Modify a copy of the current value and write it back.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> Result<()> {
        let mut value = self.get();
        f(&mut value);
        self.set(value)
    }

    /// A cloneable write handle.
    pub fn setter(&self) -> Setter<T> {
        Setter {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Re-read the store now, the same way the polling timer does.
    ///
    /// This may write: a missing or expired entry is re-seeded with the
    /// initial value.
    pub fn refresh(&self) -> Result<()> {
        self.inner.check()
    }

    /// Call `callback` with the new value every time it changes.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.inner.watchers.add(WATCH_TOPIC, callback)
    }

    pub fn context(&self) -> &Context {
        &self.inner.context
    }
}

impl<T> std::fmt::Debug for Binding<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Binding")
            .field("key", &self.inner.key)
            .field("value", &state.value)
            .field("envelope", &state.envelope)
            .finish()
    }
}

/// Write half of a binding.
///
/// Writes made after the [`Binding`] is dropped still reach the store and
/// the other bindings, but no listener of the dropped binding runs again.
pub struct Setter<T> {
    inner: Arc<BindingInner<T>>,
}

impl<T> Setter<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Encode `value` and write it to the store.
    ///
    /// With a TTL configured, any value other than the initial one is
    /// stamped with an expiry; writing the initial value clears it. When
    /// the store already holds the same encoded value nothing is written
    /// and no notification is sent, but the binding still takes `value`.
    pub fn set(&self, value: T) -> Result<()> {
        self.inner.write(value)
    }
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
