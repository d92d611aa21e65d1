use crate::codec::{Codec, JsonCodec};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Polling period used when none is given.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_millis(1000);

/// How often a binding re-reads its key in the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollingInterval {
    /// Poll every period. A zero period means the default.
    Every(Duration),
    /// Never poll. Only the change notifier and cross-context events are
    /// observed, and TTL expiry is noticed only on load.
    Disabled,
}

impl PollingInterval {
    pub fn period(&self) -> Option<Duration> {
        match *self {
            PollingInterval::Every(period) if period.is_zero() => Some(DEFAULT_POLLING_INTERVAL),
            PollingInterval::Every(period) => Some(period),
            PollingInterval::Disabled => None,
        }
    }
}

impl Default for PollingInterval {
    fn default() -> Self {
        PollingInterval::Every(DEFAULT_POLLING_INTERVAL)
    }
}

/// Per-binding settings.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tincan_storage::{Options, PollingInterval};
///
/// let options = Options::<u32>::default()
///     .ttl(Duration::from_secs(60))
///     .polling_interval(PollingInterval::Every(Duration::from_millis(250)))
///     .check_ttl_only_on_load(true);
///
/// assert_eq!(options.ttl_duration(), Some(Duration::from_secs(60)));
/// ```
pub struct Options<T> {
    pub(crate) codec: Arc<dyn Codec<T>>,
    pub(crate) ttl: Option<Duration>,
    pub(crate) polling_interval: PollingInterval,
    pub(crate) check_ttl_only_on_load: bool,
}

impl<T> Options<T> {
    /// Options using `codec` instead of JSON. Works for any value type.
    pub fn with_codec(codec: impl Codec<T> + 'static) -> Self {
        Self {
            codec: Arc::new(codec),
            ttl: None,
            polling_interval: PollingInterval::default(),
            check_ttl_only_on_load: false,
        }
    }

    pub fn codec(mut self, codec: impl Codec<T> + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Expire non-initial values `ttl` after they are written. A zero TTL
    /// disables expiry.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = (!ttl.is_zero()).then_some(ttl);
        self
    }

    pub fn polling_interval(mut self, interval: PollingInterval) -> Self {
        self.polling_interval = interval;
        self
    }

    /// Check the TTL when loading only, never while polling.
    pub fn check_ttl_only_on_load(mut self, only_on_load: bool) -> Self {
        self.check_ttl_only_on_load = only_on_load;
        self
    }

    pub fn ttl_duration(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn polling(&self) -> PollingInterval {
        self.polling_interval
    }
}

impl<T> Default for Options<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    fn default() -> Self {
        Self::with_codec(JsonCodec::new())
    }
}

impl<T> Clone for Options<T> {
    fn clone(&self) -> Self {
        Self {
            codec: Arc::clone(&self.codec),
            ttl: self.ttl,
            polling_interval: self.polling_interval,
            check_ttl_only_on_load: self.check_ttl_only_on_load,
        }
    }
}

impl<T> std::fmt::Debug for Options<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("ttl", &self.ttl)
            .field("polling_interval", &self.polling_interval)
            .field("check_ttl_only_on_load", &self.check_ttl_only_on_load)
            .finish_non_exhaustive()
    }
}

/// Polling setting as written in a config file: a number of
/// milliseconds, or `false` to disable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PollingSetting {
    Millis(u64),
    Enabled(bool),
}

/// Binding settings loadable with serde.
///
/// ```json
/// { "ttl_ms": 60000, "polling_interval_ms": false, "check_ttl_only_on_load": true }
/// ```
///
/// Missing fields keep their defaults; `polling_interval_ms: null` also
/// means the default interval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindingConfig {
    pub ttl_ms: Option<u64>,
    pub polling_interval_ms: Option<PollingSetting>,
    pub check_ttl_only_on_load: bool,
}

impl BindingConfig {
    /// Apply these settings on top of `options`, keeping its codec.
    pub fn apply<T>(&self, options: Options<T>) -> Options<T> {
        let polling = match self.polling_interval_ms {
            None | Some(PollingSetting::Enabled(true)) => PollingInterval::default(),
            Some(PollingSetting::Enabled(false)) => PollingInterval::Disabled,
            Some(PollingSetting::Millis(ms)) => PollingInterval::Every(Duration::from_millis(ms)),
        };
        let options = options
            .polling_interval(polling)
            .check_ttl_only_on_load(self.check_ttl_only_on_load);
        match self.ttl_ms {
            Some(ms) => options.ttl(Duration::from_millis(ms)),
            None => Options { ttl: None, ..options },
        }
    }

    /// JSON-codec options with these settings.
    pub fn to_options<T>(&self) -> Options<T>
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        self.apply(Options::default())
    }
}
