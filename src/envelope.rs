//! The persisted entry format.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What is actually stored under a key: the codec output plus an optional
/// absolute expiry in epoch milliseconds.
///
/// ```text
/// {"value":"{\"count\":1}","expires":1700000000000}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
}

impl Envelope {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires: None,
        }
    }

    pub fn with_expiry(value: impl Into<String>, expires: i64) -> Self {
        Self {
            value: value.into(),
            expires: Some(expires),
        }
    }

    /// Parse a raw stored string. Anything that is not a well-formed
    /// envelope reads as "no entry".
    pub fn parse(raw: &str) -> Option<Self> {
        match serde_json::from_str(raw) {
            Ok(envelope) => Some(envelope),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring malformed storage envelope");
                None
            }
        }
    }

    pub fn to_raw(&self) -> String {
        // `Value`'s Display is infallible and does the string escaping.
        let value = Value::String(self.value.clone());
        match self.expires {
            Some(expires) => format!(r#"{{"value":{value},"expires":{expires}}}"#),
            None => format!(r#"{{"value":{value}}}"#),
        }
    }

    /// True once `now` is strictly past the expiry.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires.is_some_and(|expires| now > expires)
    }
}
