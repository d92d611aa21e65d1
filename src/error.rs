//! Error types.
//!
//! Only two kinds of failure ever reach a caller: the backing store refused
//! an operation, or a codec could not encode a value. Everything else a
//! binding runs into (missing entries, corrupt envelopes, undecodable
//! payloads, expired entries) degrades to the binding's initial value.

/// Result type for storage binding operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a [`StorageArea`](crate::storage::StorageArea).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    /// Writing the entry would exceed the store's capacity.
    #[error("quota exceeded writing '{key}' (limit {limit} bytes)")]
    QuotaExceeded { key: String, limit: usize },

    /// Any other failure of the underlying store.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Create a backend error from anything printable.
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend(reason.into())
    }
}

/// Failure reported by a [`Codec`](crate::codec::Codec).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode value: {0}")]
    Encode(String),

    #[error("failed to decode value: {0}")]
    Decode(String),
}

impl CodecError {
    pub(crate) fn encode(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }

    pub(crate) fn decode(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Errors surfaced by bindings and hooks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
