//! Value codecs.
//!
//! A codec turns a typed value into the string stored inside an
//! [`Envelope`](crate::envelope::Envelope) and back. The envelope has its own
//! JSON layer on top, so a JSON codec output ends up double-encoded in the
//! backing store.

use crate::error::CodecError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Encode/decode pair for a binding's value type.
pub trait Codec<T>: Send + Sync {
    /// Encode a value. Expected to succeed for every well-formed value.
    fn encode(&self, value: &T) -> Result<String, CodecError>;

    /// Decode a stored string. May fail on malformed input.
    fn decode(&self, raw: &str) -> Result<T, CodecError>;
}

/// The default codec: `serde_json` in both directions.
///
/// # Examples
///
/// ```
/// use tincan_storage::codec::{Codec, JsonCodec};
///
/// let codec = JsonCodec::<Vec<u8>>::new();
/// let encoded = codec.encode(&vec![1, 2, 3]).unwrap();
/// assert_eq!(encoded, "[1,2,3]");
/// assert_eq!(codec.decode(&encoded).unwrap(), vec![1, 2, 3]);
/// ```
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonCodec")
    }
}

impl<T> Codec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<String, CodecError> {
        serde_json::to_string(value).map_err(CodecError::encode)
    }

    fn decode(&self, raw: &str) -> Result<T, CodecError> {
        serde_json::from_str(raw).map_err(CodecError::decode)
    }
}

type EncodeFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;
type DecodeFn<T> = Arc<dyn Fn(&str) -> Result<T, CodecError> + Send + Sync>;

/// A codec built from a pair of closures.
///
/// # Examples
///
/// ```
/// use tincan_storage::codec::{Codec, FnCodec};
/// use tincan_storage::error::CodecError;
///
/// let codec = FnCodec::new(
///     |n: &u32| n.to_string(),
///     |raw: &str| raw.parse::<u32>().map_err(|e| CodecError::Decode(e.to_string())),
/// );
/// assert_eq!(codec.encode(&7).unwrap(), "7");
/// assert!(codec.decode("seven").is_err());
/// ```
pub struct FnCodec<T> {
    encode: EncodeFn<T>,
    decode: DecodeFn<T>,
}

impl<T> FnCodec<T> {
    pub fn new<E, D>(encode: E, decode: D) -> Self
    where
        E: Fn(&T) -> String + Send + Sync + 'static,
        D: Fn(&str) -> Result<T, CodecError> + Send + Sync + 'static,
    {
        Self {
            encode: Arc::new(encode),
            decode: Arc::new(decode),
        }
    }
}

impl<T> Clone for FnCodec<T> {
    fn clone(&self) -> Self {
        Self {
            encode: Arc::clone(&self.encode),
            decode: Arc::clone(&self.decode),
        }
    }
}

impl<T> Codec<T> for FnCodec<T> {
    fn encode(&self, value: &T) -> Result<String, CodecError> {
        Ok((self.encode)(value))
    }

    fn decode(&self, raw: &str) -> Result<T, CodecError> {
        (self.decode)(raw)
    }
}
