//! Codec trait and the JSON implementation.
//!
//! A codec converts between Rust values and raw bytes. The dispatcher
//! decodes request bodies and encodes response envelopes through a
//! [`Codec`], so the rest of the core never calls `serde_json` directly.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::ProtocolError;

/// Encodes Rust values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because a single codec instance is shared by
/// every request task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or do
    /// not match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Decodes a request body into a loose JSON document.
    ///
    /// Game clients send `GET` requests with no body and some `POST`s with
    /// an empty one; both decode to `Value::Null` instead of failing.
    fn decode_body(&self, data: &[u8]) -> Result<Value, ProtocolError> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        self.decode(data)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// ## Example
///
/// ```rust
/// use modgate_protocol::{BackendErrorCode, Codec, JsonCodec, ResponseEnvelope};
///
/// let codec = JsonCodec;
/// let env = ResponseEnvelope::error(BackendErrorCode::NOT_FOUND, "missing");
/// let bytes = codec.encode(&env).unwrap();
/// let back: ResponseEnvelope<serde_json::Value> = codec.decode(&bytes).unwrap();
/// assert_eq!(env, back);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
