//! Error types for the protocol layer.
//!
//! Each modgate crate defines its own error enum, so a `ProtocolError`
//! always means "bytes did not turn into the expected type" (or the
//! reverse), never a routing or loading problem.

/// Errors that can occur while encoding or decoding protocol values.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust value).
    ///
    /// Common causes: malformed JSON, missing required fields, or a
    /// request body sent to a route that expects a different shape.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
