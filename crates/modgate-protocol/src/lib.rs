//! Shared protocol types for modgate.
//!
//! - **Types** ([`IncomingRequest`], [`RouteResponse`],
//!   [`ResponseEnvelope`], [`Warning`], ...) describe what flows through
//!   the dispatcher.
//! - **Codec** ([`Codec`], [`JsonCodec`]) turns them into bytes.
//! - **Errors** ([`ProtocolError`]) cover encoding and decoding.
//!
//! ```text
//! HTTP front (bytes) → Protocol (IncomingRequest) → Router / item events / mods
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    BackendErrorCode, IncomingRequest, ResponseEnvelope, RouteResponse,
    SessionId, Warning,
};
