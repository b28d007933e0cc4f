//! Core protocol types shared by every modgate layer.
//!
//! These are the structures a request is made of on its way in, and the
//! structures a response is made of on its way out. Routing, item events
//! and mods all speak in terms of these types; none of them knows about
//! sockets or HTTP libraries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifies the player session a request belongs to.
///
/// Game clients send this as an opaque string (usually a profile id), so
/// it is a newtype over `String` rather than a number. Serialized as the
/// bare string thanks to `#[serde(transparent)]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Creates a session id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The session used for requests that carry no session at all
    /// (launcher pings, bundle downloads before login).
    pub fn anonymous() -> Self {
        Self(String::new())
    }

    /// Whether this is the [`anonymous`](Self::anonymous) session.
    pub fn is_anonymous(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<anonymous>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// IncomingRequest
// ---------------------------------------------------------------------------

/// A request as the dispatcher sees it, independent of the transport.
///
/// The HTTP front builds one of these per request; tests build them by
/// hand. `body` is the raw request body; JSON decoding happens in the
/// dispatcher so that serializers can still see the original bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingRequest {
    /// HTTP method (`GET`, `POST`, `PUT`, ...).
    pub method: String,
    /// Path plus query string, exactly as received.
    pub url: String,
    /// The session this request belongs to.
    pub session: SessionId,
    /// Raw body bytes. Empty for `GET`.
    pub body: Vec<u8>,
}

impl IncomingRequest {
    /// Builds a `GET` request with an empty body.
    pub fn get(url: impl Into<String>, session: SessionId) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            session,
            body: Vec::new(),
        }
    }

    /// Builds a `POST` request carrying the given body.
    pub fn post(
        url: impl Into<String>,
        session: SessionId,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            method: "POST".to_string(),
            url: url.into(),
            session,
            body: body.into(),
        }
    }

    /// The path part of the URL (everything before `?`).
    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// RouteResponse
// ---------------------------------------------------------------------------

/// What a route handler produced.
///
/// Most handlers return JSON. A handler that needs a non-JSON writer
/// (binary bundle, image, notification stream) returns a short tag
/// instead; the dispatcher hands the tag to the serializer registry.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteResponse {
    /// A JSON document, written with `application/json`.
    Json(Value),
    /// Pre-rendered text, written verbatim.
    Text(String),
    /// A route-kind tag such as `"BUNDLE"`, resolved through the
    /// serializer registry.
    Tagged(String),
}

impl RouteResponse {
    /// Shorthand for [`RouteResponse::Tagged`].
    pub fn tagged(tag: impl Into<String>) -> Self {
        Self::Tagged(tag.into())
    }

    /// Returns the tag if this is a tagged response.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Tagged(tag) => Some(tag),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// A backend error code, as understood by the game client.
///
/// The client switches on the numeric value, so this is a transparent
/// newtype over `u32` with named constants for the codes the core itself
/// needs. Feature controllers may use any other value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendErrorCode(pub u32);

impl BackendErrorCode {
    /// No error.
    pub const NONE: Self = Self(0);
    /// Generic failure, used when a warning carries no usable code.
    pub const UNKNOWN_ERROR: Self = Self(200);
    /// The request body could not be decoded.
    pub const BAD_REQUEST: Self = Self(400);
    /// Resource not found (no route matched).
    pub const NOT_FOUND: Self = Self(404);
    /// Unhandled server-side failure.
    pub const INTERNAL_ERROR: Self = Self(500);
    /// The player's stash has no room for the result of an action.
    pub const NOT_ENOUGH_SPACE: Self = Self(1505);
}

impl Default for BackendErrorCode {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for BackendErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Warning
// ---------------------------------------------------------------------------

/// A soft failure produced while processing one action of a batch.
///
/// Warnings are a normal outcome, not an error: the action handler
/// records one and returns successfully. Whether the whole batch is
/// reported as failed depends on the warning codes (see the item-event
/// router's classification).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    /// Position of the action that produced this warning in its batch.
    pub index: usize,
    /// Backend error code.
    pub code: BackendErrorCode,
    /// Human-readable message.
    pub errmsg: String,
    /// Optional extra data for the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Warning {
    /// Creates a warning without extra data.
    pub fn new(
        index: usize,
        code: BackendErrorCode,
        errmsg: impl Into<String>,
    ) -> Self {
        Self {
            index,
            code,
            errmsg: errmsg.into(),
            data: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ResponseEnvelope
// ---------------------------------------------------------------------------

/// The JSON body wrapper every client-facing response uses:
///
/// ```text
/// { "err": 0, "errmsg": null, "data": { ... } }
/// ```
///
/// `err` is a [`BackendErrorCode`] (0 on success). `data` is present even
/// on failure when the handler had something useful to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    /// Error code, `0` on success.
    pub err: BackendErrorCode,
    /// Error message, `null` on success.
    pub errmsg: Option<String>,
    /// Response payload.
    pub data: Option<T>,
}

impl<T> ResponseEnvelope<T> {
    /// A successful response carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            err: BackendErrorCode::NONE,
            errmsg: None,
            data: Some(data),
        }
    }

    /// A failed response carrying `data` alongside the error.
    pub fn with_error(
        data: Option<T>,
        code: BackendErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            err: code,
            errmsg: Some(message.into()),
            data,
        }
    }

    /// Whether `err` is [`BackendErrorCode::NONE`].
    pub fn is_success(&self) -> bool {
        self.err == BackendErrorCode::NONE
    }
}

impl ResponseEnvelope<Value> {
    /// A failed response with no data.
    pub fn error(code: BackendErrorCode, message: impl Into<String>) -> Self {
        Self::with_error(None, code, message)
    }
}

// =========================================================================
// Tests
// =========================================================================
