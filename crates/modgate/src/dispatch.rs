//! The top-level request dispatcher.
//!
//! ```text
//! IncomingRequest
//!   │ strip "?retry=", decode body
//!   ├─ ITEM_EVENT_ROUTE ─▶ EventActionRouter ─▶ envelope
//!   └─ RouteTable::resolve
//!        ├─ miss ──────────▶ 404 envelope
//!        ├─ Json / Text ───▶ written as is
//!        └─ Tagged(tag) ───▶ SerializerRegistry ─▶ serializer writes
//! ```

use modgate_context::ContextKind;
use modgate_events::{EventError, ITEM_EVENT_ROUTE};
use modgate_protocol::{
    BackendErrorCode, Codec, IncomingRequest, ResponseEnvelope, RouteResponse,
};
use modgate_router::ResponseSink;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::{ModgateError, ModgateServer};

const RETRY_MARKER: &str = "?retry=";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Removes the client's `?retry=N` suffix so retries hit the same route.
pub fn strip_retry(url: &str) -> &str {
    match url.find(RETRY_MARKER) {
        Some(at) => &url[..at],
        None => url,
    }
}

impl ModgateServer {
    /// Handles one request, writing the whole response to `sink`.
    ///
    /// Route misses, handler failures and malformed bodies become error
    /// envelopes, not `Err`.
    ///
    /// # Errors
    ///
    /// Only failures to encode or write the response itself. A failing
    /// serializer gets a 500 envelope like a failing handler.
    pub async fn dispatch(
        &self,
        request: &IncomingRequest,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), ModgateError> {
        let url = strip_retry(&request.url);
        let path = url.split('?').next().unwrap_or_default();
        let session = &request.session;
        debug!(%session, method = %request.method, %url, "dispatching");

        let body = match self.codec.decode_body(&request.body) {
            Ok(body) => body,
            Err(err) => {
                warn!(%session, %url, error = %err, "malformed request body");
                let envelope = ResponseEnvelope::error(BackendErrorCode::BAD_REQUEST, err.to_string());
                return self.write_json(sink, 400, &envelope).await;
            }
        };

        if !session.is_anonymous() {
            self.context.add_value(ContextKind::SessionId, session.clone());
        }

        if path == ITEM_EVENT_ROUTE {
            return self.dispatch_item_events(&body, request, sink).await;
        }

        let Some(route) = self.routes.resolve(path) else {
            warn!(%session, %url, "no route matched");
            let envelope = ResponseEnvelope::error(
                BackendErrorCode::NOT_FOUND,
                format!("no route for {path}"),
            );
            return self.write_json(sink, 404, &envelope).await;
        };
        debug!(matched = route.matched, top_level = route.top_level, dynamic = route.dynamic, "route resolved");

        let response = match route.handler.handle(url, &body, session).await {
            Ok(response) => response,
            Err(err) => {
                error!(%session, %url, error = %err, "route handler failed");
                return self.internal_error(sink, "route handler failed").await;
            }
        };

        match response {
            RouteResponse::Json(value) => self.write_json(sink, 200, &value).await,
            RouteResponse::Text(text) => write_bytes(sink, text.as_bytes()).await,
            RouteResponse::Tagged(tag) => {
                let Some(serializer) = self.serializers.resolve(&tag) else {
                    error!(%session, %url, %tag, "no serializer for route tag");
                    return self.internal_error(sink, "no serializer for response").await;
                };
                match serializer.serialize(session, request, sink, &body).await {
                    Ok(()) => Ok(()),
                    Err(err) => {
                        error!(%session, %url, %tag, error = %err, "serializer failed");
                        self.internal_error(sink, "serializer failed").await
                    }
                }
            }
        }
    }

    async fn dispatch_item_events(
        &self,
        body: &Value,
        request: &IncomingRequest,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), ModgateError> {
        let session = &request.session;
        match self.events.handle_raw(body, session).await {
            Ok(outcome) => self.write_json(sink, 200, &outcome.into_envelope()).await,
            Err(EventError::InvalidBatch(err)) => {
                warn!(%session, error = %err, "invalid item event batch");
                let envelope = ResponseEnvelope::error(BackendErrorCode::BAD_REQUEST, err.to_string());
                self.write_json(sink, 400, &envelope).await
            }
            Err(err) => {
                error!(%session, error = %err, "item event batch aborted");
                self.internal_error(sink, "item event batch failed").await
            }
        }
    }

    async fn internal_error(
        &self,
        sink: &mut dyn ResponseSink,
        message: &str,
    ) -> Result<(), ModgateError> {
        let envelope = ResponseEnvelope::error(BackendErrorCode::INTERNAL_ERROR, message);
        self.write_json(sink, 500, &envelope).await
    }

    async fn write_json<T: Serialize>(
        &self,
        sink: &mut dyn ResponseSink,
        status: u16,
        value: &T,
    ) -> Result<(), ModgateError> {
        let bytes = self.codec.encode(value)?;
        sink.set_status(status);
        sink.set_header("content-type", JSON_CONTENT_TYPE);
        write_bytes(sink, &bytes).await
    }
}

async fn write_bytes(sink: &mut dyn ResponseSink, bytes: &[u8]) -> Result<(), ModgateError> {
    sink.write(bytes)
        .await
        .map_err(|err| ModgateError::ResponseWrite(err.into()))
}
