//! The route handler contract.
//!
//! Feature controllers (trading, weather, notes, ...) live outside the
//! core. All the router needs from them is something it can call with
//! the URL, the decoded body and the session, and that eventually yields
//! a [`RouteResponse`].

use std::future::Future;

use async_trait::async_trait;
use modgate_protocol::{RouteResponse, SessionId};
use serde_json::Value;

/// Services one route.
///
/// Implement it on a controller struct, or pass an `async` closure: every
/// `Fn(String, Value, SessionId) -> impl Future<Output = anyhow::Result<RouteResponse>>`
/// is a handler already.
///
/// Errors are not caught by the router. They travel back to the
/// dispatcher, which turns them into a 500 response.
///
/// # Example
///
/// ```rust
/// use modgate_protocol::{RouteResponse, SessionId};
/// use modgate_router::StaticRouter;
/// use serde_json::{json, Value};
///
/// let mut router = StaticRouter::new();
/// router
///     .register(
///         "/client/weather",
///         |_url: String, _body: Value, _session: SessionId| async move {
///             anyhow::Ok(RouteResponse::Json(json!({"temp": 14})))
///         },
///     )
///     .unwrap();
/// assert!(router.resolve("/client/weather").is_some());
/// ```
#[async_trait]
pub trait RouteHandler: Send + Sync {
    /// Handles one request.
    async fn handle(
        &self,
        url: &str,
        body: &Value,
        session: &SessionId,
    ) -> anyhow::Result<RouteResponse>;
}

#[async_trait]
impl<F, Fut> RouteHandler for F
where
    F: Fn(String, Value, SessionId) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<RouteResponse>> + Send + 'static,
{
    async fn handle(
        &self,
        url: &str,
        body: &Value,
        session: &SessionId,
    ) -> anyhow::Result<RouteResponse> {
        (self)(url.to_string(), body.clone(), session.clone()).await
    }
}
