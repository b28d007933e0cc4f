//! HTTP front: every request, whatever its path, goes through
//! [`ModgateServer::dispatch`].

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{CONTENT_TYPE, COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use modgate_protocol::{IncomingRequest, SessionId};
use modgate_router::BufferedResponse;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::{ModgateError, ModgateServer};

/// Cookie the game client keeps its session in.
pub const SESSION_COOKIE: &str = "PHPSESSID";
/// Header some clients send the session in instead.
pub const SESSION_HEADER: &str = "sessionid";

/// Reads the session from the `PHPSESSID` cookie, then the `sessionid`
/// header. Requests carrying neither are anonymous.
pub fn session_from_headers(headers: &HeaderMap) -> SessionId {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string());

    from_cookie
        .or_else(|| {
            headers
                .get(SESSION_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        })
        .map(SessionId::from)
        .unwrap_or_else(SessionId::anonymous)
}

impl ModgateServer {
    /// Builds the axum router serving this server.
    pub fn http_router(self: Arc<Self>) -> Router {
        Router::new().fallback(handle_request).with_state(self)
    }

    /// Binds `config.bind` and serves until the process is stopped.
    pub async fn serve(self) -> Result<(), ModgateError> {
        let listener = TcpListener::bind(&self.config.bind).await?;
        self.run(listener).await
    }

    /// Starts the update scheduler and serves HTTP on `listener` until
    /// the process is stopped.
    pub async fn run(self, listener: TcpListener) -> Result<(), ModgateError> {
        self.run_until(listener, std::future::pending()).await
    }

    /// Like [`run`](Self::run), stopping gracefully once `shutdown`
    /// completes. The update scheduler is shut down afterwards.
    pub async fn run_until<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ModgateError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let updates = self.spawn_updates();
        let app = Arc::new(self).http_router();

        info!(addr = ?listener.local_addr().ok(), "modgate listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Some(updates) = updates {
            updates.shutdown().await?;
        }
        info!("modgate stopped");
        Ok(())
    }
}

async fn handle_request(
    State(server): State<Arc<ModgateServer>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let url = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let request = IncomingRequest {
        method: method.as_str().to_string(),
        url,
        session: session_from_headers(&headers),
        body: body.to_vec(),
    };

    let mut buffered = BufferedResponse::new();
    if let Err(err) = server.dispatch(&request, &mut buffered).await {
        error!(url = %request.url, error = %err, "dispatch failed");
        return (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response();
    }
    into_response(buffered)
}

fn into_response(buffered: BufferedResponse) -> Response {
    let status = StatusCode::from_u16(buffered.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = Response::new(Body::from(buffered.body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for (name, value) in buffered.headers {
        match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(%name, "dropping invalid response header"),
        }
    }
    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    }
    response
}
