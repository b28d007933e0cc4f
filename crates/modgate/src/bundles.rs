//! Built-in routes and serializer that serve mod asset bundles.
//!
//! - `GET /singleplayer/bundles`: JSON list of every registered bundle
//! - any path containing `.bundle`: the file itself, through the
//!   [`BUNDLE_TAG`] serializer

use std::sync::Arc;

use async_trait::async_trait;
use modgate_mods::BundleRegistry;
use modgate_protocol::{
    BackendErrorCode, Codec, IncomingRequest, JsonCodec, ResponseEnvelope, RouteResponse, SessionId,
};
use modgate_router::{DynamicRouter, ResponseSink, RouteHandler, Serializer, StaticRouter};
use serde_json::Value;

/// Route-kind tag of bundle downloads.
pub const BUNDLE_TAG: &str = "BUNDLE";

/// Static path listing the registered bundles.
pub const BUNDLE_LIST_ROUTE: &str = "/singleplayer/bundles";

/// Dynamic fragment matching bundle downloads.
pub const BUNDLE_FRAGMENT: &str = ".bundle";

struct BundleList {
    bundles: Arc<BundleRegistry>,
}

#[async_trait]
impl RouteHandler for BundleList {
    async fn handle(
        &self,
        _url: &str,
        _body: &Value,
        _session: &SessionId,
    ) -> anyhow::Result<RouteResponse> {
        Ok(RouteResponse::Json(serde_json::to_value(self.bundles.bundles())?))
    }
}

struct BundleDownload;

#[async_trait]
impl RouteHandler for BundleDownload {
    async fn handle(
        &self,
        _url: &str,
        _body: &Value,
        _session: &SessionId,
    ) -> anyhow::Result<RouteResponse> {
        Ok(RouteResponse::tagged(BUNDLE_TAG))
    }
}

/// Streams the bundle file a request names.
pub struct BundleSerializer {
    bundles: Arc<BundleRegistry>,
}

impl BundleSerializer {
    pub fn new(bundles: Arc<BundleRegistry>) -> Self {
        Self { bundles }
    }
}

#[async_trait]
impl Serializer for BundleSerializer {
    fn can_handle(&self, tag: &str) -> bool {
        tag == BUNDLE_TAG
    }

    async fn serialize(
        &self,
        session: &SessionId,
        request: &IncomingRequest,
        sink: &mut dyn ResponseSink,
        _body: &Value,
    ) -> anyhow::Result<()> {
        let Some(bundle) = self.bundles.find_by_url(&request.url) else {
            tracing::warn!(%session, url = %request.url, "no bundle registered for url");
            let envelope = ResponseEnvelope::error(BackendErrorCode::NOT_FOUND, "bundle not found");
            sink.set_status(404);
            sink.set_header("content-type", "application/json");
            return sink.write(&JsonCodec.encode(&envelope)?).await;
        };

        let bytes = tokio::fs::read(&bundle.path).await?;
        tracing::debug!(%session, key = %bundle.key, size = bytes.len(), "serving bundle");
        sink.set_header("content-type", "application/octet-stream");
        sink.write(&bytes).await
    }
}

/// The routers serving bundles, in registration order: the list route
/// first, then the download fragment.
pub(crate) fn bundle_routers(
    bundles: &Arc<BundleRegistry>,
) -> Result<(StaticRouter, DynamicRouter), modgate_router::RouterError> {
    let mut list = StaticRouter::new();
    list.register(
        BUNDLE_LIST_ROUTE,
        BundleList {
            bundles: Arc::clone(bundles),
        },
    )?;

    let mut download = DynamicRouter::new();
    download.register(BUNDLE_FRAGMENT, BundleDownload)?;

    Ok((list, download))
}
