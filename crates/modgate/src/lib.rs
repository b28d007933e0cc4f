//! # Modgate
//!
//! Moddable game-server routing core.
//!
//! Modgate owns the path from "an HTTP request arrived" to "a response was
//! written": static and dynamic route tables, pluggable serializers for
//! non-JSON responses, the item-event batch router, a bounded context
//! store, and the mod loader that lets third-party code register into all
//! of them while the server boots.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use modgate::prelude::*;
//! use serde_json::{json, Value};
//!
//! # async fn boot() -> Result<(), ModgateError> {
//! let config = ServerConfig::default();
//! init_tracing(&config.log_filter);
//!
//! let server = ModgateServer::builder(config)
//!     .core(|registries| {
//!         let mut router = StaticRouter::new();
//!         router.register("/client/ping", |_url: String, _body: Value, _session: SessionId| async move {
//!             anyhow::Ok(RouteResponse::Json(json!({"pong": true})))
//!         })?;
//!         registries.routes.add_static_router(router);
//!         Ok(())
//!     })
//!     .build()
//!     .await?;
//! server.serve().await
//! # }
//! ```

mod bundles;
mod config;
mod database;
mod dispatch;
mod error;
#[cfg(feature = "http")]
mod http;
mod server;
pub mod telemetry;

pub use bundles::{BUNDLE_FRAGMENT, BUNDLE_LIST_ROUTE, BUNDLE_TAG, BundleSerializer};
pub use config::ServerConfig;
pub use database::{DatabaseLoader, EmptyDatabase};
pub use dispatch::strip_retry;
pub use error::{BoxError, ModgateError};
#[cfg(feature = "http")]
pub use http::{SESSION_COOKIE, SESSION_HEADER, session_from_headers};
pub use server::{ModgateServer, ModgateServerBuilder};
pub use telemetry::init_tracing;

pub use modgate_context as context;
pub use modgate_events as events;
pub use modgate_mods as mods;
pub use modgate_protocol as protocol;
pub use modgate_router as router;
pub use modgate_update as update;

/// Everything a server binary or a mod usually needs.
pub mod prelude {
    pub use crate::{
        DatabaseLoader, ModgateError, ModgateServer, ModgateServerBuilder, ServerConfig,
        init_tracing,
    };
    pub use modgate_context::{ContextEntry, ContextKind, ContextStore};
    pub use modgate_events::{
        ActionHandlerGroup, ActionRequest, BatchFailurePolicy, ItemEventOutput,
        PlayerStateAccessor,
    };
    pub use modgate_mods::{LoadRegistries, ModCatalog, ModRegistrar, ServerMod};
    pub use modgate_protocol::{
        BackendErrorCode, IncomingRequest, ResponseEnvelope, RouteResponse, SessionId, Warning,
    };
    pub use modgate_router::{
        BufferedResponse, DynamicRouter, ResponseSink, RouteHandler, Serializer, StaticRouter,
    };
    pub use modgate_update::OnUpdate;
}
