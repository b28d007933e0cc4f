//! # modgate-router
//!
//! Request routing for the modgate server core.
//!
//! - [`StaticRouter`]: exact-path routes
//! - [`DynamicRouter`]: substring routes, first registered wins
//! - [`RouteTable`]: every router, consulted static-first
//! - [`SerializerRegistry`]: writers for tagged (non-JSON) responses
//!
//! Tables are filled while the server loads and are read-only afterwards.
//! Nothing in this crate knows about HTTP; the meta crate's dispatcher
//! drives it.

mod error;
mod handler;
mod router;
mod serializer;
mod sink;

pub use error::RouterError;
pub use handler::RouteHandler;
pub use router::{
    DEFAULT_TOP_LEVEL_ROUTE, DynamicRouter, ResolvedRoute, RouteAction, RouteTable, StaticRouter,
};
pub use serializer::{Serializer, SerializerRegistry};
pub use sink::{BufferedResponse, ResponseSink};
