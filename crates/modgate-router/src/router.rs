//! Static and dynamic routers, and the table that groups them.
//!
//! Two matching disciplines:
//!
//! - **Static**: the incoming path must equal the registered path. Backed
//!   by a `HashMap`, so lookup is O(1).
//! - **Dynamic**: the incoming path must *contain* the registered
//!   fragment. Fragments are tried in registration order and the first
//!   hit wins, so a narrow fragment (`".bundle"`) has to be registered
//!   before a broad one that shares a substring with it (`"le"`).
//!
//! ```text
//!                       RouteTable
//!   path ──▶ coarse: which routers serve this top-level route?
//!        ──▶ fine:   static routers (exact), in order
//!        ──▶ fine:   dynamic routers (substring), in order
//!        ──▶ first hit, or None
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::{RouteHandler, RouterError};

/// The top-level route a router serves unless told otherwise. Routers
/// under the default namespace are consulted for every path.
pub const DEFAULT_TOP_LEVEL_ROUTE: &str = "core";

/// One `(match expression, handler)` pair of a dynamic router.
#[derive(Clone)]
pub struct RouteAction {
    /// The path fragment this route matches.
    pub expression: String,
    /// The handler that serves it.
    pub handler: Arc<dyn RouteHandler>,
}

/// Whether a router with `top_level` should be consulted for `path`.
fn serves(top_level: &str, path: &str) -> bool {
    if top_level == DEFAULT_TOP_LEVEL_ROUTE {
        return true;
    }
    path.strip_prefix('/')
        .and_then(|rest| rest.strip_prefix(top_level))
        .is_some_and(|rest| rest.starts_with('/'))
}

// ---------------------------------------------------------------------------
// StaticRouter
// ---------------------------------------------------------------------------

/// Exact-path router.
pub struct StaticRouter {
    top_level: String,
    routes: HashMap<String, Arc<dyn RouteHandler>>,
}

impl StaticRouter {
    /// Creates an empty router under [`DEFAULT_TOP_LEVEL_ROUTE`].
    pub fn new() -> Self {
        Self::with_top_level(DEFAULT_TOP_LEVEL_ROUTE)
    }

    /// Creates an empty router under the given top-level route.
    pub fn with_top_level(top_level: impl Into<String>) -> Self {
        Self {
            top_level: top_level.into(),
            routes: HashMap::new(),
        }
    }

    /// Registers `handler` for the exact path `path`.
    ///
    /// # Errors
    /// - [`RouterError::EmptyExpression`] for an empty path
    /// - [`RouterError::DuplicateRoute`] if the path is already taken
    pub fn register(
        &mut self,
        path: impl Into<String>,
        handler: impl RouteHandler + 'static,
    ) -> Result<&mut Self, RouterError> {
        self.register_arc(path, Arc::new(handler))
    }

    /// Like [`register`](Self::register) for a handler that is already
    /// shared (one controller serving several paths).
    pub fn register_arc(
        &mut self,
        path: impl Into<String>,
        handler: Arc<dyn RouteHandler>,
    ) -> Result<&mut Self, RouterError> {
        let path = path.into();
        if path.is_empty() {
            return Err(RouterError::EmptyExpression);
        }
        if self.routes.contains_key(&path) {
            return Err(RouterError::DuplicateRoute {
                top_level: self.top_level.clone(),
                path,
            });
        }
        tracing::trace!(top_level = %self.top_level, %path, "static route registered");
        self.routes.insert(path, handler);
        Ok(self)
    }

    /// Returns the handler registered for exactly `path`.
    pub fn resolve(&self, path: &str) -> Option<&Arc<dyn RouteHandler>> {
        self.routes.get(path)
    }

    /// The top-level route this router serves.
    pub fn top_level_route(&self) -> &str {
        &self.top_level
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no route is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for StaticRouter {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// DynamicRouter
// ---------------------------------------------------------------------------

/// Substring router. First registered fragment contained in the path wins.
pub struct DynamicRouter {
    top_level: String,
    routes: Vec<RouteAction>,
}

impl DynamicRouter {
    /// Creates an empty router under [`DEFAULT_TOP_LEVEL_ROUTE`].
    pub fn new() -> Self {
        Self::with_top_level(DEFAULT_TOP_LEVEL_ROUTE)
    }

    /// Creates an empty router under the given top-level route.
    pub fn with_top_level(top_level: impl Into<String>) -> Self {
        Self {
            top_level: top_level.into(),
            routes: Vec::new(),
        }
    }

    /// Appends a route for every path containing `fragment`.
    ///
    /// Registration order is match order. Register narrow fragments
    /// before broad ones that share a substring with them.
    ///
    /// # Errors
    /// [`RouterError::EmptyExpression`] for an empty fragment.
    pub fn register(
        &mut self,
        fragment: impl Into<String>,
        handler: impl RouteHandler + 'static,
    ) -> Result<&mut Self, RouterError> {
        self.register_arc(fragment, Arc::new(handler))
    }

    /// Like [`register`](Self::register) for an already shared handler.
    pub fn register_arc(
        &mut self,
        fragment: impl Into<String>,
        handler: Arc<dyn RouteHandler>,
    ) -> Result<&mut Self, RouterError> {
        let expression = fragment.into();
        if expression.is_empty() {
            return Err(RouterError::EmptyExpression);
        }
        tracing::trace!(top_level = %self.top_level, fragment = %expression, "dynamic route registered");
        self.routes.push(RouteAction { expression, handler });
        Ok(self)
    }

    /// Returns the first route whose fragment `path` contains.
    pub fn resolve(&self, path: &str) -> Option<&RouteAction> {
        self.routes
            .iter()
            .find(|route| path.contains(route.expression.as_str()))
    }

    /// The top-level route this router serves.
    pub fn top_level_route(&self) -> &str {
        &self.top_level
    }

    /// Registered fragments, in match order.
    pub fn fragments(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.expression.as_str()).collect()
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no route is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for DynamicRouter {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// RouteTable
// ---------------------------------------------------------------------------

/// The outcome of a successful [`RouteTable::resolve`].
#[derive(Clone, Copy)]
pub struct ResolvedRoute<'a> {
    /// The handler to invoke.
    pub handler: &'a Arc<dyn RouteHandler>,
    /// The static path or dynamic fragment that matched.
    pub matched: &'a str,
    /// The top-level route of the router that matched.
    pub top_level: &'a str,
    /// `true` if a dynamic (substring) route matched.
    pub dynamic: bool,
}

/// Every static and dynamic router of the server, in registration order.
///
/// Mutated only while the server is loading (core registration and mod
/// hooks); read concurrently afterwards without locks.
#[derive(Default)]
pub struct RouteTable {
    static_routers: Vec<StaticRouter>,
    dynamic_routers: Vec<DynamicRouter>,
}

impl RouteTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a static router. Earlier routers win on identical paths.
    pub fn add_static_router(&mut self, router: StaticRouter) {
        self.static_routers.push(router);
    }

    /// Appends a dynamic router. Earlier routers are tried first.
    pub fn add_dynamic_router(&mut self, router: DynamicRouter) {
        self.dynamic_routers.push(router);
    }

    /// Resolves `path` to a handler.
    ///
    /// All static routers are consulted before any dynamic router, so an
    /// exact route always beats a fragment. A miss returns `None`.
    pub fn resolve(&self, path: &str) -> Option<ResolvedRoute<'_>> {
        let exact = self
            .static_routers
            .iter()
            .filter(|router| serves(router.top_level_route(), path))
            .find_map(|router| {
                let (matched, handler) = router.routes.get_key_value(path)?;
                Some(ResolvedRoute {
                    handler,
                    matched,
                    top_level: router.top_level_route(),
                    dynamic: false,
                })
            });
        if exact.is_some() {
            return exact;
        }

        self.dynamic_routers
            .iter()
            .filter(|router| serves(router.top_level_route(), path))
            .find_map(|router| {
                let route = router.resolve(path)?;
                Some(ResolvedRoute {
                    handler: &route.handler,
                    matched: &route.expression,
                    top_level: router.top_level_route(),
                    dynamic: true,
                })
            })
    }

    /// The static routers, in registration order.
    pub fn static_routers(&self) -> &[StaticRouter] {
        &self.static_routers
    }

    /// The dynamic routers, in registration order.
    pub fn dynamic_routers(&self) -> &[DynamicRouter] {
        &self.dynamic_routers
    }

    /// Total number of routes across all routers.
    pub fn route_count(&self) -> usize {
        self.static_routers.iter().map(StaticRouter::len).sum::<usize>()
            + self.dynamic_routers.iter().map(DynamicRouter::len).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use modgate_protocol::{RouteResponse, SessionId};
    use serde_json::{Value, json};

    /// Handler that answers with a fixed label so tests can tell which
    /// route won.
    struct Label(&'static str);

    #[async_trait]
    impl RouteHandler for Label {
        async fn handle(
            &self,
            _url: &str,
            _body: &Value,
            _session: &SessionId,
        ) -> anyhow::Result<RouteResponse> {
            Ok(RouteResponse::Text(self.0.to_string()))
        }
    }

    async fn call(handler: &Arc<dyn RouteHandler>) -> String {
        match handler
            .handle("/", &Value::Null, &SessionId::anonymous())
            .await
            .unwrap()
        {
            RouteResponse::Text(text) => text,
            other => panic!("unexpected response {other:?}"),
        }
    }

    async fn winner(table: &RouteTable, path: &str) -> Option<String> {
        match table.resolve(path) {
            Some(route) => Some(call(route.handler).await),
            None => None,
        }
    }

    // -- StaticRouter ------------------------------------------------------

    #[test]
    fn test_static_resolve_exact_path_only() {
        let mut router = StaticRouter::new();
        router.register("/client/weather", Label("weather")).unwrap();

        assert!(router.resolve("/client/weather").is_some());
        assert!(router.resolve("/client/weather/extra").is_none());
        assert!(router.resolve("/client/weathe").is_none());
    }

    #[test]
    fn test_static_register_duplicate_is_error() {
        let mut router = StaticRouter::new();
        router.register("/a", Label("a")).unwrap();
        let err = router.register("/a", Label("b")).err().unwrap();
        assert!(matches!(err, RouterError::DuplicateRoute { ref path, .. } if path == "/a"));
    }

    #[test]
    fn test_register_empty_expression_is_error() {
        let mut s = StaticRouter::new();
        let mut d = DynamicRouter::new();
        assert!(matches!(s.register("", Label("x")), Err(RouterError::EmptyExpression)));
        assert!(matches!(d.register("", Label("x")), Err(RouterError::EmptyExpression)));
    }

    #[test]
    fn test_static_paths_sorted() {
        let mut router = StaticRouter::new();
        router
            .register("/b", Label("b"))
            .unwrap()
            .register("/a", Label("a"))
            .unwrap();
        assert_eq!(router.paths(), vec!["/a", "/b"]);
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn test_default_top_level_route() {
        assert_eq!(StaticRouter::new().top_level_route(), DEFAULT_TOP_LEVEL_ROUTE);
        assert_eq!(DynamicRouter::new().top_level_route(), DEFAULT_TOP_LEVEL_ROUTE);
        assert_eq!(StaticRouter::with_top_level("launcher").top_level_route(), "launcher");
    }

    // -- DynamicRouter -----------------------------------------------------

    #[tokio::test]
    async fn test_dynamic_first_registered_fragment_wins() {
        let mut router = DynamicRouter::new();
        router
            .register(".bundle", Label("bundle"))
            .unwrap()
            .register("le", Label("le"))
            .unwrap();

        let route = router.resolve("mod.bundle").unwrap();
        assert_eq!(route.expression, ".bundle");
        assert_eq!(call(&route.handler).await, "bundle");
    }

    #[tokio::test]
    async fn test_dynamic_registration_order_beats_specificity() {
        let mut router = DynamicRouter::new();
        router
            .register("le", Label("le"))
            .unwrap()
            .register(".bundle", Label("bundle"))
            .unwrap();

        let route = router.resolve("mod.bundle").unwrap();
        assert_eq!(call(&route.handler).await, "le");
        assert_eq!(router.fragments(), vec!["le", ".bundle"]);
    }

    #[test]
    fn test_dynamic_no_fragment_contained_is_miss() {
        let mut router = DynamicRouter::new();
        router.register("/files/", Label("files")).unwrap();
        assert!(router.resolve("/client/items").is_none());
    }

    // -- RouteTable --------------------------------------------------------

    #[tokio::test]
    async fn test_table_static_beats_dynamic() {
        let mut s = StaticRouter::new();
        s.register("/client/items", Label("static")).unwrap();
        let mut d = DynamicRouter::new();
        d.register("/client/", Label("dynamic")).unwrap();

        let mut table = RouteTable::new();
        table.add_dynamic_router(d);
        table.add_static_router(s);

        assert_eq!(winner(&table, "/client/items").await.as_deref(), Some("static"));
        assert_eq!(winner(&table, "/client/other").await.as_deref(), Some("dynamic"));
        let resolved = table.resolve("/client/other").unwrap();
        assert!(resolved.dynamic);
        assert_eq!(resolved.matched, "/client/");
    }

    #[tokio::test]
    async fn test_table_earlier_router_wins_identical_path() {
        let mut first = StaticRouter::new();
        first.register("/x", Label("first")).unwrap();
        let mut second = StaticRouter::new();
        second.register("/x", Label("second")).unwrap();

        let mut table = RouteTable::new();
        table.add_static_router(first);
        table.add_static_router(second);
        assert_eq!(winner(&table, "/x").await.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_table_namespaced_router_only_serves_its_prefix() {
        let mut launcher = StaticRouter::with_top_level("launcher");
        launcher.register("/launcher/ping", Label("ping")).unwrap();
        launcher.register("/client/ping", Label("misplaced")).unwrap();

        let mut table = RouteTable::new();
        table.add_static_router(launcher);

        assert_eq!(winner(&table, "/launcher/ping").await.as_deref(), Some("ping"));
        assert!(table.resolve("/client/ping").is_none());
        assert_eq!(table.resolve("/launcher/ping").unwrap().top_level, "launcher");
    }

    #[test]
    fn test_serves_requires_segment_boundary() {
        assert!(serves("launcher", "/launcher/x"));
        assert!(!serves("launcher", "/launcherx/x"));
        assert!(!serves("launcher", "/launcher"));
        assert!(serves(DEFAULT_TOP_LEVEL_ROUTE, "anything"));
    }

    #[test]
    fn test_table_resolve_is_referentially_stable() {
        let mut s = StaticRouter::new();
        s.register("/a", Label("a")).unwrap();
        let mut d = DynamicRouter::new();
        d.register(".png", Label("png")).unwrap();
        let mut table = RouteTable::new();
        table.add_static_router(s);
        table.add_dynamic_router(d);

        for path in ["/a", "/files/icon.png"] {
            let first = table.resolve(path).unwrap().handler;
            for _ in 0..10 {
                assert!(Arc::ptr_eq(first, table.resolve(path).unwrap().handler));
            }
        }
    }

    #[test]
    fn test_table_miss_is_none() {
        let table = RouteTable::new();
        assert!(table.resolve("/nothing").is_none());
        assert_eq!(table.route_count(), 0);
    }

    #[tokio::test]
    async fn test_closure_handler_receives_arguments() {
        let mut router = StaticRouter::new();
        router
            .register(
                "/echo",
                |url: String, body: Value, session: SessionId| async move {
                    anyhow::Ok(RouteResponse::Json(
                        json!({"url": url, "body": body, "session": session}),
                    ))
                },
            )
            .unwrap();

        let handler = router.resolve("/echo").unwrap();
        let out = handler
            .handle("/echo", &json!({"n": 1}), &SessionId::new("pmc"))
            .await
            .unwrap();
        assert_eq!(
            out,
            RouteResponse::Json(json!({"url": "/echo", "body": {"n": 1}, "session": "pmc"}))
        );
    }
}
