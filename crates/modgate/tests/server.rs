//! Integration tests for the sealed server: boot sequence, dispatch and
//! the HTTP front.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use modgate::events::{HandledAction, InMemoryPlayerStates, ITEM_EVENT_ROUTE};
use modgate::mods::{LoadPhase, LoaderConfig};
use modgate::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

// =========================================================================
// Fixtures
// =========================================================================

fn config() -> ServerConfig {
    ServerConfig {
        loader: LoaderConfig {
            enabled: false,
            ..LoaderConfig::default()
        },
        ..ServerConfig::default()
    }
}

fn config_with_mods(root: &TempDir) -> ServerConfig {
    ServerConfig {
        loader: LoaderConfig {
            mods_dir: root.path().to_path_buf(),
            ..LoaderConfig::default()
        },
        ..ServerConfig::default()
    }
}

fn write_mod(root: &Path, dir: &str, manifest: Value) {
    let path = root.join(dir);
    std::fs::create_dir_all(&path).unwrap();
    std::fs::write(path.join("mod.json"), manifest.to_string()).unwrap();
}

async fn echo(url: String, body: Value, session: SessionId) -> anyhow::Result<RouteResponse> {
    Ok(RouteResponse::Json(json!({"url": url, "body": body, "session": session})))
}

async fn broken(_url: String, _body: Value, _session: SessionId) -> anyhow::Result<RouteResponse> {
    anyhow::bail!("controller exploded")
}

/// Core routes used by most dispatch tests.
fn core_routes(registries: &mut LoadRegistries) -> Result<(), ModgateError> {
    let mut statics = StaticRouter::new();
    statics.register("/client/echo", echo)?;
    statics.register("/client/broken", broken)?;
    statics.register("/client/motd", |_u: String, _b: Value, _s: SessionId| async move {
        anyhow::Ok(RouteResponse::Text("welcome".into()))
    })?;
    statics.register("/client/image", |_u: String, _b: Value, _s: SessionId| async move {
        anyhow::Ok(RouteResponse::tagged("IMAGE"))
    })?;
    statics.register("/client/mystery", |_u: String, _b: Value, _s: SessionId| async move {
        anyhow::Ok(RouteResponse::tagged("MYSTERY"))
    })?;
    registries.routes.add_static_router(statics);

    let mut dynamics = DynamicRouter::new();
    dynamics.register("/client/trading/api/getTrader/", echo)?;
    registries.routes.add_dynamic_router(dynamics);

    registries.serializers.register(PngSerializer);
    Ok(())
}

struct PngSerializer;

#[async_trait]
impl Serializer for PngSerializer {
    fn can_handle(&self, tag: &str) -> bool {
        tag == "IMAGE"
    }

    async fn serialize(
        &self,
        _session: &SessionId,
        _request: &IncomingRequest,
        sink: &mut dyn ResponseSink,
        _body: &Value,
    ) -> anyhow::Result<()> {
        sink.set_header("content-type", "image/png");
        sink.write(b"\x89PNG").await
    }
}

async fn core_server() -> ModgateServer {
    ModgateServer::builder(config()).core(core_routes).build().await.unwrap()
}

async fn dispatch(server: &ModgateServer, request: IncomingRequest) -> BufferedResponse {
    let mut sink = BufferedResponse::new();
    server.dispatch(&request, &mut sink).await.unwrap();
    sink
}

// =========================================================================
// Dispatch
// =========================================================================

#[tokio::test]
async fn test_dispatch_static_route_writes_json() {
    let server = core_server().await;
    let response = dispatch(
        &server,
        IncomingRequest::post("/client/echo", SessionId::from("pmc-1"), r#"{"a":1}"#),
    )
    .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(
        response.json().unwrap(),
        json!({"url": "/client/echo", "body": {"a": 1}, "session": "pmc-1"})
    );
}

#[tokio::test]
async fn test_dispatch_dynamic_route_matches_fragment() {
    let server = core_server().await;
    let response = dispatch(
        &server,
        IncomingRequest::get("/client/trading/api/getTrader/54cb50c7", SessionId::anonymous()),
    )
    .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.json().unwrap()["url"], "/client/trading/api/getTrader/54cb50c7");
}

#[tokio::test]
async fn test_dispatch_strips_retry_suffix() {
    let server = core_server().await;
    let response = dispatch(
        &server,
        IncomingRequest::get("/client/echo?retry=2", SessionId::anonymous()),
    )
    .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.json().unwrap()["url"], "/client/echo");
}

#[tokio::test]
async fn test_dispatch_route_miss_is_404_envelope() {
    let server = core_server().await;
    let response = dispatch(&server, IncomingRequest::get("/client/nowhere", SessionId::anonymous())).await;

    assert_eq!(response.status, 404);
    let body = response.json().unwrap();
    assert_eq!(body["err"], 404);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_dispatch_handler_error_is_500_envelope() {
    let server = core_server().await;
    let response = dispatch(&server, IncomingRequest::get("/client/broken", SessionId::anonymous())).await;

    assert_eq!(response.status, 500);
    assert_eq!(response.json().unwrap()["err"], 500);
}

#[tokio::test]
async fn test_dispatch_malformed_body_is_400_envelope() {
    let server = core_server().await;
    let response = dispatch(
        &server,
        IncomingRequest::post("/client/echo", SessionId::anonymous(), "{not json"),
    )
    .await;

    assert_eq!(response.status, 400);
    assert_eq!(response.json().unwrap()["err"], 400);
}

#[tokio::test]
async fn test_dispatch_text_response_written_verbatim() {
    let server = core_server().await;
    let response = dispatch(&server, IncomingRequest::get("/client/motd", SessionId::anonymous())).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"welcome");
}

#[tokio::test]
async fn test_dispatch_tagged_response_uses_serializer() {
    let server = core_server().await;
    let response = dispatch(&server, IncomingRequest::get("/client/image", SessionId::anonymous())).await;

    assert_eq!(response.header("content-type"), Some("image/png"));
    assert_eq!(response.body, b"\x89PNG");
}

#[tokio::test]
async fn test_dispatch_unknown_tag_is_500() {
    let server = core_server().await;
    let response = dispatch(&server, IncomingRequest::get("/client/mystery", SessionId::anonymous())).await;

    assert_eq!(response.status, 500);
}

#[tokio::test]
async fn test_dispatch_records_session_in_context() {
    let server = core_server().await;
    dispatch(&server, IncomingRequest::get("/client/echo", SessionId::from("pmc-4"))).await;
    dispatch(&server, IncomingRequest::get("/client/echo", SessionId::anonymous())).await;

    let latest = server.context().get_latest_value(ContextKind::SessionId).unwrap();
    assert_eq!(latest.value::<SessionId>(), Some(&SessionId::from("pmc-4")));
}

// =========================================================================
// Item events
// =========================================================================

struct Heal {
    actions: Vec<HandledAction>,
}

#[async_trait]
impl ActionHandlerGroup for Heal {
    fn name(&self) -> &str {
        "heal"
    }

    fn handled_actions(&self) -> &[HandledAction] {
        &self.actions
    }

    async fn handle_action(
        &self,
        _action: &str,
        _index: usize,
        state: &mut Value,
        request: &ActionRequest,
        session: &SessionId,
        mut output: ItemEventOutput,
    ) -> anyhow::Result<ItemEventOutput> {
        let hp = state["hp"].as_i64().unwrap_or(0) + request.field("amount").and_then(Value::as_i64).unwrap_or(0);
        state["hp"] = json!(hp);
        output.profile_change(session.as_str())["hp"] = json!(hp);
        Ok(output)
    }
}

#[tokio::test]
async fn test_dispatch_item_event_route_runs_batch() {
    let states = Arc::new(InMemoryPlayerStates::new());
    let session = SessionId::from("pmc-2");
    states.insert(session.clone(), json!({"hp": 10}));

    let server = ModgateServer::builder(config())
        .player_states(states.clone())
        .core(|r| {
            r.actions.register(Heal {
                actions: vec![HandledAction::new("Heal")],
            });
            Ok(())
        })
        .build()
        .await
        .unwrap();

    let body = json!({"data": [{"Action": "Heal", "amount": 5}, {"Action": "Heal", "amount": 7}], "tm": 1});
    let response = dispatch(
        &server,
        IncomingRequest::post(ITEM_EVENT_ROUTE, session.clone(), body.to_string()),
    )
    .await;

    assert_eq!(response.status, 200);
    let envelope = response.json().unwrap();
    assert_eq!(envelope["err"], 0);
    assert_eq!(envelope["data"]["profileChanges"]["pmc-2"]["hp"], 22);
    assert_eq!(states.snapshot(&session).await, Some(json!({"hp": 22})));
}

#[tokio::test]
async fn test_dispatch_item_event_invalid_batch_is_400() {
    let server = core_server().await;
    let response = dispatch(
        &server,
        IncomingRequest::post(ITEM_EVENT_ROUTE, SessionId::from("pmc-2"), r#"{"data": 3}"#),
    )
    .await;

    assert_eq!(response.status, 400);
    assert_eq!(response.json().unwrap()["err"], 400);
}

#[tokio::test]
async fn test_dispatch_item_event_unknown_player_is_500() {
    let server = ModgateServer::builder(config())
        .core(|r| {
            r.actions.register(Heal {
                actions: vec![HandledAction::new("Heal")],
            });
            Ok(())
        })
        .build()
        .await
        .unwrap();

    let body = json!({"data": [{"Action": "Heal", "amount": 1}]});
    let response = dispatch(
        &server,
        IncomingRequest::post(ITEM_EVENT_ROUTE, SessionId::from("ghost"), body.to_string()),
    )
    .await;

    assert_eq!(response.status, 500);
}

/// Counts `WARN` events seen while installed as the thread default.
struct WarnCounter(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[tokio::test]
async fn test_dispatch_item_event_unhandled_action_warns_once() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let states = Arc::new(InMemoryPlayerStates::new());
    states.insert(SessionId::from("pmc-3"), json!({"hp": 1}));
    let server = ModgateServer::builder(config())
        .player_states(states)
        .build()
        .await
        .unwrap();

    let warnings = Arc::new(AtomicUsize::new(0));
    let _guard = tracing_subscriber::registry()
        .with(WarnCounter(Arc::clone(&warnings)))
        .set_default();

    let body = json!({"data": [{"Action": "Teleport"}]});
    let response = dispatch(
        &server,
        IncomingRequest::post(ITEM_EVENT_ROUTE, SessionId::from("pmc-3"), body.to_string()),
    )
    .await;

    assert_eq!(response.status, 200);
    assert_eq!(warnings.load(Ordering::SeqCst), 1);
}

// =========================================================================
// Boot sequence
// =========================================================================

/// Registers `/<name>/hello` in pre-load and records every hook with the
/// database marker it saw.
#[derive(Clone)]
struct Greeter {
    name: String,
    journal: Arc<Mutex<Vec<String>>>,
}

struct DatabaseMarker(&'static str);

#[async_trait]
impl ServerMod for Greeter {
    fn pre_load(&mut self, registrar: &mut ModRegistrar<'_>) -> anyhow::Result<()> {
        let name = self.name.clone();
        registrar.static_route(
            format!("/{}/hello", self.name),
            move |_u: String, _b: Value, _s: SessionId| {
                let name = name.clone();
                async move { anyhow::Ok(RouteResponse::Text(format!("hello from {name}"))) }
            },
        )?;
        registrar.static_route("/client/echo", broken)?;
        self.journal.lock().unwrap().push(format!("{}:pre_load", self.name));
        Ok(())
    }

    fn post_database_load(&mut self, registrar: &mut ModRegistrar<'_>) -> anyhow::Result<()> {
        let marker = registrar
            .resolve::<DatabaseMarker>()
            .map_or("missing", |m| m.0);
        self.journal
            .lock()
            .unwrap()
            .push(format!("{}:post_database_load:{marker}", self.name));
        Ok(())
    }

    fn post_load(&mut self, _registrar: &mut ModRegistrar<'_>) -> anyhow::Result<()> {
        self.journal.lock().unwrap().push(format!("{}:post_load", self.name));
        Ok(())
    }
}

struct MarkingDatabase {
    journal: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl DatabaseLoader for MarkingDatabase {
    async fn load(&self, registries: &mut LoadRegistries) -> anyhow::Result<()> {
        self.journal.lock().unwrap().push("database".to_string());
        registries.services.provide(DatabaseMarker("loaded"));
        Ok(())
    }
}

fn greeter_catalog(journal: &Arc<Mutex<Vec<String>>>) -> ModCatalog {
    let mut catalog = ModCatalog::new();
    for name in ["alpha", "beta"] {
        let greeter = Greeter {
            name: name.to_string(),
            journal: Arc::clone(journal),
        };
        catalog.register(name, move || greeter.clone());
    }
    catalog
}

#[tokio::test]
async fn test_build_runs_phases_around_database() {
    let root = TempDir::new().unwrap();
    write_mod(root.path(), "beta", json!({"name": "beta", "main": "beta", "dependencies": ["alpha"]}));
    write_mod(root.path(), "alpha", json!({"name": "alpha", "main": "alpha"}));

    let journal = Arc::new(Mutex::new(Vec::new()));
    let server = ModgateServer::builder(config_with_mods(&root))
        .catalog(greeter_catalog(&journal))
        .database(Arc::new(MarkingDatabase {
            journal: Arc::clone(&journal),
        }))
        .core(core_routes)
        .build()
        .await
        .unwrap();

    assert_eq!(server.load_order(), ["alpha", "beta"]);
    assert_eq!(
        *journal.lock().unwrap(),
        vec![
            "alpha:pre_load",
            "beta:pre_load",
            "database",
            "alpha:post_database_load:loaded",
            "beta:post_database_load:loaded",
            "alpha:post_load",
            "beta:post_load",
        ]
    );

    let phases: Vec<LoadPhase> = server.phase_reports().iter().map(|r| r.phase).collect();
    assert_eq!(phases, [LoadPhase::PreLoad, LoadPhase::PostDatabaseLoad, LoadPhase::PostLoad]);
}

#[tokio::test]
async fn test_build_mod_routes_are_served_and_core_wins() {
    let root = TempDir::new().unwrap();
    write_mod(root.path(), "alpha", json!({"name": "alpha", "main": "alpha"}));

    let journal = Arc::new(Mutex::new(Vec::new()));
    let server = ModgateServer::builder(config_with_mods(&root))
        .catalog(greeter_catalog(&journal))
        .core(core_routes)
        .build()
        .await
        .unwrap();

    let hello = dispatch(&server, IncomingRequest::get("/alpha/hello", SessionId::anonymous())).await;
    assert_eq!(hello.body, b"hello from alpha");

    // The mod registered a failing handler on a core path; core came first.
    let echo = dispatch(&server, IncomingRequest::get("/client/echo", SessionId::anonymous())).await;
    assert_eq!(echo.status, 200);
}

#[tokio::test]
async fn test_build_database_failure_aborts_boot() {
    struct FailingDatabase;

    #[async_trait]
    impl DatabaseLoader for FailingDatabase {
        async fn load(&self, _registries: &mut LoadRegistries) -> anyhow::Result<()> {
            anyhow::bail!("items.json is corrupt")
        }
    }

    let err = ModgateServer::builder(config())
        .database(Arc::new(FailingDatabase))
        .build()
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ModgateError::Database(_)));
    assert!(err.to_string().contains("items.json is corrupt"));
}

#[tokio::test]
async fn test_build_duplicate_core_route_is_router_error() {
    let err = ModgateServer::builder(config())
        .core(|r| {
            let mut router = StaticRouter::new();
            router.register("/client/echo", echo)?;
            router.register("/client/echo", echo)?;
            r.routes.add_static_router(router);
            Ok(())
        })
        .build()
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ModgateError::Router(_)));
}

#[tokio::test]
async fn test_build_unknown_entry_point_is_loader_error() {
    let root = TempDir::new().unwrap();
    write_mod(root.path(), "gamma", json!({"name": "gamma", "main": "gamma"}));

    let err = ModgateServer::builder(config_with_mods(&root))
        .build()
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ModgateError::Loader(_)));
}

// =========================================================================
// Bundles
// =========================================================================

#[derive(Default)]
struct Inert;

#[async_trait]
impl ServerMod for Inert {}

async fn bundle_server(root: &TempDir) -> ModgateServer {
    write_mod(
        root.path(),
        "skins",
        json!({"name": "skins", "main": "inert", "isBundleMod": true}),
    );
    std::fs::write(
        root.path().join("skins/bundles.json"),
        json!({"manifest": [{"key": "assets/skins/red.bundle", "dependencyKeys": []}]}).to_string(),
    )
    .unwrap();
    let file = root.path().join("skins/bundles/assets/skins/red.bundle");
    std::fs::create_dir_all(file.parent().unwrap()).unwrap();
    std::fs::write(&file, b"UnityFS-red").unwrap();

    let mut catalog = ModCatalog::new();
    catalog.register_default::<Inert>("inert");
    ModgateServer::builder(config_with_mods(root))
        .catalog(catalog)
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_bundle_list_route_lists_registered_bundles() {
    let root = TempDir::new().unwrap();
    let server = bundle_server(&root).await;

    let response = dispatch(&server, IncomingRequest::get(modgate::BUNDLE_LIST_ROUTE, SessionId::anonymous())).await;
    let list = response.json().unwrap();
    assert_eq!(list[0]["key"], "assets/skins/red.bundle");
    assert_eq!(list[0]["modName"], "skins");
}

#[tokio::test]
async fn test_bundle_download_streams_file() {
    let root = TempDir::new().unwrap();
    let server = bundle_server(&root).await;

    let response = dispatch(
        &server,
        IncomingRequest::get("/files/bundle/assets/skins/red.bundle?v=3", SessionId::anonymous()),
    )
    .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), Some("application/octet-stream"));
    assert_eq!(response.body, b"UnityFS-red");
}

#[tokio::test]
async fn test_bundle_download_unknown_is_404() {
    let root = TempDir::new().unwrap();
    let server = bundle_server(&root).await;

    let response = dispatch(
        &server,
        IncomingRequest::get("/files/bundle/assets/skins/blue.bundle", SessionId::anonymous()),
    )
    .await;
    assert_eq!(response.status, 404);
    assert_eq!(response.json().unwrap()["err"], 404);
}

#[tokio::test]
async fn test_bundle_download_missing_file_is_500_envelope() {
    let root = TempDir::new().unwrap();
    let server = bundle_server(&root).await;
    std::fs::remove_file(root.path().join("skins/bundles/assets/skins/red.bundle")).unwrap();

    let request = IncomingRequest::get("/files/bundle/assets/skins/red.bundle", SessionId::anonymous());
    let mut sink = BufferedResponse::new();
    server.dispatch(&request, &mut sink).await.unwrap();

    assert_eq!(sink.status, 500);
    assert_eq!(sink.header("content-type"), Some("application/json"));
    assert_eq!(sink.json().unwrap()["err"], 500);
}

// =========================================================================
// HTTP front
// =========================================================================

#[tokio::test]
async fn test_run_until_serves_http_requests() {
    let server = core_server().await;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let running = tokio::spawn(server.run_until(listener, async move {
        let _ = stop_rx.await;
    }));

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(
            b"GET /client/echo?retry=1 HTTP/1.1\r\nHost: localhost\r\nCookie: PHPSESSID=pmc-8\r\nConnection: close\r\n\r\n",
        )
        .await
        .unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let text = String::from_utf8_lossy(&raw);

    assert!(text.starts_with("HTTP/1.1 200"), "unexpected response: {text}");
    assert!(text.contains("application/json"));
    assert!(text.contains(r#""session":"pmc-8""#));

    stop_tx.send(()).unwrap();
    running.await.unwrap().unwrap();
}
