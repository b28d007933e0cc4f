use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use modgate::events::{HandledAction, InMemoryPlayerStates};
use modgate::prelude::*;
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// weather-tweaks: a route, a shared service and an update hook
// ---------------------------------------------------------------------------

/// Current temperature in °C, shared with other mods.
pub struct Weather {
    temperature: AtomicI64,
}

impl Weather {
    pub fn temperature(&self) -> i64 {
        self.temperature.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
struct WeatherTweaks;

struct WeatherCycle {
    weather: Arc<Weather>,
}

#[async_trait]
impl OnUpdate for WeatherCycle {
    fn name(&self) -> &str {
        "weather-cycle"
    }

    async fn on_update(&self, secs_since_last_run: u64) -> anyhow::Result<bool> {
        if secs_since_last_run < 60 {
            return Ok(false);
        }
        // Cools a degree per minute, wrapping from -10 back to 25.
        let current = self.weather.temperature();
        let next = if current <= -10 { 25 } else { current - 1 };
        self.weather.temperature.store(next, Ordering::Relaxed);
        tracing::info!(temperature = next, "weather changed");
        Ok(true)
    }
}

#[async_trait]
impl ServerMod for WeatherTweaks {
    fn pre_load(&mut self, registrar: &mut ModRegistrar<'_>) -> anyhow::Result<()> {
        let weather = Arc::new(Weather {
            temperature: AtomicI64::new(14),
        });
        registrar.share(Arc::clone(&weather));

        let reported = Arc::clone(&weather);
        registrar.static_route("/client/weather", move |_u: String, _b: Value, _s: SessionId| {
            let temperature = reported.temperature();
            async move {
                let envelope = ResponseEnvelope::ok(json!({"temperature": temperature}));
                anyhow::Ok(RouteResponse::Json(serde_json::to_value(envelope)?))
            }
        })?;
        registrar.register_update_hook(WeatherCycle { weather });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// quick-heal: an item-event action group that reads another mod's service
// ---------------------------------------------------------------------------

#[derive(Default)]
struct QuickHeal;

struct HealGroup {
    actions: Vec<HandledAction>,
    weather: Option<Arc<Weather>>,
}

#[async_trait]
impl ActionHandlerGroup for HealGroup {
    fn name(&self) -> &str {
        "quick-heal"
    }

    fn handled_actions(&self) -> &[HandledAction] {
        &self.actions
    }

    async fn handle_action(
        &self,
        _action: &str,
        index: usize,
        state: &mut Value,
        request: &ActionRequest,
        session: &SessionId,
        mut output: ItemEventOutput,
    ) -> anyhow::Result<ItemEventOutput> {
        let mut amount = request.field("amount").and_then(Value::as_i64).unwrap_or(10);
        if self.weather.as_ref().is_some_and(|w| w.temperature() < 0) {
            amount /= 2;
        }

        let hp = state["hp"].as_i64().unwrap_or(0);
        let max = state["maxHp"].as_i64().unwrap_or(100);
        if hp >= max {
            output.push_warning(Warning::new(index, BackendErrorCode::UNKNOWN_ERROR, "already at full health"));
            return Ok(output);
        }

        let healed = (hp + amount).min(max);
        state["hp"] = json!(healed);
        output.profile_change(session.as_str())["hp"] = json!(healed);
        Ok(output)
    }
}

#[async_trait]
impl ServerMod for QuickHeal {
    fn post_load(&mut self, registrar: &mut ModRegistrar<'_>) -> anyhow::Result<()> {
        let weather = registrar.resolve::<Arc<Weather>>().map(|w| Arc::clone(&*w));
        if weather.is_none() {
            tracing::warn!("weather-tweaks not loaded, healing ignores temperature");
        }
        registrar.register_action_group(HealGroup {
            actions: vec![HandledAction::new("QuickHeal")],
            weather,
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

fn catalog() -> ModCatalog {
    let mut catalog = ModCatalog::new();
    catalog
        .register_default::<WeatherTweaks>("weather")
        .register_default::<QuickHeal>("quick-heal");
    catalog
}

fn core_routes(registries: &mut LoadRegistries) -> Result<(), ModgateError> {
    let mut launcher = StaticRouter::new();
    launcher.register("/launcher/ping", |_u: String, _b: Value, _s: SessionId| async move {
        anyhow::Ok(RouteResponse::Text("pong".into()))
    })?;
    launcher.register("/client/game/start", |_u: String, _b: Value, session: SessionId| async move {
        let envelope = ResponseEnvelope::ok(json!({"sessionId": session}));
        anyhow::Ok(RouteResponse::Json(serde_json::to_value(envelope)?))
    })?;
    registries.routes.add_static_router(launcher);
    Ok(())
}

async fn build(config: ServerConfig) -> Result<ModgateServer, ModgateError> {
    let players = Arc::new(InMemoryPlayerStates::new());
    players.insert(SessionId::from("pmc-demo"), json!({"hp": 35, "maxHp": 100}));

    ModgateServer::builder(config)
        .catalog(catalog())
        .player_states(players)
        .core(core_routes)
        .build()
        .await
}

#[tokio::main]
async fn main() -> Result<(), ModgateError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/hideout/hideout.toml".to_string());
    let config = ServerConfig::from_toml_file(&path)?;
    init_tracing(&config.log_filter);

    let server = build(config).await?;
    tracing::info!(mods = ?server.load_order(), "hideout ready");
    server.serve().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use modgate::events::ITEM_EVENT_ROUTE;
    use modgate::mods::LoaderConfig;

    async fn start() -> ModgateServer {
        let config = ServerConfig {
            loader: LoaderConfig {
                mods_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/mods").into(),
                ..LoaderConfig::default()
            },
            ..ServerConfig::default()
        };
        build(config).await.unwrap()
    }

    async fn send(server: &ModgateServer, request: IncomingRequest) -> BufferedResponse {
        let mut sink = BufferedResponse::new();
        server.dispatch(&request, &mut sink).await.unwrap();
        sink
    }

    #[tokio::test]
    async fn test_build_loads_bundled_mods_in_order() {
        let server = start().await;
        assert_eq!(server.load_order(), ["weather-tweaks", "quick-heal"]);
    }

    #[tokio::test]
    async fn test_weather_route_reports_temperature() {
        let server = start().await;
        let response = send(&server, IncomingRequest::get("/client/weather", SessionId::anonymous())).await;
        assert_eq!(response.json().unwrap()["data"]["temperature"], 14);
    }

    #[tokio::test]
    async fn test_quick_heal_caps_at_max_hp() {
        let server = start().await;
        let batch = json!({"data": [
            {"Action": "QuickHeal", "amount": 50},
            {"Action": "QuickHeal", "amount": 50}
        ]});
        let response = send(
            &server,
            IncomingRequest::post(ITEM_EVENT_ROUTE, SessionId::from("pmc-demo"), batch.to_string()),
        )
        .await;

        let envelope = response.json().unwrap();
        assert_eq!(envelope["err"], 0);
        assert_eq!(envelope["data"]["profileChanges"]["pmc-demo"]["hp"], 100);
    }

    #[tokio::test]
    async fn test_quick_heal_at_full_health_is_critical() {
        let server = start().await;
        let batch = json!({"data": [
            {"Action": "QuickHeal", "amount": 100},
            {"Action": "QuickHeal"}
        ]});
        let response = send(
            &server,
            IncomingRequest::post(ITEM_EVENT_ROUTE, SessionId::from("pmc-demo"), batch.to_string()),
        )
        .await;

        let envelope = response.json().unwrap();
        assert_eq!(envelope["err"], 200);
        assert_eq!(envelope["errmsg"], "already at full health");
        assert_eq!(envelope["data"]["warnings"][0]["index"], 1);
    }

    #[tokio::test]
    async fn test_weather_cycle_waits_a_minute() {
        let weather = Arc::new(Weather {
            temperature: AtomicI64::new(14),
        });
        let cycle = WeatherCycle {
            weather: Arc::clone(&weather),
        };
        assert!(!cycle.on_update(30).await.unwrap());
        assert_eq!(weather.temperature(), 14);
        assert!(cycle.on_update(60).await.unwrap());
        assert_eq!(weather.temperature(), 13);
    }
}
