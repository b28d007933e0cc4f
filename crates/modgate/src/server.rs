//! `ModgateServerBuilder` (load phase) and `ModgateServer` (serving).
//!
//! Registries are mutable only while the builder owns them. `build()`
//! runs the whole boot sequence and *seals* them into `Arc`s:
//!
//! ```text
//! ModgateServerBuilder::build()
//!   core registration
//!   mods: prepare ─▶ PreLoad ─▶ database ─▶ PostDatabaseLoad ─▶ PostLoad
//!   seal: bundle routes + serializer, freeze every registry
//!         └─▶ ModgateServer (read-only, shared by every request task)
//! ```

use std::sync::Arc;

use modgate_context::ContextStore;
use modgate_events::{
    EventActionRouter, InMemoryPlayerStates, PlayerStateAccessor,
};
use modgate_mods::{
    BundleRegistry, LoadPhase, LoadRegistries, ModCatalog, ModLoader, PhaseReport, ServiceScope,
};
use modgate_protocol::JsonCodec;
use modgate_router::{RouteTable, SerializerRegistry};
use modgate_update::{UpdateHandle, UpdateRegistry, UpdateScheduler};
use tracing::info;

use crate::bundles::{BundleSerializer, bundle_routers};
use crate::database::{DatabaseLoader, EmptyDatabase};
use crate::{ModgateError, ServerConfig};

type CoreRegistration =
    Box<dyn FnOnce(&mut LoadRegistries) -> Result<(), ModgateError> + Send>;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and boots a [`ModgateServer`].
///
/// # Example
///
/// ```rust,ignore
/// use modgate::prelude::*;
///
/// let server = ModgateServer::builder(config)
///     .catalog(catalog)
///     .core(|r| {
///         let mut router = StaticRouter::new();
///         router.register("/client/ping", ping)?;
///         r.routes.add_static_router(router);
///         Ok(())
///     })
///     .build()
///     .await?;
/// ```
pub struct ModgateServerBuilder {
    config: ServerConfig,
    catalog: ModCatalog,
    player_states: Option<Arc<dyn PlayerStateAccessor>>,
    database: Arc<dyn DatabaseLoader>,
    core: Vec<CoreRegistration>,
}

impl ModgateServerBuilder {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            catalog: ModCatalog::new(),
            player_states: None,
            database: Arc::new(EmptyDatabase),
            core: Vec::new(),
        }
    }

    /// The mod entry points this server can activate.
    pub fn catalog(mut self, catalog: ModCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Where item-event batches find player state. Defaults to an empty
    /// [`InMemoryPlayerStates`].
    pub fn player_states(mut self, accessor: Arc<dyn PlayerStateAccessor>) -> Self {
        self.player_states = Some(accessor);
        self
    }

    /// The database step run between pre-load and post-database-load.
    pub fn database(mut self, loader: Arc<dyn DatabaseLoader>) -> Self {
        self.database = loader;
        self
    }

    /// Adds core registration that runs before any mod hook. Core routes
    /// therefore win over mod routes for identical static paths.
    pub fn core<F>(mut self, register: F) -> Self
    where
        F: FnOnce(&mut LoadRegistries) -> Result<(), ModgateError> + Send + 'static,
    {
        self.core.push(Box::new(register));
        self
    }

    /// Runs the boot sequence and seals the registries.
    ///
    /// # Errors
    ///
    /// Any fatal mod-set problem, a failing sync hook, a failing
    /// database load or a failing core registration aborts the boot.
    pub async fn build(self) -> Result<ModgateServer, ModgateError> {
        let Self {
            config,
            catalog,
            player_states,
            database,
            core,
        } = self;

        let context = Arc::new(ContextStore::with_depth(config.context_depth));
        let mut registries = LoadRegistries::new(Arc::clone(&context));

        for register in core {
            register(&mut registries)?;
        }

        let mut loader = ModLoader::prepare(&config.loader, &catalog).await?;
        let mut reports = Vec::with_capacity(3);

        reports.push(loader.run_phase(LoadPhase::PreLoad, &mut registries).await?);
        database
            .load(&mut registries)
            .await
            .map_err(|err| ModgateError::Database(err.into()))?;
        reports.push(loader.run_phase(LoadPhase::PostDatabaseLoad, &mut registries).await?);
        reports.push(loader.run_phase(LoadPhase::PostLoad, &mut registries).await?);

        let load_order = loader.load_order().into_iter().map(str::to_string).collect();
        let player_states =
            player_states.unwrap_or_else(|| Arc::new(InMemoryPlayerStates::new()));

        seal(config, registries, player_states, load_order, reports)
    }
}

/// Freezes the load-phase registries into a [`ModgateServer`].
fn seal(
    config: ServerConfig,
    registries: LoadRegistries,
    player_states: Arc<dyn PlayerStateAccessor>,
    load_order: Vec<String>,
    reports: Vec<PhaseReport>,
) -> Result<ModgateServer, ModgateError> {
    let LoadRegistries {
        mut routes,
        mut serializers,
        actions,
        updates,
        bundles,
        services,
        context,
    } = registries;

    let bundles = Arc::new(bundles);
    let (list, download) = bundle_routers(&bundles)?;
    routes.add_static_router(list);
    routes.add_dynamic_router(download);
    serializers.register(BundleSerializer::new(Arc::clone(&bundles)));

    let events = EventActionRouter::new(Arc::new(actions), player_states)
        .with_policy(config.batch_failure);

    info!(
        mods = load_order.len(),
        routes = routes.route_count(),
        serializers = serializers.len(),
        action_groups = events.groups().len(),
        update_hooks = updates.len(),
        bundles = bundles.len(),
        "server sealed"
    );

    Ok(ModgateServer {
        config,
        routes: Arc::new(routes),
        serializers: Arc::new(serializers),
        events: Arc::new(events),
        updates: Arc::new(updates),
        bundles,
        services: Arc::new(services),
        context,
        codec: JsonCodec,
        load_order,
        reports,
    })
}

// ---------------------------------------------------------------------------
// Sealed server
// ---------------------------------------------------------------------------

/// A booted server. Every registry is read-only from here on.
pub struct ModgateServer {
    pub(crate) config: ServerConfig,
    pub(crate) routes: Arc<RouteTable>,
    pub(crate) serializers: Arc<SerializerRegistry>,
    pub(crate) events: Arc<EventActionRouter>,
    pub(crate) updates: Arc<UpdateRegistry>,
    pub(crate) bundles: Arc<BundleRegistry>,
    pub(crate) services: Arc<ServiceScope>,
    pub(crate) context: Arc<ContextStore>,
    pub(crate) codec: JsonCodec,
    load_order: Vec<String>,
    reports: Vec<PhaseReport>,
}

impl ModgateServer {
    /// Creates a builder.
    pub fn builder(config: ServerConfig) -> ModgateServerBuilder {
        ModgateServerBuilder::new(config)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn serializers(&self) -> &SerializerRegistry {
        &self.serializers
    }

    pub fn events(&self) -> &EventActionRouter {
        &self.events
    }

    pub fn bundles(&self) -> &BundleRegistry {
        &self.bundles
    }

    /// The shared root service scope.
    pub fn services(&self) -> &ServiceScope {
        &self.services
    }

    pub fn context(&self) -> &Arc<ContextStore> {
        &self.context
    }

    /// Mod names in the order they were loaded.
    pub fn load_order(&self) -> &[String] {
        &self.load_order
    }

    /// One report per phase, in phase order.
    pub fn phase_reports(&self) -> &[PhaseReport] {
        &self.reports
    }

    /// Starts the update scheduler, unless disabled in the config.
    pub fn spawn_updates(&self) -> Option<UpdateHandle> {
        if !self.config.updates.enabled {
            info!("update scheduler disabled");
            return None;
        }
        let scheduler = UpdateScheduler::new(self.config.updates.clone(), Arc::clone(&self.updates));
        Some(scheduler.spawn())
    }
}
