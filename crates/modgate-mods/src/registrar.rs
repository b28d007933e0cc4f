//! What a mod may touch while it loads.
//!
//! The server owns every registry while it is loading ([`LoadRegistries`]).
//! A mod never sees them directly: each hook call gets a [`ModRegistrar`]
//! that exposes the registration operations and the mod's own service
//! scope, and nothing else.

use std::any::Any;
use std::path::Path;
use std::sync::Arc;

use modgate_context::ContextStore;
use modgate_events::{ActionGroupRegistry, ActionHandlerGroup};
use modgate_router::{
    DynamicRouter, RouteHandler, RouteTable, RouterError, Serializer, SerializerRegistry,
    StaticRouter,
};
use modgate_update::{OnUpdate, UpdateRegistry};

use crate::{BundleRegistry, ModDescriptor, ServiceScope};

/// Every registry the server fills while loading.
///
/// Built by the server before the first phase and frozen when it seals;
/// between the two, core registration and mod hooks mutate it in turn,
/// never concurrently.
pub struct LoadRegistries {
    pub routes: RouteTable,
    pub serializers: SerializerRegistry,
    pub actions: ActionGroupRegistry,
    pub updates: UpdateRegistry,
    pub bundles: BundleRegistry,
    /// The shared root service scope.
    pub services: ServiceScope,
    pub context: Arc<ContextStore>,
}

impl LoadRegistries {
    pub fn new(context: Arc<ContextStore>) -> Self {
        Self {
            routes: RouteTable::new(),
            serializers: SerializerRegistry::new(),
            actions: ActionGroupRegistry::new(),
            updates: UpdateRegistry::new(),
            bundles: BundleRegistry::new(),
            services: ServiceScope::new(),
            context,
        }
    }
}

impl Default for LoadRegistries {
    fn default() -> Self {
        Self::new(Arc::new(ContextStore::new()))
    }
}

/// A mod's capability handle for one hook call.
///
/// Single routes registered here go into one static and one dynamic
/// router per call, added to the route table (after every router
/// registered before) when the hook returns.
pub struct ModRegistrar<'a> {
    registries: &'a mut LoadRegistries,
    scope: &'a mut ServiceScope,
    descriptor: &'a ModDescriptor,
    static_routes: StaticRouter,
    dynamic_routes: DynamicRouter,
}

impl<'a> ModRegistrar<'a> {
    pub(crate) fn new(
        registries: &'a mut LoadRegistries,
        scope: &'a mut ServiceScope,
        descriptor: &'a ModDescriptor,
    ) -> Self {
        Self {
            registries,
            scope,
            descriptor,
            static_routes: StaticRouter::new(),
            dynamic_routes: DynamicRouter::new(),
        }
    }

    /// The calling mod's descriptor.
    pub fn descriptor(&self) -> &ModDescriptor {
        self.descriptor
    }

    /// The calling mod's directory, for its own assets.
    pub fn mod_path(&self) -> &Path {
        &self.descriptor.path
    }

    // -- routes -------------------------------------------------------------

    /// Registers an exact-path route.
    pub fn static_route(
        &mut self,
        path: impl Into<String>,
        handler: impl RouteHandler + 'static,
    ) -> Result<(), RouterError> {
        self.static_routes.register(path, handler)?;
        Ok(())
    }

    /// Registers a substring route. Order among this mod's fragments is
    /// registration order.
    pub fn dynamic_route(
        &mut self,
        fragment: impl Into<String>,
        handler: impl RouteHandler + 'static,
    ) -> Result<(), RouterError> {
        self.dynamic_routes.register(fragment, handler)?;
        Ok(())
    }

    /// Adds a whole static router (for a custom top-level route).
    pub fn add_static_router(&mut self, router: StaticRouter) {
        self.registries.routes.add_static_router(router);
    }

    /// Adds a whole dynamic router.
    pub fn add_dynamic_router(&mut self, router: DynamicRouter) {
        self.registries.routes.add_dynamic_router(router);
    }

    // -- other registries ---------------------------------------------------

    pub fn register_serializer(&mut self, serializer: impl Serializer + 'static) {
        self.registries.serializers.register(serializer);
    }

    pub fn register_action_group(&mut self, group: impl ActionHandlerGroup + 'static) {
        self.registries.actions.register(group);
    }

    pub fn register_update_hook(&mut self, hook: impl OnUpdate + 'static) {
        self.registries.updates.register(hook);
    }

    /// Bundles registered so far (all bundle mods are registered when
    /// post-database-load begins).
    pub fn bundles(&self) -> &BundleRegistry {
        &self.registries.bundles
    }

    /// The shared context store.
    pub fn context(&self) -> &Arc<ContextStore> {
        &self.registries.context
    }

    // -- services -----------------------------------------------------------

    /// Stores a service in this mod's own scope.
    pub fn provide<T: Any + Send + Sync>(&mut self, service: T) {
        self.scope.provide(service);
    }

    /// Publishes a service into the shared root scope, visible to every
    /// mod that loads afterwards.
    pub fn share<T: Any + Send + Sync>(&mut self, service: T) {
        tracing::debug!(
            mod_name = %self.descriptor.name(),
            service = std::any::type_name::<T>(),
            "service shared"
        );
        self.registries.services.provide(service);
    }

    /// Looks a service up in this mod's scope, then in the root scope.
    pub fn resolve<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.scope
            .get::<T>()
            .or_else(|| self.registries.services.get::<T>())
    }

    /// Moves the routes collected during this call into the route table.
    pub(crate) fn finish(self) {
        if !self.static_routes.is_empty() {
            self.registries.routes.add_static_router(self.static_routes);
        }
        if !self.dynamic_routes.is_empty() {
            self.registries.routes.add_dynamic_router(self.dynamic_routes);
        }
    }
}
