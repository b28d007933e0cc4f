//! The lifecycle trait mods implement, and the catalog of entry points.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;

use crate::ModRegistrar;

/// A mod's lifecycle hooks.
///
/// Every hook is optional. Each phase calls the synchronous hook first,
/// then its `_async` counterpart. The two differ in failure policy:
///
/// | variant | on `Err` |
/// |---|---|
/// | sync | boot aborts ([`LoaderError::HookFailed`](crate::LoaderError)) |
/// | async | logged, recorded in the [`PhaseReport`](crate::PhaseReport), next mod continues |
///
/// ```text
/// PreLoad ──▶ (database loads) ──▶ PostDatabaseLoad ──▶ PostLoad ──▶ serving
/// ```
///
/// All mods finish a phase before any mod starts the next one.
#[async_trait]
pub trait ServerMod: Send + Sync {
    /// Before the database is read.
    fn pre_load(&mut self, _registrar: &mut ModRegistrar<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn pre_load_async(&mut self, _registrar: &mut ModRegistrar<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// After the database is populated. Bundles are registered by now.
    fn post_database_load(&mut self, _registrar: &mut ModRegistrar<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn post_database_load_async(
        &mut self,
        _registrar: &mut ModRegistrar<'_>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// After every core service is ready.
    fn post_load(&mut self, _registrar: &mut ModRegistrar<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn post_load_async(&mut self, _registrar: &mut ModRegistrar<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

type ModFactory = Box<dyn Fn() -> Box<dyn ServerMod> + Send + Sync>;

/// The mods this server binary was built with, keyed by the `main` name
/// manifests refer to.
///
/// Installing a mod directory only activates code that is in the
/// catalog; a manifest naming anything else is rejected before any hook
/// runs.
#[derive(Default)]
pub struct ModCatalog {
    factories: HashMap<String, ModFactory>,
}

impl ModCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for entry point `main`.
    pub fn register<M, F>(&mut self, main: impl Into<String>, factory: F) -> &mut Self
    where
        M: ServerMod + 'static,
        F: Fn() -> M + Send + Sync + 'static,
    {
        self.factories
            .insert(main.into(), Box::new(move || Box::new(factory()) as Box<dyn ServerMod>));
        self
    }

    /// Registers `M::default` for entry point `main`.
    pub fn register_default<M>(&mut self, main: impl Into<String>) -> &mut Self
    where
        M: ServerMod + Default + 'static,
    {
        self.register(main, M::default)
    }

    /// Creates a fresh instance for `main`.
    pub fn instantiate(&self, main: &str) -> Option<Box<dyn ServerMod>> {
        self.factories.get(main).map(|factory| factory())
    }

    pub fn contains(&self, main: &str) -> bool {
        self.factories.contains_key(main)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for ModCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        entries.sort_unstable();
        f.debug_struct("ModCatalog").field("entries", &entries).finish()
    }
}
