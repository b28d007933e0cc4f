//! The database load step between the first two mod phases.

use async_trait::async_trait;
use modgate_mods::LoadRegistries;

/// Populates the game database (items, traders, locations ...).
///
/// Runs once, after every mod's pre-load hooks and before any
/// post-database-load hook. What "the database" is lives outside the
/// core; loaders usually [`share`](modgate_mods::ServiceScope::provide)
/// it through `registries.services` so mods can resolve it.
#[async_trait]
pub trait DatabaseLoader: Send + Sync {
    async fn load(&self, registries: &mut LoadRegistries) -> anyhow::Result<()>;
}

/// A loader that loads nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyDatabase;

#[async_trait]
impl DatabaseLoader for EmptyDatabase {
    async fn load(&self, _registries: &mut LoadRegistries) -> anyhow::Result<()> {
        Ok(())
    }
}
