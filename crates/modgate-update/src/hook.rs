//! The update hook contract and its registry.

use std::sync::Arc;

use async_trait::async_trait;

/// Work that runs periodically for as long as the server is up
/// (trader restocks, insurance returns, flea market expiry ...).
#[async_trait]
pub trait OnUpdate: Send + Sync {
    /// Name used in logs and reports.
    fn name(&self) -> &str;

    /// Called on every scheduler pass with the seconds elapsed since
    /// this hook last returned `true`.
    ///
    /// Return `true` when the hook did its work, `false` to be called
    /// again next pass with a still-growing elapsed time.
    async fn on_update(&self, secs_since_last_run: u64) -> anyhow::Result<bool>;
}

/// Registered hooks, in registration order.
#[derive(Default)]
pub struct UpdateRegistry {
    hooks: Vec<Arc<dyn OnUpdate>>,
}

impl UpdateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a hook.
    pub fn register(&mut self, hook: impl OnUpdate + 'static) {
        self.register_arc(Arc::new(hook));
    }

    /// Appends an already shared hook.
    pub fn register_arc(&mut self, hook: Arc<dyn OnUpdate>) {
        tracing::debug!(hook = hook.name(), "update hook registered");
        self.hooks.push(hook);
    }

    /// The hooks, in registration order.
    pub fn hooks(&self) -> &[Arc<dyn OnUpdate>] {
        &self.hooks
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}
