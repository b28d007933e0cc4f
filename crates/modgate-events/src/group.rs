//! Action handler groups and their registry.

use std::sync::Arc;

use async_trait::async_trait;
use modgate_protocol::SessionId;
use serde_json::Value;

use crate::{ActionRequest, HandledAction, ItemEventOutput};

/// A set of item-event actions served by one controller.
///
/// The router hands the group the session's player-state document
/// (locked for the duration of the call) and the batch output built so
/// far; the group returns the output the next action should see.
/// Recoverable problems go into `output.warnings`; an `Err` aborts the
/// batch.
#[async_trait]
pub trait ActionHandlerGroup: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// The actions this group serves.
    fn handled_actions(&self) -> &[HandledAction];

    /// Whether this group serves `action`.
    fn can_handle(&self, action: &str) -> bool {
        self.handled_actions().iter().any(|h| h.action == action)
    }

    /// Handles one action. `index` is the action's position in its
    /// batch, for [`Warning::index`](modgate_protocol::Warning).
    async fn handle_action(
        &self,
        action: &str,
        index: usize,
        player_state: &mut Value,
        request: &ActionRequest,
        session: &SessionId,
        output: ItemEventOutput,
    ) -> anyhow::Result<ItemEventOutput>;
}

/// Registered handler groups, in registration order.
#[derive(Default)]
pub struct ActionGroupRegistry {
    groups: Vec<Arc<dyn ActionHandlerGroup>>,
}

impl ActionGroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a group.
    pub fn register(&mut self, group: impl ActionHandlerGroup + 'static) {
        self.register_arc(Arc::new(group));
    }

    /// Appends an already shared group.
    pub fn register_arc(&mut self, group: Arc<dyn ActionHandlerGroup>) {
        tracing::debug!(
            group = group.name(),
            actions = group.handled_actions().len(),
            "action handler group registered"
        );
        self.groups.push(group);
    }

    /// The first group that serves `action`.
    pub fn resolve(&self, action: &str) -> Option<&Arc<dyn ActionHandlerGroup>> {
        self.groups.iter().find(|g| g.can_handle(action))
    }

    /// Every action declared by any group, in registration order.
    pub fn handled_actions(&self) -> impl Iterator<Item = &HandledAction> {
        self.groups.iter().flat_map(|g| g.handled_actions())
    }

    /// Actions that need post-raid processing.
    pub fn post_raid_actions(&self) -> Vec<&str> {
        self.handled_actions()
            .filter(|h| h.requires_post_raid_processing)
            .map(|h| h.action.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
