//! The item-event batch router.
//!
//! One batch runs as a fixed sequence:
//!
//! ```text
//! reset output ─▶ for each action, in order:
//!                   load player state ─▶ first group that serves it?
//!                     yes ─▶ lock state, call group, keep returned output
//!                     no  ─▶ warn, record as unhandled, go on
//!              ─▶ finalize summary (once)
//!              ─▶ classify warnings
//! ```
//!
//! Actions of one batch never run in parallel: each may depend on what
//! the previous one did to the player state.

use std::sync::Arc;

use modgate_protocol::{ResponseEnvelope, SessionId};
use serde::{Deserialize, Serialize};

use crate::{
    ActionGroupRegistry, Classification, EventError, EventOutputHolder, ItemEventBatch,
    ItemEventOutput, PlayerStateAccessor, classify,
};

/// What happens to the player state when an action of a batch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchFailurePolicy {
    /// Mutations made by earlier actions of the batch stay.
    #[default]
    PartialApply,
    /// The document is restored to what it was before the batch.
    RestoreSnapshot,
}

/// Result of a batch that ran to completion.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// The finalized output.
    pub output: ItemEventOutput,
    /// How the response is reported.
    pub classification: Classification,
    /// Names of the actions no group served, in batch order.
    pub unhandled: Vec<String>,
}

impl BatchOutcome {
    /// Wraps the output in the client envelope.
    ///
    /// A critical batch still carries its output so the client can apply
    /// what did succeed.
    pub fn into_envelope(self) -> ResponseEnvelope<ItemEventOutput> {
        match self.classification {
            Classification::Success => ResponseEnvelope::ok(self.output),
            Classification::Critical { code, message } => {
                ResponseEnvelope::with_error(Some(self.output), code, message)
            }
        }
    }
}

/// Dispatches item-event batches to action handler groups.
pub struct EventActionRouter {
    groups: Arc<ActionGroupRegistry>,
    player_states: Arc<dyn PlayerStateAccessor>,
    outputs: EventOutputHolder,
    policy: BatchFailurePolicy,
}

impl EventActionRouter {
    /// Creates a router over a frozen group registry.
    pub fn new(
        groups: Arc<ActionGroupRegistry>,
        player_states: Arc<dyn PlayerStateAccessor>,
    ) -> Self {
        Self {
            groups,
            player_states,
            outputs: EventOutputHolder::new(),
            policy: BatchFailurePolicy::default(),
        }
    }

    /// Sets the failure policy.
    pub fn with_policy(mut self, policy: BatchFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The failure policy in effect.
    pub fn policy(&self) -> BatchFailurePolicy {
        self.policy
    }

    /// The handler groups this router dispatches to.
    pub fn groups(&self) -> &ActionGroupRegistry {
        &self.groups
    }

    /// Decodes `body` as an [`ItemEventBatch`] and runs it.
    pub async fn handle_raw(
        &self,
        body: &serde_json::Value,
        session: &SessionId,
    ) -> Result<BatchOutcome, EventError> {
        let batch = ItemEventBatch::deserialize(body)?;
        self.handle_batch(&batch, session).await
    }

    /// Runs every action of `batch` in order for `session`.
    ///
    /// # Errors
    ///
    /// The first failing handler group aborts the batch with
    /// [`EventError::HandlerFailed`]; what happens to the player state is
    /// decided by the [`BatchFailurePolicy`].
    pub async fn handle_batch(
        &self,
        batch: &ItemEventBatch,
        session: &SessionId,
    ) -> Result<BatchOutcome, EventError> {
        self.outputs.reset(session);

        // Taken right before the first handled action, so a batch of only
        // unhandled actions never touches the player state.
        let restore = self.policy == BatchFailurePolicy::RestoreSnapshot;
        let mut snapshot: Option<serde_json::Value> = None;

        let mut handled = 0;
        let mut unhandled = Vec::new();

        for (index, request) in batch.data.iter().enumerate() {
            let action = request.action.as_str();
            let Some(group) = self.groups.resolve(action) else {
                tracing::warn!(%session, action, index, "unhandled item event action");
                unhandled.push(request.action.clone());
                continue;
            };

            let result = async {
                let handle = self.load_state(session).await?;
                let mut state = handle.lock().await;
                if restore && snapshot.is_none() {
                    snapshot = Some(state.clone());
                }
                let output = self.outputs.take(session);
                group
                    .handle_action(action, index, &mut state, request, session, output)
                    .await
                    .map_err(|source| EventError::HandlerFailed {
                        index,
                        action: request.action.clone(),
                        source: source.into(),
                    })
            }
            .await;

            match result {
                Ok(output) => {
                    self.outputs.set(session, output);
                    handled += 1;
                }
                Err(err) => {
                    tracing::error!(%session, action, index, group = group.name(), "item event action failed: {err}");
                    self.abort(session, snapshot).await;
                    return Err(err);
                }
            }
        }

        self.outputs.finalize(session, handled, unhandled.len());
        let output = self.outputs.take(session);
        self.outputs.clear(session);
        let classification = classify(&output.warnings);

        tracing::debug!(
            %session,
            handled,
            unhandled = unhandled.len(),
            warnings = output.warnings.len(),
            critical = classification.is_critical(),
            "item event batch processed"
        );

        Ok(BatchOutcome {
            output,
            classification,
            unhandled,
        })
    }

    async fn load_state(&self, session: &SessionId) -> Result<crate::PlayerStateHandle, EventError> {
        self.player_states
            .player_state(session)
            .await
            .map_err(|source| EventError::PlayerStateUnavailable {
                session: session.clone(),
                source: source.into(),
            })
    }

    async fn abort(&self, session: &SessionId, snapshot: Option<serde_json::Value>) {
        self.outputs.clear(session);
        let Some(snapshot) = snapshot else {
            return;
        };
        match self.load_state(session).await {
            Ok(handle) => {
                *handle.lock().await = snapshot;
                tracing::info!(%session, "player state restored after failed batch");
            }
            Err(err) => tracing::error!(%session, "could not restore player state: {err}"),
        }
    }
}
