//! Per-session output accumulator.

use dashmap::DashMap;
use modgate_protocol::SessionId;

use crate::{ItemEventOutput, OutputSummary};

/// Holds the output each session's current batch is building.
///
/// The router resets a session's entry at the start of a batch, threads
/// it through every handler group, and finalizes it once at the end.
/// Sessions never share an entry.
#[derive(Debug, Default)]
pub struct EventOutputHolder {
    outputs: DashMap<SessionId, ItemEventOutput>,
}

impl EventOutputHolder {
    /// An empty holder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh, empty output for `session`.
    pub fn reset(&self, session: &SessionId) {
        self.outputs.insert(session.clone(), ItemEventOutput::default());
    }

    /// Removes and returns the session's output, leaving an empty one.
    pub fn take(&self, session: &SessionId) -> ItemEventOutput {
        self.outputs
            .get_mut(session)
            .map(|mut slot| std::mem::take(&mut *slot))
            .unwrap_or_default()
    }

    /// Replaces the session's output.
    pub fn set(&self, session: &SessionId, output: ItemEventOutput) {
        self.outputs.insert(session.clone(), output);
    }

    /// Returns a copy of the session's current output.
    pub fn get(&self, session: &SessionId) -> Option<ItemEventOutput> {
        self.outputs.get(session).map(|slot| slot.clone())
    }

    /// Recomputes the derived summary of the session's output.
    pub fn finalize(&self, session: &SessionId, handled: usize, unhandled: usize) {
        if let Some(mut slot) = self.outputs.get_mut(session) {
            slot.summary = OutputSummary {
                handled_actions: handled,
                unhandled_actions: unhandled,
                warning_count: slot.warnings.len(),
                changed_profiles: slot.profile_changes.len(),
            };
        }
    }

    /// Drops the session's output.
    pub fn clear(&self, session: &SessionId) {
        self.outputs.remove(session);
    }
}
