//! Wire shapes of an item-event batch and its output.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use modgate_protocol::Warning;

/// The route clients post item-event batches to.
pub const ITEM_EVENT_ROUTE: &str = "/client/game/profile/items/moving";

/// Declares one action a handler group serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledAction {
    /// Action name as sent by the client (`"Move"`, `"Eat"`, ...).
    pub action: String,
    /// Whether the action also needs work once the raid is over.
    pub requires_post_raid_processing: bool,
}

impl HandledAction {
    /// An action with no post-raid processing.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            requires_post_raid_processing: false,
        }
    }

    /// Marks the action as needing post-raid processing.
    pub fn post_raid(mut self) -> Self {
        self.requires_post_raid_processing = true;
        self
    }
}

/// One action of a batch.
///
/// Only the action name is interpreted by the router; everything else
/// is handed to the handler group untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// The action name.
    #[serde(rename = "Action")]
    pub action: String,
    /// Action-specific fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ActionRequest {
    /// Builds an action with no extra fields.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            fields: Map::new(),
        }
    }

    /// Adds a field.
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Returns a field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// A batch as posted to [`ITEM_EVENT_ROUTE`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemEventBatch {
    /// Actions, in the order they must run.
    pub data: Vec<ActionRequest>,
    /// Client timestamp.
    #[serde(default)]
    pub tm: u64,
    /// Client reload counter.
    #[serde(default)]
    pub reload: u64,
}

impl ItemEventBatch {
    /// A batch of the given actions.
    pub fn new(data: Vec<ActionRequest>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }
}

/// Derived counters, recomputed once per batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSummary {
    /// Actions a handler group processed.
    pub handled_actions: usize,
    /// Actions no group claimed.
    pub unhandled_actions: usize,
    /// Warnings accumulated over the batch.
    pub warning_count: usize,
    /// Top-level entries in `profileChanges`.
    pub changed_profiles: usize,
}

/// The output a batch accumulates. Each handler group receives the
/// current value and returns the next one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemEventOutput {
    /// Warnings, in the order they were produced.
    pub warnings: Vec<Warning>,
    /// Per-profile changes the client applies to its local copy.
    pub profile_changes: Map<String, Value>,
    /// Derived counters.
    pub summary: OutputSummary,
}

impl ItemEventOutput {
    /// Appends a warning.
    pub fn push_warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    /// Returns the change object for `profile_id`, creating it if needed.
    pub fn profile_change(&mut self, profile_id: &str) -> &mut Value {
        self.profile_changes
            .entry(profile_id.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
    }
}
