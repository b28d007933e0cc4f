//! Error types for the item-event layer.

use modgate_protocol::SessionId;

/// Boxed error from a handler group or a player-state backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that abort an item-event batch.
///
/// Unhandled actions and warnings are not errors; they are part of a
/// successful [`BatchOutcome`](crate::BatchOutcome).
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// A handler group failed. Actions after `index` were not processed.
    #[error("action {action} at index {index} failed: {source}")]
    HandlerFailed {
        index: usize,
        action: String,
        #[source]
        source: BoxError,
    },

    /// The player-state document for the session could not be loaded.
    #[error("player state for session {session} is unavailable: {source}")]
    PlayerStateUnavailable {
        session: SessionId,
        #[source]
        source: BoxError,
    },

    /// The request body is not a valid item-event batch.
    #[error("invalid item-event batch: {0}")]
    InvalidBatch(#[from] serde_json::Error),
}
