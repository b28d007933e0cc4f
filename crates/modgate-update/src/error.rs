//! Error types for the update layer.

/// Errors returned by an [`UpdateHandle`](crate::UpdateHandle).
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// The scheduler task has stopped or its command channel is full.
    #[error("update scheduler is not running")]
    Unavailable,
}
