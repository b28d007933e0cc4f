//! Access to player-state documents.
//!
//! Profile storage is outside the core. The router only needs a handle
//! to a session's document that it can lock for the duration of one
//! action.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use modgate_protocol::SessionId;
use serde_json::Value;
use tokio::sync::Mutex;

/// A session's player-state document, locked one action at a time.
pub type PlayerStateHandle = Arc<Mutex<Value>>;

/// Loads the player-state document of a session.
#[async_trait]
pub trait PlayerStateAccessor: Send + Sync {
    /// Returns the handle to `session`'s document.
    async fn player_state(&self, session: &SessionId) -> anyhow::Result<PlayerStateHandle>;
}

/// Keeps every document in memory. Used by tests and the demo server.
#[derive(Debug, Default)]
pub struct InMemoryPlayerStates {
    states: DashMap<SessionId, PlayerStateHandle>,
}

impl InMemoryPlayerStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `state` as `session`'s document, replacing any previous one.
    pub fn insert(&self, session: SessionId, state: Value) -> PlayerStateHandle {
        let handle = Arc::new(Mutex::new(state));
        self.states.insert(session, Arc::clone(&handle));
        handle
    }

    /// Returns a copy of `session`'s document.
    pub async fn snapshot(&self, session: &SessionId) -> Option<Value> {
        let handle = self.states.get(session).map(|h| Arc::clone(h.value()))?;
        let state = handle.lock().await;
        Some(state.clone())
    }
}

#[async_trait]
impl PlayerStateAccessor for InMemoryPlayerStates {
    async fn player_state(&self, session: &SessionId) -> anyhow::Result<PlayerStateHandle> {
        self.states
            .get(session)
            .map(|handle| Arc::clone(handle.value()))
            .ok_or_else(|| anyhow::anyhow!("no player state stored for session {session}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_player_state_returns_shared_handle() {
        let states = InMemoryPlayerStates::new();
        let session = SessionId::new("pmc");
        states.insert(session.clone(), json!({"level": 1}));

        let handle = states.player_state(&session).await.unwrap();
        handle.lock().await["level"] = json!(2);

        assert_eq!(states.snapshot(&session).await, Some(json!({"level": 2})));
    }

    #[tokio::test]
    async fn test_player_state_unknown_session_is_error() {
        let states = InMemoryPlayerStates::new();
        let err = states
            .player_state(&SessionId::new("ghost"))
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("ghost"));
    }
}
