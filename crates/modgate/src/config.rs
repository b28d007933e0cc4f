//! Server configuration.
//!
//! Every field has a default, so an empty TOML file is a valid config:
//!
//! ```toml
//! bind = "127.0.0.1:6969"
//! log_filter = "info,modgate_mods=debug"
//! context_depth = 10
//! batch_failure = "partial_apply"   # or "restore_snapshot"
//!
//! [loader]
//! mods_dir = "user/mods"
//! order_file = "order.json"
//! enabled = true
//!
//! [updates]
//! enabled = true
//! interval_secs = 5
//! ```

use std::path::Path;

use modgate_context::DEFAULT_HISTORY_DEPTH;
use modgate_events::BatchFailurePolicy;
use modgate_mods::LoaderConfig;
use modgate_update::UpdateConfig;
use serde::{Deserialize, Serialize};

use crate::ModgateError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP front listens on.
    pub bind: String,
    /// `tracing` filter directive, used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Values kept per context kind.
    pub context_depth: usize,
    /// What a failing item-event action does to the player state.
    pub batch_failure: BatchFailurePolicy,
    pub loader: LoaderConfig,
    pub updates: UpdateConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:6969".to_string(),
            log_filter: "info".to_string(),
            context_depth: DEFAULT_HISTORY_DEPTH,
            batch_failure: BatchFailurePolicy::default(),
            loader: LoaderConfig::default(),
            updates: UpdateConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parses a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ModgateError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML config file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ModgateError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ModgateError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
