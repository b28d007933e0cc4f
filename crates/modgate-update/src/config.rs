//! Update scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// How often the update hooks run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Whether the scheduler runs at all.
    pub enabled: bool,
    /// Seconds between two passes over the hooks.
    pub interval_secs: u64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: Self::DEFAULT_INTERVAL_SECS,
        }
    }
}

impl UpdateConfig {
    /// Interval used when none is configured.
    pub const DEFAULT_INTERVAL_SECS: u64 = 5;

    /// Creates an enabled config with the given interval.
    pub fn every(interval_secs: u64) -> Self {
        Self {
            interval_secs,
            ..Default::default()
        }
    }

    /// Fixes out-of-range values. A zero interval would spin, so it is
    /// raised to one second.
    pub fn validated(mut self) -> Self {
        if self.interval_secs == 0 {
            warn!("update interval_secs is 0, using 1");
            self.interval_secs = 1;
        }
        self
    }

    /// The interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
