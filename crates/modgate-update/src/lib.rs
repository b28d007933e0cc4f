//! Periodic update hooks for modgate.
//!
//! Core services and mods register [`OnUpdate`] hooks while the server
//! loads. Once serving, an [`UpdateScheduler`] task wakes every
//! [`UpdateConfig::interval`] and calls each hook with the seconds since
//! it last completed.
//!
//! ```ignore
//! let handle = UpdateScheduler::new(config, Arc::new(registry)).spawn();
//! // ...
//! handle.shutdown().await?;
//! ```

mod config;
mod error;
mod hook;
mod scheduler;

pub use config::UpdateConfig;
pub use error::UpdateError;
pub use hook::{OnUpdate, UpdateRegistry};
pub use scheduler::{UpdateHandle, UpdateReport, UpdateScheduler};
