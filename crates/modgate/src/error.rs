//! Unified error type for modgate.

use std::path::PathBuf;

use modgate_events::EventError;
use modgate_mods::LoaderError;
use modgate_protocol::ProtocolError;
use modgate_router::RouterError;
use modgate_update::UpdateError;

/// Boxed error from collaborator code (database loaders, response sinks).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` variants let `?` convert sub-crate errors, so code using
/// the `modgate` meta crate only deals with this one type.
#[derive(Debug, thiserror::Error)]
pub enum ModgateError {
    /// Encoding or decoding failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A route could not be registered.
    #[error(transparent)]
    Router(#[from] RouterError),

    /// An item-event batch was aborted.
    #[error(transparent)]
    Events(#[from] EventError),

    /// The mod set could not be loaded.
    #[error(transparent)]
    Loader(#[from] LoaderError),

    /// The update scheduler is gone.
    #[error(transparent)]
    Update(#[from] UpdateError),

    /// The config file could not be read.
    #[error("cannot read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML of the expected shape.
    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The database loader failed.
    #[error("database load failed: {0}")]
    Database(#[source] BoxError),

    /// Writing a response failed.
    #[error("response write failed: {0}")]
    ResponseWrite(#[source] BoxError),

    /// Binding or serving failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
