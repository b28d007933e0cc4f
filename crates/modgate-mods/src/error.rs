//! Error types for the mod loader.

use std::path::PathBuf;

use crate::LoadPhase;

/// Boxed error raised by a mod hook.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that abort server boot.
///
/// Everything here is fatal: the server never starts with a partial mod
/// set. A failing *async* hook is not an error at this level; it shows up
/// in [`PhaseReport::failures`](crate::PhaseReport) instead.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// A mod directory or manifest could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A manifest file is not valid JSON of the expected shape.
    #[error("invalid manifest {path}: {source}")]
    InvalidManifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Two directories declare the same mod name.
    #[error("mod {name} is declared twice ({first} and {second})")]
    DuplicateMod {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// A mod depends on a mod that is not installed.
    #[error("mod {mod_name} depends on {dependency}, which is not installed")]
    MissingDependency { mod_name: String, dependency: String },

    /// Two installed mods declare each other incompatible.
    #[error("mod {mod_name} is incompatible with installed mod {other}")]
    Incompatible { mod_name: String, other: String },

    /// The declared dependencies form a cycle.
    #[error("mod dependency cycle: {}", .members.join(" -> "))]
    DependencyCycle { members: Vec<String> },

    /// A manifest names an entry point the server was not built with.
    #[error("mod {mod_name} names entry point {main}, which is not in the mod catalog")]
    UnknownEntryPoint { mod_name: String, main: String },

    /// A synchronous hook returned an error.
    #[error("{phase} hook of mod {mod_name} failed: {source}")]
    HookFailed {
        mod_name: String,
        phase: LoadPhase,
        #[source]
        source: BoxError,
    },

    /// Phases must run PreLoad, PostDatabaseLoad, PostLoad, once each.
    #[error("cannot run {requested} now, next phase is {expected:?}")]
    PhaseOutOfOrder {
        expected: Option<LoadPhase>,
        requested: LoadPhase,
    },
}
