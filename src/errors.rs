//! Typed error hierarchy for the scaffold phase tracker.
//!
//! Three top-level enums cover the three error classes:
//! - `UsageError`: bad phase numbers, reported before any state is touched
//! - `StateError`: state file read/parse/write failures (fatal, never repaired)
//! - `ConfigError`: `scaffold.toml` read/parse failures
//!
//! `ScaffoldError` unifies them for the tracker and dispatcher.

use std::path::PathBuf;
use thiserror::Error;

/// Errors caused by how the tool was invoked.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("Invalid phase number {phase}: expected a value between 1 and {max}")]
    InvalidPhase { phase: u32, max: u32 },
}

/// Errors from loading, saving or deleting the state file.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to read state file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("State file at {path} is not valid scaffold state: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize scaffold state: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to write state file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove state file at {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the project configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = ScaffoldError> = std::result::Result<T, E>;
