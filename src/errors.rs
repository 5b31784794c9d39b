// src/errors.rs

//! Crate-wide error types.

use std::path::PathBuf;

use thiserror::Error;

/// Why a single build attempt for a module did not produce a fresh artifact.
///
/// Cloneable so one failed attempt can be reported to every request that was
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("failed to start build for module '{module}': {detail}")]
    Spawn { module: String, detail: String },

    #[error("build for module '{module}' failed ({status}): {detail}")]
    Failed {
        module: String,
        status: String,
        detail: String,
    },

    #[error("copying source for module '{module}' failed: {detail}")]
    Io { module: String, detail: String },

    #[error("build for module '{module}' ended without reporting an outcome: {detail}")]
    Aborted { module: String, detail: String },

    #[error("attempting to compile modules, but none were found")]
    NoModules,

    #[error("unknown module '{0}'")]
    UnknownModule(String),
}

/// A watch could not be registered for one of a module's dependency files.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot watch {path:?}: {detail}")]
pub struct WatchError {
    pub path: PathBuf,
    pub detail: String,
}

#[derive(Error, Debug)]
pub enum BuildgateError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BuildgateError {
    /// True for a missing-file condition, which the dispatcher swallows so
    /// the host can produce its own not-found response.
    pub fn is_not_found(&self) -> bool {
        match self {
            BuildgateError::IoError(err) => err.kind() == std::io::ErrorKind::NotFound,
            BuildgateError::Other(err) => err
                .downcast_ref::<std::io::Error>()
                .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound),
            _ => false,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildgateError>;
