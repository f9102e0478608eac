use std::{io, path::PathBuf, result::Result as StdResult};

use thiserror::Error;

use crate::git::GitError;

/// Custom Result type for prehook operations.
pub type Result<T> = StdResult<T, PrehookError>;

/// Prehook-specific error types
#[derive(Error, Debug)]
pub enum PrehookError {
    /// A git command failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// The pyproject.toml configuration could not be read or written.
    #[error("Config error in {}: {message}", path.display())]
    Config {
        /// Path of the configuration file.
        path: PathBuf,
        /// Human-readable error description.
        message: String,
    },

    /// The pre-commit hook script is missing, foreign, or unreadable.
    #[error("Hook error: {0}")]
    Hook(String),

    /// A plugin command could not be started.
    #[error("Plugin '{name}': failed to run '{command}': {message}")]
    PluginSpawn {
        /// Name of the plugin.
        name: String,
        /// Command line that failed to start.
        command: String,
        /// Human-readable error description.
        message: String,
    },

    /// The operation was cancelled by the user.
    #[error("Aborted by user")]
    UserAborted,

    /// A high-level operation failed.
    #[error("Operation failed: {0}")]
    OperationError(String),

    /// An underlying I/O operation failed.
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl PrehookError {
    /// Return the recommended process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UserAborted => 130,
            Self::Config { .. } => 2,
            Self::Hook(_) => 3,
            Self::Git(_) => 4,
            Self::PluginSpawn { .. } => 5,
            _ => 1,
        }
    }
}
