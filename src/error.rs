//! Error handling for the module supervisor.
use std::time::Duration;

use thiserror::Error;

/// Defines all errors that can occur while discovering or supervising modules.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Error reading or accessing the settings file.
    #[error("Failed to read settings file: {0}")]
    ConfigReadError(#[from] std::io::Error),

    /// Error parsing YAML settings.
    #[error("Invalid YAML format: {0}")]
    ConfigParseError(#[from] serde_yaml::Error),

    /// A duration string in the settings could not be parsed.
    #[error("Invalid duration value: '{0}'")]
    InvalidDuration(String),

    /// Error spawning a module process.
    #[error("Failed to start module '{module}': {source}")]
    ModuleStartError {
        /// The module that failed to start.
        module: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// Error signalling or waiting for a module process.
    #[error("Failed to stop module '{module}': {source}")]
    ModuleStopError {
        /// The module that failed to stop.
        module: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// The module ignored the termination request for longer than the configured
    /// timeout and had to be killed.
    #[error("Module '{module}' did not exit within {timeout:?} and was killed")]
    StopTimeout {
        /// The module that had to be killed.
        module: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// No module with this name is known to the manager.
    #[error("Module '{0}' not found")]
    ModuleNotFound(String),
}

/// Converts a raw `nix` errno into an `io::Error` so it can travel as a `#[source]`.
#[cfg(unix)]
pub(crate) fn nix_error_to_io(err: nix::errno::Errno) -> std::io::Error {
    std::io::Error::from_raw_os_error(err as i32)
}
