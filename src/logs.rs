//! Lookup of the log files modules write about themselves.
//!
//! Every ActivityWatch module logs into `<log root>/<module>/`, one file per run, with a
//! sortable timestamp in the file name. Testing runs put `testing` in the name.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::constants::APP_DIR_NAME;

/// Finds the most recent log file of a module.
pub trait LogSource {
    /// Returns the newest log file for `module`, if any exists.
    fn latest_log_file(&self, module: &str, testing: bool) -> Option<PathBuf>;
}

/// Log files stored under a per-module directory tree.
#[derive(Debug, Clone)]
pub struct LogDirectory {
    root: PathBuf,
}

impl LogDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Uses the platform's user log directory for ActivityWatch.
    ///
    /// Falls back to a relative `logs` directory when the platform reports no home.
    pub fn platform_default() -> Self {
        Self::new(default_log_root().unwrap_or_else(|| PathBuf::from("logs")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the log files of `module`.
    pub fn module_dir(&self, module: &str) -> PathBuf {
        self.root.join(module)
    }
}

impl LogSource for LogDirectory {
    fn latest_log_file(&self, module: &str, testing: bool) -> Option<PathBuf> {
        let dir = self.module_dir(module);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("No log directory for '{module}' at {:?}: {err}", dir);
                return None;
            }
        };

        entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.contains(module) && name.contains("testing") == testing)
            .max()
            .map(|name| dir.join(name))
    }
}

#[cfg(target_os = "linux")]
fn default_log_root() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(APP_DIR_NAME).join("log"))
}

#[cfg(target_os = "macos")]
fn default_log_root() -> Option<PathBuf> {
    dirs::home_dir().map(|dir| dir.join("Library").join("Logs").join(APP_DIR_NAME))
}

#[cfg(target_os = "windows")]
fn default_log_root() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join(APP_DIR_NAME).join(APP_DIR_NAME).join("Logs"))
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn default_log_root() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(APP_DIR_NAME).join("log"))
}
