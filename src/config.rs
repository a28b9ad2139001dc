//! Settings for the supervisor.
//!
//! The settings file is YAML with one section per mode:
//!
//! ```yaml
//! aw-qt:
//!   autostart_modules: [aw-server-rust, aw-watcher-afk, aw-watcher-window]
//!   stop_timeout: 10s
//! aw-qt-testing:
//!   autostart_modules: [aw-server-rust]
//! ```
use serde::Deserialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

use crate::{
    constants::{
        APP_DIR_NAME, DEFAULT_AUTOSTART_MODULES, SETTINGS_FILE_NAME, SETTINGS_SECTION,
        SETTINGS_SECTION_TESTING,
    },
    error::ManagerError,
};

/// Raw layout of the settings file.
#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(rename = "aw-qt")]
    normal: Option<Settings>,
    #[serde(rename = "aw-qt-testing")]
    testing: Option<Settings>,
}

/// Settings for one mode (normal or testing).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Modules started when the supervisor boots.
    pub autostart_modules: Vec<String>,
    /// Fixed module list. When set, these names are located individually instead of
    /// scanning for every `aw-*` executable.
    pub possible_modules: Option<Vec<String>>,
    /// Grace period before a module that ignores the termination signal is killed
    /// (`<number>[s|m|h]`). Unset means wait indefinitely.
    pub stop_timeout: Option<String>,
    /// Root directory of module log files.
    pub log_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            autostart_modules: DEFAULT_AUTOSTART_MODULES
                .iter()
                .map(|name| name.to_string())
                .collect(),
            possible_modules: None,
            stop_timeout: None,
            log_dir: None,
        }
    }
}

impl Settings {
    /// Parsed [`Settings::stop_timeout`].
    pub fn stop_timeout(&self) -> Result<Option<Duration>, ManagerError> {
        self.stop_timeout.as_deref().map(parse_duration).transpose()
    }
}

/// Default location of the settings file for the current platform.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| {
        dir.join(APP_DIR_NAME)
            .join(SETTINGS_SECTION)
            .join(SETTINGS_FILE_NAME)
    })
}

/// Loads the settings for the given mode.
///
/// An explicit `path` must exist. Without one, the platform default is used and a
/// missing file simply yields the defaults.
pub fn load_settings(path: Option<&Path>, testing: bool) -> Result<Settings, ManagerError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_settings_path() {
            Some(path) if path.exists() => path,
            _ => {
                debug!("No settings file found; using defaults");
                return Ok(Settings::default());
            }
        },
    };

    let content = fs::read_to_string(&path).map_err(|e| {
        ManagerError::ConfigReadError(io::Error::new(
            e.kind(),
            format!("{} ({})", e, path.display()),
        ))
    })?;

    debug!("Loaded settings from {:?}", path);
    parse_settings(&content, testing)
}

/// Parses settings text, picking the section for the given mode.
pub fn parse_settings(content: &str, testing: bool) -> Result<Settings, ManagerError> {
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }

    let file: SettingsFile = serde_yaml::from_str(content)?;
    let section = if testing { file.testing } else { file.normal };
    if section.is_none() {
        let name = if testing {
            SETTINGS_SECTION_TESTING
        } else {
            SETTINGS_SECTION
        };
        debug!("Settings file has no '{name}' section; using defaults");
    }

    Ok(section.unwrap_or_default())
}

/// Parses the `--autostart-modules` override.
///
/// Entries are comma separated and trimmed; empty entries and `none` are dropped, so
/// `none` alone disables autostart.
pub fn parse_autostart_override(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty() && !name.eq_ignore_ascii_case("none"))
        .map(str::to_string)
        .collect()
}

/// Parses a user-facing duration string in the format `<number>[s|m|h]`.
pub fn parse_duration(raw: &str) -> Result<Duration, ManagerError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ManagerError::InvalidDuration(raw.to_string()));
    }

    let (amount_str, multiplier) = if let Some(stripped) = value.strip_suffix('s') {
        (stripped.trim(), 1)
    } else if let Some(stripped) = value.strip_suffix('m') {
        (stripped.trim(), 60)
    } else if let Some(stripped) = value.strip_suffix('h') {
        (stripped.trim(), 3600)
    } else {
        (value, 1)
    };

    let amount: u64 = amount_str
        .parse()
        .map_err(|_| ManagerError::InvalidDuration(raw.to_string()))?;

    Ok(Duration::from_secs(amount.saturating_mul(multiplier)))
}
