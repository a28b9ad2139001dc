//! Names, flags and intervals shared by the discovery and supervision code.
//!
//! Keeping these in one place makes it obvious which strings the supervisor treats
//! specially, and lets tests refer to the same values the engine uses.

use std::time::Duration;

// ============================================================================
// Module naming
// ============================================================================

/// Every supervisable executable carries this file-name prefix.
pub const MODULE_PREFIX: &str = "aw-";

/// Executables that match [`MODULE_PREFIX`] but must never be supervised.
///
/// `aw-qt` is the supervisor itself; `aw-client` and `aw-cli` are command-line
/// helpers that exit immediately and would otherwise be reported as crashes.
pub const DENYLIST: &[&str] = &["aw-qt", "aw-client", "aw-cli"];

/// File extensions that look launchable but are packaging artifacts.
pub const IGNORED_EXTENSIONS: &[&str] = &["desktop"];

/// Extensions accepted as executables on Windows.
#[cfg(windows)]
pub const WINDOWS_EXECUTABLE_EXTENSIONS: &[&str] = &["exe", "bat", "cmd", "com"];

// ============================================================================
// Autostart ordering
// ============================================================================

/// Server module that must be started before anything else.
pub const PRIMARY_MODULE: &str = "aw-server-rust";

/// Older server implementation, started first only when [`PRIMARY_MODULE`] was not
/// requested.
pub const LEGACY_PRIMARY_MODULE: &str = "aw-server";

/// Modules autostarted when the settings file does not say otherwise.
pub const DEFAULT_AUTOSTART_MODULES: &[&str] =
    &["aw-server", "aw-watcher-afk", "aw-watcher-window"];

// ============================================================================
// Process control
// ============================================================================

/// Flag appended to a module's command line when running in testing mode.
pub const TESTING_FLAG: &str = "--testing";

/// Interval at which the front end polls for modules that stopped on their own.
pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(2);

/// Granularity of the front end's wait loop while checking for shutdown requests.
pub const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Poll interval used while waiting for a child with a bounded stop timeout.
pub const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Text returned by `read_log` when a module has never written a log file.
pub const NO_LOG_FILE: &str = "No log file found";

// ============================================================================
// Settings
// ============================================================================

/// Settings section used in normal mode.
pub const SETTINGS_SECTION: &str = "aw-qt";

/// Settings section used with `--testing`.
pub const SETTINGS_SECTION_TESTING: &str = "aw-qt-testing";

/// File name of the settings file inside the configuration directory.
pub const SETTINGS_FILE_NAME: &str = "aw-qt.yaml";

/// Top-level directory shared by every ActivityWatch component.
pub const APP_DIR_NAME: &str = "activitywatch";
