//! aw-supervisor discovers the ActivityWatch modules installed next to it or on the
//! search path, runs them as child processes, and keeps track of which ones are alive.
//! It powers the `aw-qt` front end: start, stop and toggle modules by name, autostart
//! the configured set with the server first, and notice modules that crashed.

/// CLI interface.
pub mod cli;

/// Settings management.
pub mod config;

/// Shared names and intervals.
pub mod constants;

/// Discovery of module executables.
pub mod discovery;

/// Error handling.
pub mod error;

/// Executable lookup.
pub mod locate;

/// Module log files.
pub mod logs;

/// Module manager.
pub mod manager;

/// A single supervised module.
pub mod module;

/// Platform specific process handling.
pub mod platform;

#[doc(hidden)]
pub mod test_utils;
