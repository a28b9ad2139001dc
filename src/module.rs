//! A single supervisable module and the child process it owns.
use std::{
    fs,
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus},
    thread,
    time::{Duration, Instant},
};

use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};
use tracing::{debug, error, info, warn};

use crate::{
    constants::{NO_LOG_FILE, STOP_POLL_INTERVAL, TESTING_FLAG},
    error::ManagerError,
    locate::Located,
    logs::LogSource,
    platform,
};

/// Where a module's executable was found.
///
/// Ordering matters: when two modules share a name, the smaller provenance wins.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Display,
    AsRefStr,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Provenance {
    /// Shipped alongside the supervisor.
    Bundled,
    /// Found on the search path.
    System,
}

/// One supervisable executable.
///
/// `started` records intent ("this module should be running") while `process` holds the
/// live child, if any. The two diverge when a module exits on its own, which is how
/// crashes are detected.
#[derive(Debug)]
pub struct Module {
    name: String,
    path: PathBuf,
    provenance: Provenance,
    started: bool,
    process: Option<Child>,
    /// Handle of the previous child, kept so its exit status can still be read.
    last_process: Option<Child>,
    /// Grace period before a stop escalates to a kill. `None` waits forever.
    stop_timeout: Option<Duration>,
}

impl Module {
    /// Creates a stopped module.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        provenance: Provenance,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            provenance,
            started: false,
            process: None,
            last_process: None,
            stop_timeout: None,
        }
    }

    /// Creates a stopped module from a locator result.
    pub fn from_located(name: impl Into<String>, located: Located) -> Self {
        Self::new(name, located.path, located.provenance)
    }

    /// Sets the grace period used by [`Module::stop`].
    pub fn with_stop_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub(crate) fn set_stop_timeout(&mut self, timeout: Option<Duration>) {
        self.stop_timeout = timeout;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Whether the module is supposed to be running.
    pub fn started(&self) -> bool {
        self.started
    }

    /// PID of the current child process, if one was spawned and not yet stopped.
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().map(Child::id)
    }

    /// Spawns the module's executable, appending `--testing` when requested.
    ///
    /// Starting a module whose process is still alive only logs a warning, so a module
    /// never owns more than one live process.
    pub fn start(&mut self, testing: bool) -> Result<(), ManagerError> {
        if self.is_alive() {
            warn!("Tried to start module {}, but it is already running", self.name);
            return Ok(());
        }

        info!("Starting module {}", self.name);

        let mut cmd = Command::new(&self.path);
        if testing {
            cmd.arg(TESTING_FLAG);
        }
        platform::prepare_command(&mut cmd);

        debug!("Executing command: {cmd:?}");

        let child = cmd.spawn().map_err(|source| {
            error!("Failed to start module '{}': {source}", self.name);
            ManagerError::ModuleStartError {
                module: self.name.clone(),
                source,
            }
        })?;

        debug!("Module '{}' started with PID: {}", self.name, child.id());

        if let Some(previous) = self.process.replace(child) {
            self.last_process = Some(previous);
        }
        self.started = true;
        Ok(())
    }

    /// Polls the child without blocking. `false` when no child exists.
    pub fn is_alive(&mut self) -> bool {
        let Some(child) = self.process.as_mut() else {
            return false;
        };

        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                debug!("Module '{}' has exited with {status}", self.name);
                false
            }
            Err(err) => {
                warn!("Failed to poll module '{}': {err}", self.name);
                false
            }
        }
    }

    /// `true` when the module should be running but its process has exited.
    pub fn is_unexpectedly_stopped(&mut self) -> bool {
        self.started && !self.is_alive()
    }

    /// Terminates the module and waits for it to exit.
    ///
    /// Without a stop timeout the wait is unbounded. With one, a child that outlives the
    /// timeout is killed and [`ManagerError::StopTimeout`] is returned; the module is
    /// stopped either way.
    pub fn stop(&mut self) -> Result<(), ManagerError> {
        self.stop_with(platform::request_termination)
    }

    fn stop_with(
        &mut self,
        terminate: impl FnOnce(&mut Child) -> std::io::Result<()>,
    ) -> Result<(), ManagerError> {
        if !self.started {
            warn!("Tried to stop module {}, but it was never started", self.name);
            return Ok(());
        }

        let mut outcome = Ok(());

        if !self.is_alive() {
            warn!("Tried to stop module {}, but it was already dead", self.name);
        } else if let Some(child) = self.process.as_mut() {
            info!("Stopping module {}", self.name);
            outcome = match terminate(child) {
                Ok(()) => {
                    info!("Waiting for module {} to shut down", self.name);
                    let waited = wait_for_exit(&self.name, child, self.stop_timeout);
                    info!("Module {} has shut down", self.name);
                    waited
                }
                Err(source) => {
                    error!("Failed to signal module '{}': {source}", self.name);
                    Err(ManagerError::ModuleStopError {
                        module: self.name.clone(),
                        source,
                    })
                }
            };
        }

        self.last_process = self.process.take();
        self.started = false;
        outcome
    }

    /// Stops a started module, starts a stopped one.
    pub fn toggle(&mut self, testing: bool) -> Result<(), ManagerError> {
        if self.started {
            self.stop()
        } else {
            self.start(testing)
        }
    }

    /// Exit status of the current or most recent child, without blocking.
    pub fn exit_status(&mut self) -> Option<ExitStatus> {
        let child = self.process.as_mut().or(self.last_process.as_mut())?;
        child.try_wait().ok().flatten()
    }

    /// Returns the module's most recent log file.
    ///
    /// The log is read from disk rather than from the child's output, so this works for
    /// live, stopped and crashed modules alike.
    pub fn read_log(&self, logs: &dyn LogSource, testing: bool) -> String {
        let Some(path) = logs.latest_log_file(&self.name, testing) else {
            return NO_LOG_FILE.to_string();
        };

        // Modules may log raw bytes; undecodable ones must not hide the rest of the log.
        match fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => {
                warn!("Failed to read log file {:?} for '{}': {err}", path, self.name);
                format!("Failed to read log file {}: {err}", path.display())
            }
        }
    }
}

/// Two modules are the same discovery result when both name and path match.
impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.path == other.path
    }
}

impl Eq for Module {}

fn wait_for_exit(
    name: &str,
    child: &mut Child,
    timeout: Option<Duration>,
) -> Result<(), ManagerError> {
    let stop_error = |source| ManagerError::ModuleStopError {
        module: name.to_string(),
        source,
    };

    let Some(timeout) = timeout else {
        child.wait().map_err(stop_error)?;
        return Ok(());
    };

    if wait_with_timeout(child, timeout).map_err(stop_error)?.is_some() {
        return Ok(());
    }

    warn!("Module {name} did not exit within {timeout:?}; killing it");
    platform::force_kill(child).map_err(stop_error)?;
    child.wait().map_err(stop_error)?;

    Err(ManagerError::StopTimeout {
        module: name.to_string(),
        timeout,
    })
}

/// Wait for a child process with a timeout, returning `Ok(None)` on timeout.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;

    loop {
        match child.try_wait()? {
            Some(status) => return Ok(Some(status)),
            None => {
                if Instant::now() >= deadline {
                    return Ok(None);
                }
                thread::sleep(STOP_POLL_INTERVAL);
            }
        }
    }
}
