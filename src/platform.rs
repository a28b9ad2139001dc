//! Per-platform process quirks.
//!
//! The engine only ever needs to spawn, signal and wait. Everything that differs between
//! operating systems (process groups, parent-death signals, console windows) lives here.

use std::{
    io,
    process::{Child, Command, Stdio},
};

use tracing::debug;
#[cfg(unix)]
use tracing::warn;

#[cfg(unix)]
use nix::{
    errno::Errno,
    sys::signal::{self, SigHandler, Signal},
    unistd::{self, Pid},
};

#[cfg(unix)]
use crate::error::nix_error_to_io;

/// Applies the platform specific spawn options to a module command.
///
/// Module output is never piped back to the supervisor: a child blocked on a full pipe
/// that nobody drains will hang forever. Modules write their own log files instead.
pub fn prepare_command(cmd: &mut Command) {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    // Children stay in the supervisor's process group, so a single group signal
    // reaches the whole tree.
    #[cfg(target_os = "linux")]
    {
        use std::os::unix::process::CommandExt;

        unsafe {
            cmd.pre_exec(|| {
                use libc::{PR_SET_PDEATHSIG, SIGTERM, prctl};
                if prctl(PR_SET_PDEATHSIG, SIGTERM, 0, 0, 0) < 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;

        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
}

/// Asks a child to shut down gracefully.
///
/// A child that has already exited is not an error.
pub fn request_termination(child: &mut Child) -> io::Result<()> {
    #[cfg(unix)]
    {
        let pid = Pid::from_raw(child.id() as i32);
        match signal::kill(pid, Signal::SIGTERM) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => {
                debug!("Process {pid} exited before SIGTERM could be delivered");
                Ok(())
            }
            Err(err) => Err(nix_error_to_io(err)),
        }
    }

    #[cfg(not(unix))]
    {
        // No graceful signal exists; TerminateProcess is the closest equivalent.
        match child.kill() {
            Err(err) if err.kind() == io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }
}

/// Forcefully kills a child that ignored [`request_termination`].
pub fn force_kill(child: &mut Child) -> io::Result<()> {
    match child.kill() {
        // Already reaped.
        Err(err) if err.kind() == io::ErrorKind::InvalidInput => Ok(()),
        other => other,
    }
}

/// Makes the supervisor the leader of its own process group.
///
/// Children spawned afterwards inherit the group, which lets
/// [`broadcast_termination`] reach every one of them. This fails with `EPERM` when the
/// supervisor already leads a session (for example under systemd); the session leader
/// already leads its group, so the failure is harmless.
pub fn become_group_leader() {
    #[cfg(unix)]
    {
        match unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0)) {
            Ok(()) => debug!("Supervisor now leads process group {}", unistd::getpgrp()),
            Err(Errno::EPERM) => {
                debug!("Supervisor is a session leader; keeping its process group")
            }
            Err(err) => warn!("Failed to create a process group for the supervisor: {err}"),
        }
    }

    #[cfg(not(unix))]
    debug!("Process groups are not available on this platform");
}

/// Sends `SIGTERM` to every process in the supervisor's group.
///
/// This is a best-effort sweep after the explicit per-module stops. It only fires when
/// the supervisor leads its group, otherwise it would hit the shell that launched it.
pub fn broadcast_termination() {
    #[cfg(unix)]
    {
        let group = unistd::getpgrp();
        if group != unistd::getpid() {
            debug!("Supervisor does not lead process group {group}; skipping group signal");
            return;
        }

        if let Err(err) = unsafe { signal::signal(Signal::SIGTERM, SigHandler::SigIgn) } {
            warn!("Failed to ignore SIGTERM before signalling the process group: {err}");
            return;
        }

        match signal::killpg(group, Signal::SIGTERM) {
            Ok(()) => debug!("Sent SIGTERM to process group {group}"),
            Err(Errno::ESRCH) => {}
            Err(err) => warn!("Failed to signal process group {group}: {err}"),
        }
    }

    #[cfg(not(unix))]
    debug!("Process groups are not available on this platform");
}
