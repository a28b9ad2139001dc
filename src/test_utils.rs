use std::{
    thread,
    time::{Duration, Instant},
};

/// Writes a `/bin/sh` script with the execute bit set and returns its path.
#[cfg(unix)]
pub fn write_executable(
    dir: &std::path::Path,
    name: &str,
    body: &str,
) -> std::path::PathBuf {
    use std::{fs, os::unix::fs::PermissionsExt};

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("chmod script");
    path
}

/// Polls `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(20));
    }
}
