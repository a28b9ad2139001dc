#![allow(dead_code)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use sysinfo::{Pid, ProcessesToUpdate, System};

/// Installs a module script that appends `<name> <args>` to `<dir>/<name>.started` on
/// every launch, then sleeps until terminated.
pub fn install_module(dir: &Path, name: &str) -> PathBuf {
    let marker = started_marker(dir, name);
    let path = dir.join(name);
    fs::write(
        &path,
        format!(
            "#!/bin/sh\necho \"{name} $@\" >> '{}'\nexec sleep 30\n",
            marker.display()
        ),
    )
    .expect("failed to write module script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("failed to mark module executable");
    path
}

pub fn started_marker(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.started"))
}

pub fn wait_for_lines(path: &Path, expected: usize) -> Vec<String> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(content) = fs::read_to_string(path) {
            let lines: Vec<_> = content.lines().map(|line| line.to_string()).collect();
            if lines.len() >= expected {
                return lines;
            }
        }

        if Instant::now() >= deadline {
            panic!("Timed out waiting for {expected} lines in {:?}", path);
        }

        thread::sleep(Duration::from_millis(100));
    }
}

pub fn wait_for_path(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if path.exists() {
            return;
        }
        thread::sleep(Duration::from_millis(100));
    }
    panic!("Timed out waiting for {:?} to exist", path);
}

pub fn is_process_alive(pid: u32) -> bool {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    system.process(Pid::from_u32(pid)).is_some()
}
