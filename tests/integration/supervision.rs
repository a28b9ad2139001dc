#![cfg(unix)]

#[path = "common/mod.rs"]
mod common;

use std::{fs, os::unix::fs::PermissionsExt, time::Duration};

use aw_supervisor::{
    locate::Locator,
    logs::LogDirectory,
    manager::Manager,
    module::Provenance,
    test_utils::wait_until,
};
use common::{install_module, is_process_alive, started_marker, wait_for_lines, wait_for_path};
use nix::{
    sys::signal::{self, Signal},
    unistd::Pid,
};
use tempfile::tempdir;

#[test]
fn start_by_name_launches_the_bundled_executable() {
    let bundle = tempdir().expect("failed to create bundle dir");
    let system = tempdir().expect("failed to create system dir");
    install_module(bundle.path(), "aw-server");
    install_module(system.path(), "aw-server");

    let locator = Locator::new(
        vec![bundle.path().to_path_buf()],
        vec![system.path().to_path_buf()],
    );
    let mut manager = Manager::discover(&locator, false);
    assert_eq!(manager.modules().len(), 1);

    manager.start("aw-server").expect("start failed");
    wait_for_path(&started_marker(bundle.path(), "aw-server"));
    assert!(!started_marker(system.path(), "aw-server").exists());
    assert_eq!(
        manager.get("aw-server").map(|m| m.provenance()),
        Some(Provenance::Bundled)
    );

    manager.stop_all().expect("stop_all failed");
}

#[test]
fn autostart_runs_rust_server_first_and_skips_legacy_server() {
    let bundle = tempdir().expect("failed to create bundle dir");
    for name in ["aw-server", "aw-server-rust", "aw-watcher-afk"] {
        install_module(bundle.path(), name);
    }

    let locator = Locator::new(vec![bundle.path().to_path_buf()], Vec::new());
    let mut manager = Manager::discover(&locator, false);
    let requested = ["aw-watcher-afk", "aw-server-rust", "aw-server"];

    assert_eq!(
        manager.plan_autostart(&requested),
        vec!["aw-server-rust", "aw-watcher-afk"]
    );

    manager.autostart(&requested).expect("autostart failed");
    wait_for_path(&started_marker(bundle.path(), "aw-server-rust"));
    wait_for_path(&started_marker(bundle.path(), "aw-watcher-afk"));

    let legacy = manager.get_mut("aw-server").expect("legacy server discovered");
    assert!(!legacy.started());
    assert!(!legacy.is_alive());
    assert!(!started_marker(bundle.path(), "aw-server").exists());

    manager.stop_all().expect("stop_all failed");
    assert!(manager.status(None).iter().all(|s| !s.alive));
}

#[test]
fn externally_killed_module_is_reported_until_stopped() {
    let bundle = tempdir().expect("failed to create bundle dir");
    install_module(bundle.path(), "aw-watcher-window");

    let locator = Locator::new(vec![bundle.path().to_path_buf()], Vec::new());
    let mut manager = Manager::discover(&locator, false);
    manager.start("aw-watcher-window").expect("start failed");

    let pid = manager
        .get("aw-watcher-window")
        .and_then(|m| m.pid())
        .expect("module has a pid");
    assert!(manager.get_unexpected_stops().is_empty());

    signal::kill(Pid::from_raw(pid as i32), Signal::SIGKILL).expect("failed to kill module");

    assert!(wait_until(Duration::from_secs(5), || {
        manager
            .get_unexpected_stops()
            .iter()
            .any(|m| m.name() == "aw-watcher-window")
    }));

    manager.stop("aw-watcher-window").expect("stop failed");
    assert!(manager.get_unexpected_stops().is_empty());
    assert!(!is_process_alive(pid));
}

#[test]
fn stopped_module_log_stays_readable() {
    let bundle = tempdir().expect("failed to create bundle dir");
    let logs = tempdir().expect("failed to create log dir");
    let log_dir = logs.path().join("aw-echo");
    let log_file = log_dir.join("aw-echo_testing_2024-05-01T12-00-00.log");

    let script = bundle.path().join("aw-echo");
    fs::write(
        &script,
        format!(
            "#!/bin/sh\nmkdir -p '{dir}'\necho \"echo $@\" > '{file}.tmp'\nmv '{file}.tmp' '{file}'\nexec sleep 30\n",
            dir = log_dir.display(),
            file = log_file.display(),
        ),
    )
    .expect("failed to write module script");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755))
        .expect("failed to mark module executable");

    let locator = Locator::new(vec![bundle.path().to_path_buf()], Vec::new());
    let mut manager = Manager::discover(&locator, true)
        .with_log_source(Box::new(LogDirectory::new(logs.path())));

    manager.start("aw-echo").expect("start failed");
    {
        let module = manager.get_mut("aw-echo").expect("module discovered");
        assert!(module.is_alive());
        assert!(module.started());
    }
    wait_for_path(&log_file);

    manager.stop("aw-echo").expect("stop failed");
    let module = manager.get_mut("aw-echo").expect("module discovered");
    assert!(!module.is_alive());
    assert!(!module.started());
    assert!(module.exit_status().is_some());

    let log = manager.read_log("aw-echo").expect("log readable");
    assert_eq!(log.trim(), "echo --testing");
}

#[test]
fn restarting_a_module_spawns_a_fresh_process() {
    let bundle = tempdir().expect("failed to create bundle dir");
    install_module(bundle.path(), "aw-watcher-afk");

    let locator = Locator::new(vec![bundle.path().to_path_buf()], Vec::new());
    let mut manager = Manager::discover(&locator, false);
    let marker = started_marker(bundle.path(), "aw-watcher-afk");

    manager.toggle("aw-watcher-afk").expect("first toggle failed");
    wait_for_lines(&marker, 1);
    manager.toggle("aw-watcher-afk").expect("second toggle failed");
    manager.toggle("aw-watcher-afk").expect("third toggle failed");

    let lines = wait_for_lines(&marker, 2);
    assert_eq!(lines.len(), 2);
    assert!(manager.status(Some("aw-watcher-afk"))[0].alive);

    manager.stop_all().expect("stop_all failed");
}
