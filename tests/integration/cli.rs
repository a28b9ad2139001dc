#![cfg(unix)]

#[path = "common/mod.rs"]
mod common;

use std::{fs, path::Path, time::Duration};

use assert_cmd::Command;
use common::install_module;
use predicates::{prelude::*, str::contains};
use tempfile::tempdir;

fn aw_qt(system_dir: &Path, config: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("aw-qt"));
    cmd.env("PATH", format!("{}:/usr/bin:/bin", system_dir.display()))
        .env_remove("RUST_LOG")
        .arg("--testing")
        .arg("--config")
        .arg(config)
        .timeout(Duration::from_secs(30));
    cmd
}

fn write_config(dir: &Path, autostart: &str) -> std::path::PathBuf {
    let path = dir.join("aw-qt.yaml");
    fs::write(
        &path,
        format!(
            "aw-qt:\n  autostart_modules: [aw-server]\naw-qt-testing:\n  autostart_modules: [{autostart}]\n  log_dir: {}\n",
            dir.join("logs").display()
        ),
    )
    .expect("failed to write config");
    path
}

#[test]
fn help_describes_the_supervisor() {
    Command::new(assert_cmd::cargo::cargo_bin!("aw-qt"))
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("ActivityWatch").and(contains("--autostart-modules")));
}

#[test]
fn interactive_session_reports_autostarted_modules() {
    let temp = tempdir().expect("failed to create tempdir");
    let system = temp.path().join("bin");
    fs::create_dir_all(&system).expect("failed to create bin dir");
    install_module(&system, "aw-watcher-afk");
    let config = write_config(temp.path(), "aw-watcher-afk");

    aw_qt(&system, &config)
        .arg("-i")
        .write_stdin("status\njson aw-watcher-afk\nbogus\nq\n")
        .assert()
        .success()
        .stdout(
            contains("aw-watcher-afk")
                .and(contains("running"))
                .and(contains("\"provenance\": \"system\""))
                .and(contains("Unknown command: bogus")),
        );
}

#[test]
fn autostart_override_none_starts_nothing() {
    let temp = tempdir().expect("failed to create tempdir");
    let system = temp.path().join("bin");
    fs::create_dir_all(&system).expect("failed to create bin dir");
    install_module(&system, "aw-watcher-afk");
    let config = write_config(temp.path(), "aw-watcher-afk");

    aw_qt(&system, &config)
        .arg("-i")
        .arg("--autostart-modules")
        .arg("none")
        .write_stdin("s\nlog aw-watcher-afk\n")
        .assert()
        .success()
        .stdout(contains("stopped").and(contains("No log file found")));

    assert!(!system.join("aw-watcher-afk.started").exists());
}

#[test]
fn missing_config_file_is_an_error() {
    let temp = tempdir().expect("failed to create tempdir");

    aw_qt(temp.path(), &temp.path().join("absent.yaml"))
        .arg("-i")
        .write_stdin("q\n")
        .assert()
        .failure()
        .stderr(contains("absent.yaml"));
}
