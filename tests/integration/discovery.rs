#![cfg(unix)]

#[path = "common/mod.rs"]
mod common;

use std::fs;

use aw_supervisor::{
    discovery::discover,
    locate::Locator,
    manager::Manager,
    module::{Module, Provenance},
};
use common::install_module;
use tempfile::tempdir;

fn names(modules: &[&Module]) -> Vec<String> {
    modules.iter().map(|m| m.name().to_string()).collect()
}

#[test]
fn supervisor_and_helper_executables_are_never_discovered() {
    let bundle = tempdir().expect("failed to create bundle dir");
    let system = tempdir().expect("failed to create system dir");
    install_module(bundle.path(), "aw-qt");
    install_module(bundle.path(), "aw-server-rust");
    install_module(system.path(), "aw-client");
    install_module(system.path(), "aw-cli");
    install_module(system.path(), "aw-qt");
    install_module(system.path(), "aw-watcher-afk");

    let locator = Locator::new(
        vec![bundle.path().to_path_buf()],
        vec![system.path().to_path_buf()],
    );
    let discovered: Vec<String> = discover(&locator)
        .iter()
        .map(|m| m.name().to_string())
        .collect();

    assert_eq!(discovered, vec!["aw-server-rust", "aw-watcher-afk"]);
}

#[test]
fn manager_partitions_modules_by_provenance() {
    let bundle = tempdir().expect("failed to create bundle dir");
    let system = tempdir().expect("failed to create system dir");
    install_module(bundle.path(), "aw-server-rust");
    install_module(bundle.path(), "aw-watcher-window");
    install_module(system.path(), "aw-watcher-window");
    install_module(system.path(), "aw-watcher-input");

    let locator = Locator::new(
        vec![bundle.path().to_path_buf()],
        vec![system.path().to_path_buf()],
    );
    let manager = Manager::discover(&locator, false);

    assert_eq!(
        names(&manager.modules_bundled()),
        vec!["aw-server-rust", "aw-watcher-window"]
    );
    assert_eq!(names(&manager.modules_system()), vec!["aw-watcher-input"]);
    assert_eq!(manager.modules().len(), 3);
}

#[test]
fn bundle_dirs_on_the_search_path_are_not_reported_as_system() {
    let bundle = tempdir().expect("failed to create bundle dir");
    install_module(bundle.path(), "aw-server");

    let locator = Locator::new(
        vec![bundle.path().to_path_buf()],
        vec![bundle.path().to_path_buf()],
    );
    let manager = Manager::discover(&locator, false);

    assert_eq!(names(&manager.modules_bundled()), vec!["aw-server"]);
    assert!(manager.modules_system().is_empty());
}

#[test]
fn fixed_module_list_resolves_through_the_locator() {
    let bundle = tempdir().expect("failed to create bundle dir");
    let system = tempdir().expect("failed to create system dir");
    install_module(bundle.path(), "aw-server-rust");
    install_module(system.path(), "aw-watcher-afk");
    install_module(system.path(), "aw-watcher-window");

    // Not executable, so not a module.
    fs::write(system.path().join("aw-sync"), "#!/bin/sh\n").expect("failed to write file");

    let locator = Locator::new(
        vec![bundle.path().to_path_buf()],
        vec![system.path().to_path_buf()],
    );
    let manager = Manager::from_names(
        &locator,
        &["aw-server-rust", "aw-watcher-afk", "aw-sync"],
        false,
    );

    let found: Vec<(&str, Provenance)> = manager
        .modules()
        .iter()
        .map(|m| (m.name(), m.provenance()))
        .collect();
    assert_eq!(
        found,
        vec![
            ("aw-server-rust", Provenance::Bundled),
            ("aw-watcher-afk", Provenance::System),
        ]
    );
}
