//! Module discovery.
//!
//! Bundled installs are walked recursively (only through `aw-*` directories) and keep
//! entries whose name starts with the module prefix. Search-path directories are listed
//! one level deep and keep executables whose name contains the prefix anywhere. Both
//! scans iterate in file-name order so the result does not depend on how the file system
//! happens to list a directory.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::{
    constants::{DENYLIST, MODULE_PREFIX},
    locate::{Locator, is_executable, module_name},
    module::{Module, Provenance},
};

/// Discovers bundled and system modules, dropping denylisted names.
///
/// A name can appear twice, once per provenance; the manager resolves that.
pub fn discover(locator: &Locator) -> Vec<Module> {
    let mut modules = discover_bundled(locator.bundle_dirs());
    modules.extend(discover_system(locator.search_path()));

    modules.retain(|module| {
        let denied = is_denied(module.name(), locator.supervisor_name());
        if denied {
            debug!("Ignoring denylisted executable {:?}", module.path());
        }
        !denied
    });

    info!("Discovered {} module(s)", modules.len());
    modules
}

/// Walks each bundle directory for module executables.
pub fn discover_bundled(dirs: &[PathBuf]) -> Vec<Module> {
    let mut modules: Vec<Module> = Vec::new();

    for dir in dirs.iter().filter(|dir| dir.is_dir()) {
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || has_module_prefix(entry));

        for entry in walker.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                continue;
            }

            if !is_executable(path) {
                warn!("Found matching file but it is not executable: {:?}", path);
                continue;
            }

            let Some(file_name) = entry.file_name().to_str() else {
                continue;
            };

            let module = Module::new(module_name(file_name), path, Provenance::Bundled);
            if modules.contains(&module) {
                continue;
            }

            debug!("Found bundled module '{}' at {:?}", module.name(), path);
            modules.push(module);
        }
    }

    modules
}

/// Lists each search-path directory for module executables.
///
/// Directories are visited in search-path order and the first executable for a given
/// name wins.
pub fn discover_system(search_path: &[PathBuf]) -> Vec<Module> {
    let mut modules: Vec<Module> = Vec::new();

    for dir in search_path {
        for file_name in module_file_names(dir) {
            let path = dir.join(&file_name);
            if !is_executable(&path) {
                continue;
            }

            let name = module_name(&file_name);
            if let Some(existing) = modules.iter().find(|m| m.name() == name) {
                debug!(
                    "Ignoring {:?}; '{name}' already found at {:?}",
                    path,
                    existing.path()
                );
                continue;
            }

            debug!("Found system module '{name}' at {:?}", path);
            modules.push(Module::new(name, path, Provenance::System));
        }
    }

    modules
}

/// Returns `true` for names that must never be supervised.
pub fn is_denied(name: &str, supervisor_name: Option<&str>) -> bool {
    DENYLIST.contains(&name) || supervisor_name == Some(name)
}

fn has_module_prefix(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with(MODULE_PREFIX))
}

/// Sorted entry names of `dir` that mention the module prefix anywhere, so packaged names
/// like `org.activitywatch.aw-sync` are picked up. Unreadable directories yield nothing.
fn module_file_names(dir: &Path) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!("Skipping search path entry {:?}: {err}", dir);
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.contains(MODULE_PREFIX))
        .collect();
    names.sort();
    names
}
