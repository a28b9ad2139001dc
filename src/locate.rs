//! Resolves a module name to a launchable executable.
//!
//! A module is looked up next to the supervisor first (the bundled install), then on
//! the search path. Lookups never fail loudly: a missing executable is reported as
//! `None` and the caller decides how to log it.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{constants::IGNORED_EXTENSIONS, module::Provenance};

#[cfg(windows)]
use crate::constants::WINDOWS_EXECUTABLE_EXTENSIONS;

/// A resolved executable together with where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    /// Absolute or search-path-relative location of the executable.
    pub path: PathBuf,
    /// Whether the executable ships with the supervisor or came from the search path.
    pub provenance: Provenance,
}

/// Knows the directories in which modules can live.
#[derive(Debug, Clone, Default)]
pub struct Locator {
    /// Directories of the supervisor's own installation, in lookup order.
    bundle_dirs: Vec<PathBuf>,
    /// Search-path directories in priority order, without any bundle directory.
    search_path: Vec<PathBuf>,
    /// Module name of the running supervisor executable, if known.
    supervisor_name: Option<String>,
}

impl Locator {
    /// Creates a locator over explicit directories.
    ///
    /// Bundle directories are dropped from the search path: packaging tools like to
    /// inject the install directory into `PATH`, and those executables are already
    /// covered by the bundled lookup.
    pub fn new(bundle_dirs: Vec<PathBuf>, search_path: Vec<PathBuf>) -> Self {
        let search_path = search_path
            .into_iter()
            .filter(|dir| !bundle_dirs.contains(dir))
            .collect();

        Self {
            bundle_dirs,
            search_path,
            supervisor_name: None,
        }
    }

    /// Builds a locator from the running executable and the `PATH` variable.
    ///
    /// If the supervisor cannot resolve its own path, only the search path is used.
    pub fn from_env() -> Self {
        let exe = match env::current_exe() {
            Ok(exe) => Some(exe.canonicalize().unwrap_or(exe)),
            Err(err) => {
                warn!("Cannot resolve the supervisor executable, skipping bundled modules: {err}");
                None
            }
        };

        let search_path = env::var_os("PATH")
            .map(|raw| env::split_paths(&raw).collect())
            .unwrap_or_default();

        let bundle_dirs = exe.as_deref().map(bundle_dirs_for).unwrap_or_default();
        let mut locator = Self::new(bundle_dirs, search_path);
        locator.supervisor_name = exe
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .map(module_name);

        debug!(
            "Module locator: bundle dirs {:?}, search path {:?}",
            locator.bundle_dirs, locator.search_path
        );
        locator
    }

    /// Records the supervisor's own module name so discovery can skip it.
    pub fn with_supervisor_name(mut self, name: impl Into<String>) -> Self {
        self.supervisor_name = Some(name.into());
        self
    }

    pub fn bundle_dirs(&self) -> &[PathBuf] {
        &self.bundle_dirs
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    pub fn supervisor_name(&self) -> Option<&str> {
        self.supervisor_name.as_deref()
    }

    /// Finds the executable for `name`, preferring the bundled install.
    ///
    /// Search-path directories are tried in order and the first hit wins, so `PATH`
    /// priority is respected.
    pub fn locate(&self, name: &str) -> Option<Located> {
        if let Some(path) = find_in(&self.bundle_dirs, name) {
            return Some(Located {
                path,
                provenance: Provenance::Bundled,
            });
        }

        find_in(&self.search_path, name).map(|path| Located {
            path,
            provenance: Provenance::System,
        })
    }
}

/// Directories of a bundled install relative to the supervisor executable.
fn bundle_dirs_for(exe: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Some(own_dir) = exe.parent() {
        dirs.push(own_dir.to_path_buf());

        if let Some(parent) = own_dir.parent() {
            dirs.push(parent.to_path_buf());

            // `Foo.app/Contents/MacOS/aw-qt` ships its modules in `Contents/Resources`.
            #[cfg(target_os = "macos")]
            dirs.push(parent.join("Resources"));
        }
    }

    dirs
}

fn find_in(dirs: &[PathBuf], name: &str) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| candidate_file_names(name).into_iter().map(move |f| dir.join(f)))
        .find(|path| is_executable(path))
}

#[cfg(not(windows))]
fn candidate_file_names(name: &str) -> Vec<String> {
    vec![name.to_string()]
}

#[cfg(windows)]
fn candidate_file_names(name: &str) -> Vec<String> {
    let mut names: Vec<String> = WINDOWS_EXECUTABLE_EXTENSIONS
        .iter()
        .map(|ext| format!("{name}.{ext}"))
        .collect();
    names.push(name.to_string());
    names
}

/// Returns `true` if `path` is a regular file the platform would launch.
///
/// Desktop entries are rejected even when they carry an execute bit.
pub fn is_executable(path: &Path) -> bool {
    let ignored = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IGNORED_EXTENSIONS.iter().any(|i| ext.eq_ignore_ascii_case(i)));
    if ignored {
        return false;
    }

    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }

    #[cfg(windows)]
    {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                WINDOWS_EXECUTABLE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
    }

    #[cfg(not(any(unix, windows)))]
    {
        true
    }
}

/// Maps an executable file name to its module name (`aw-server.exe` -> `aw-server`).
pub fn module_name(file_name: &str) -> String {
    let stem_len = file_name.len().saturating_sub(4);
    if stem_len > 0
        && let Some(suffix) = file_name.get(stem_len..)
        && suffix.eq_ignore_ascii_case(".exe")
    {
        return file_name[..stem_len].to_string();
    }

    file_name.to_string()
}
