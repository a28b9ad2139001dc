//! Owns the supervised modules and the operations the front end drives.
use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    config::Settings,
    constants::{LEGACY_PRIMARY_MODULE, PRIMARY_MODULE},
    discovery::{self, is_denied},
    error::ManagerError,
    locate::Locator,
    logs::{LogDirectory, LogSource},
    module::{Module, Provenance},
};

/// Read-only projection of one module, for status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleStatus {
    pub name: String,
    pub provenance: Provenance,
    pub alive: bool,
    pub started: bool,
    pub pid: Option<u32>,
    pub path: String,
}

impl ModuleStatus {
    /// Human readable state: `running`, `crashed` or `stopped`.
    pub fn state(&self) -> &'static str {
        match (self.alive, self.started) {
            (true, _) => "running",
            (false, true) => "crashed",
            (false, false) => "stopped",
        }
    }
}

/// The collection of supervised modules.
///
/// Names are unique: when a module exists both bundled and on the search path, only the
/// bundled one is kept. The manager is not shared between threads; callers serialise
/// access by owning it.
pub struct Manager {
    modules: Vec<Module>,
    testing: bool,
    logs: Box<dyn LogSource>,
}

impl Manager {
    /// Discovers modules around the running executable and on `PATH`.
    pub fn new(testing: bool) -> Self {
        Self::discover(&Locator::from_env(), testing)
    }

    /// Builds the module set by scanning the locator's directories.
    pub fn discover(locator: &Locator, testing: bool) -> Self {
        Self::with_modules(discovery::discover(locator), testing)
    }

    /// Builds the module set from a fixed list of names.
    ///
    /// Names the locator cannot resolve are logged and left out.
    pub fn from_names<S: AsRef<str>>(locator: &Locator, names: &[S], testing: bool) -> Self {
        let mut modules = Vec::new();

        for name in names.iter().map(AsRef::as_ref) {
            if is_denied(name, locator.supervisor_name()) {
                debug!("Ignoring denylisted module '{name}'");
                continue;
            }

            match locator.locate(name) {
                Some(located) => {
                    debug!("Located module '{name}' at {:?}", located.path);
                    modules.push(Module::from_located(name, located));
                }
                None => warn!("Module {name} not found"),
            }
        }

        Self::with_modules(modules, testing)
    }

    /// Builds the manager the settings describe.
    ///
    /// `possible_modules` selects a fixed module list, otherwise the directories are
    /// scanned. The stop timeout and log directory apply to every module.
    pub fn from_settings(
        locator: &Locator,
        settings: &Settings,
        testing: bool,
    ) -> Result<Self, ManagerError> {
        let stop_timeout = settings.stop_timeout()?;

        let mut manager = match &settings.possible_modules {
            Some(names) => Self::from_names(locator, names, testing),
            None => Self::discover(locator, testing),
        };

        manager.set_stop_timeout(stop_timeout);
        if let Some(dir) = &settings.log_dir {
            manager = manager.with_log_source(Box::new(LogDirectory::new(dir)));
        }

        Ok(manager)
    }

    /// Wraps already constructed modules, keeping one module per name.
    ///
    /// Bundled modules win over system ones. Modules end up sorted by name.
    pub fn with_modules(mut modules: Vec<Module>, testing: bool) -> Self {
        modules.sort_by(|a, b| {
            a.name()
                .cmp(b.name())
                .then(a.provenance().cmp(&b.provenance()))
        });
        modules.dedup_by(|dropped, kept| {
            let duplicate = dropped.name() == kept.name();
            if duplicate {
                debug!(
                    "Module '{}' at {:?} is shadowed by {:?}",
                    dropped.name(),
                    dropped.path(),
                    kept.path()
                );
            }
            duplicate
        });

        Self {
            modules,
            testing,
            logs: Box::new(LogDirectory::platform_default()),
        }
    }

    /// Replaces where [`Manager::read_log`] looks for log files.
    pub fn with_log_source(mut self, logs: Box<dyn LogSource>) -> Self {
        self.logs = logs;
        self
    }

    /// Applies a stop timeout to every module.
    pub fn set_stop_timeout(&mut self, timeout: Option<std::time::Duration>) {
        for module in &mut self.modules {
            module.set_stop_timeout(timeout);
        }
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn modules_bundled(&self) -> Vec<&Module> {
        self.modules_with(Provenance::Bundled)
    }

    pub fn modules_system(&self) -> Vec<&Module> {
        self.modules_with(Provenance::System)
    }

    fn modules_with(&self, provenance: Provenance) -> Vec<&Module> {
        self.modules
            .iter()
            .filter(|m| m.provenance() == provenance)
            .collect()
    }

    pub fn testing(&self) -> bool {
        self.testing
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.modules.iter_mut().find(|m| m.name() == name)
    }

    /// Starts a module by name. Unknown names are logged and ignored.
    pub fn start(&mut self, name: &str) -> Result<(), ManagerError> {
        let testing = self.testing;
        match self.get_mut(name) {
            Some(module) => module.start(testing),
            None => {
                error!("Manager tried to start nonexistent module {name}");
                Ok(())
            }
        }
    }

    /// Stops a module by name. Unknown names are logged and ignored.
    pub fn stop(&mut self, name: &str) -> Result<(), ManagerError> {
        match self.get_mut(name) {
            Some(module) => module.stop(),
            None => {
                error!("Manager tried to stop nonexistent module {name}");
                Ok(())
            }
        }
    }

    /// Toggles a module by name. Unknown names are logged and ignored.
    pub fn toggle(&mut self, name: &str) -> Result<(), ManagerError> {
        let testing = self.testing;
        match self.get_mut(name) {
            Some(module) => module.toggle(testing),
            None => {
                error!("Manager tried to toggle nonexistent module {name}");
                Ok(())
            }
        }
    }

    /// Order in which [`Manager::autostart`] starts the requested modules.
    ///
    /// Unknown names are logged and dropped, duplicates collapse. The server comes
    /// first: `aw-server-rust` if requested, else `aw-server`. Requesting both never
    /// starts the legacy server. The rest follow in name order.
    pub fn plan_autostart<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        let mut requested = BTreeSet::new();
        for name in names.iter().map(AsRef::as_ref) {
            if self.get(name).is_some() {
                requested.insert(name.to_string());
            } else {
                error!("Module {name} not found");
            }
        }

        let primary = [PRIMARY_MODULE, LEGACY_PRIMARY_MODULE]
            .into_iter()
            .find(|name| requested.contains(*name));
        requested.remove(PRIMARY_MODULE);
        requested.remove(LEGACY_PRIMARY_MODULE);

        primary
            .map(str::to_string)
            .into_iter()
            .chain(requested)
            .collect()
    }

    /// Starts the requested modules, server first.
    ///
    /// A module that fails to spawn does not prevent the others from starting; the
    /// first failure is returned once all start calls were issued.
    pub fn autostart<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), ManagerError> {
        let plan = self.plan_autostart(names);
        info!("Autostarting modules: {:?}", plan);

        let mut first_error = None;
        for name in &plan {
            if let Err(err) = self.start(name) {
                first_error.get_or_insert(err);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Stops every module that is currently alive.
    ///
    /// Keeps going when a module fails to stop and returns the first failure.
    pub fn stop_all(&mut self) -> Result<(), ManagerError> {
        info!("Stopping all modules");

        let mut first_error = None;
        for module in &mut self.modules {
            if !module.is_alive() {
                continue;
            }
            if let Err(err) = module.stop() {
                error!("Failed to stop module {}: {err}", module.name());
                first_error.get_or_insert(err);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Modules that should be running but whose process has exited.
    pub fn get_unexpected_stops(&mut self) -> Vec<&Module> {
        self.modules
            .iter_mut()
            .filter_map(|module| {
                if module.is_unexpectedly_stopped() {
                    Some(&*module)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Latest log file contents of a module.
    pub fn read_log(&self, name: &str) -> Result<String, ManagerError> {
        let module = self
            .get(name)
            .ok_or_else(|| ManagerError::ModuleNotFound(name.to_string()))?;
        Ok(module.read_log(self.logs.as_ref(), self.testing))
    }

    /// Status of one module, or of all when `name` is `None`.
    ///
    /// An unknown name is logged and yields an empty list.
    pub fn status(&mut self, name: Option<&str>) -> Vec<ModuleStatus> {
        let statuses: Vec<ModuleStatus> = self
            .modules
            .iter_mut()
            .filter(|m| name.is_none_or(|n| m.name() == n))
            .map(|m| ModuleStatus {
                alive: m.is_alive(),
                name: m.name().to_string(),
                provenance: m.provenance(),
                started: m.started(),
                pid: m.pid(),
                path: m.path().display().to_string(),
            })
            .collect();

        if let Some(name) = name
            && statuses.is_empty()
        {
            error!("Module {name} not found");
        }

        statuses
    }

    /// Prints a status table for one module or all of them.
    pub fn print_status(&mut self, name: Option<&str>) {
        print!("{}", self.render_status(name));
    }

    /// Text printed by [`Manager::print_status`].
    pub fn render_status(&mut self, name: Option<&str>) -> String {
        let statuses = self.status(name);
        match (statuses.is_empty(), name) {
            (false, _) => format_status_table(&statuses),
            (true, Some(name)) => format!("Module {name} not found.\n"),
            (true, None) => "No modules found.\n".to_string(),
        }
    }
}

/// Renders statuses as a `name / status / type` table.
pub fn format_status_table(statuses: &[ModuleStatus]) -> String {
    let width = statuses
        .iter()
        .map(|s| s.name.len())
        .chain(std::iter::once("name".len()))
        .max()
        .unwrap_or(0);

    let mut out = format!("{:<width$}  {:<8}  {}\n", "name", "status", "type");
    for status in statuses {
        out.push_str(&format!(
            "{:<width$}  {:<8}  {}\n",
            status.name,
            status.state(),
            status.provenance
        ));
    }
    out
}
