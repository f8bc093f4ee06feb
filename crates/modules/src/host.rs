use std::any::Any;
use std::collections::HashMap;

use relayd_config::Entry;
use relayd_hooks::EventBus;
use tracing::{debug, error, warn};

use crate::error::Error;
use crate::module::{LoadCtx, Module, ModuleHeader, UnloadCtx};
use crate::savedata::SaveData;
use crate::version::{check_version, Version, VersionPolicy};

struct Slot {
    module: Box<dyn Module>,
    header: ModuleHeader,
    deps: Vec<String>,
    loaded: bool,
    reloading: bool,
    savedata: SaveData,
    /// This module's own `data { … }` config block, captured at
    /// registration time so a later reload can hand it back unchanged.
    conf: Option<Entry>,
}

struct Symbol {
    owner: String,
    value: Box<dyn Any + Send>,
}

/// Owns the module registry, the dependency graph derived from it, the
/// global symbol table, and the deferred reload queue.
pub struct ModuleHost {
    baseline: Version,
    modules: HashMap<String, Slot>,
    /// Insertion order, preserved so autoload and cascade operations have a
    /// deterministic order to fall back on.
    order: Vec<String>,
    symbols: HashMap<String, Symbol>,
    reload_pending: Vec<String>,
    reload_counter: u64,
}

impl ModuleHost {
    pub fn new(baseline: Version) -> Self {
        ModuleHost {
            baseline,
            modules: HashMap::new(),
            order: Vec::new(),
            symbols: HashMap::new(),
            reload_pending: Vec::new(),
            reload_counter: 0,
        }
    }

    /// Registers a module without loading it, the way `build_module_list`
    /// populates `me.modules` from the config tree before any autoload
    /// pass runs.
    pub fn register(&mut self, module: Box<dyn Module>, conf: Option<Entry>) -> Result<(), Error> {
        let name = module.name().to_string();
        if self.modules.contains_key(&name) {
            return Err(Error::AlreadyRegistered(name));
        }
        let header = module.header();
        let deps = module.dependencies();
        self.order.push(name.clone());
        self.modules.insert(
            name,
            Slot {
                module,
                header,
                deps,
                loaded: false,
                reloading: false,
                savedata: SaveData::new(),
                conf,
            },
        );
        Ok(())
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.modules.get(name).map(|s| s.loaded).unwrap_or(false)
    }

    pub fn header(&self, name: &str) -> Option<&ModuleHeader> {
        self.modules.get(name).map(|s| &s.header)
    }

    /// Reverse-dependency set: every registered module whose `dependencies`
    /// names `name`, used to cascade reloads.
    fn reverse_deps(&self, name: &str) -> Vec<String> {
        self.modules
            .iter()
            .filter(|(_, s)| s.deps.iter().any(|d| d == name))
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Loads `name`, first loading any unloaded dependency. Tolerates
    /// cycles: a module is marked loaded *before* its `load` callback
    /// returns, so a dependency cycle resolves via lazy symbol lookups
    /// rather than infinite recursion.
    pub fn load(&mut self, name: &str, bus: &mut EventBus) -> Result<(), Error> {
        if self.is_loaded(name) {
            return Ok(());
        }
        let deps = self
            .modules
            .get(name)
            .ok_or_else(|| Error::UnknownModule(name.to_string()))?
            .deps
            .clone();
        for dep in &deps {
            if !self.modules.contains_key(dep) {
                return Err(Error::UnknownDependency(name.to_string(), dep.clone()));
            }
            if !self.is_loaded(dep) {
                self.load(dep, bus)?;
            }
        }

        let theirs = self.modules.get(name).unwrap().header.version;
        match check_version(self.baseline, theirs) {
            VersionPolicy::Refuse => {
                error!(target: "modules", module = name, version = %theirs, baseline = %self.baseline, "refusing incompatible module");
                return Err(Error::IncompatibleVersion {
                    module: name.to_string(),
                    ours: self.baseline,
                    theirs,
                });
            }
            VersionPolicy::Warn => {
                warn!(target: "modules", module = name, version = %theirs, baseline = %self.baseline, "module version mismatch tolerated");
            }
            VersionPolicy::Ok => {}
        }

        // Mark loaded ahead of the callback so a reentrant `load` of a
        // module that depends back on this one sees it as satisfied.
        let slot = self.modules.get_mut(name).unwrap();
        slot.loaded = true;
        let reloading = slot.reloading;
        let savedata = std::mem::take(&mut slot.savedata);
        let conf = slot.conf.clone();

        let mut ctx = LoadCtx {
            reloading,
            savedata,
            conf: conf.as_ref(),
            bus,
        };
        let result = self.modules.get_mut(name).unwrap().module.load(&mut ctx);
        match result {
            Ok(()) => {
                debug!(target: "modules", module = name, reloading, "module loaded");
                let slot = self.modules.get_mut(name).unwrap();
                slot.reloading = false;
                Ok(())
            }
            Err(e) => {
                let slot = self.modules.get_mut(name).unwrap();
                slot.loaded = false;
                slot.reloading = false;
                error!(target: "modules", module = name, "load callback failed");
                Err(e)
            }
        }
    }

    /// Unloads `name` after first unloading every loaded reverse dependency.
    /// Refuses only if a dependent refuses to unload; in ordinary operation
    /// this always succeeds.
    pub fn unload(&mut self, name: &str, bus: &mut EventBus) -> Result<(), Error> {
        if !self.modules.contains_key(name) {
            return Err(Error::UnknownModule(name.to_string()));
        }
        if !self.is_loaded(name) {
            return Ok(());
        }
        for dep in self.reverse_deps(name) {
            if self.is_loaded(&dep) {
                self.unload(&dep, bus)?;
            }
        }

        let slot = self.modules.get_mut(name).unwrap();
        slot.loaded = false;
        let reloading = slot.reloading;
        let mut ctx = UnloadCtx { reloading, bus };
        let savedata = self.modules.get_mut(name).unwrap().module.unload(&mut ctx);
        self.modules.get_mut(name).unwrap().savedata = savedata;

        // A module's exported symbols die with it.
        self.symbols.retain(|_, sym| sym.owner != name);

        debug!(target: "modules", module = name, reloading, "module unloaded");
        Ok(())
    }

    /// Marks `name` for reload at end-of-tick rather than acting
    /// immediately.
    pub fn reload_module(&mut self, name: &str) -> Result<(), Error> {
        if !self.modules.contains_key(name) {
            return Err(Error::UnknownModule(name.to_string()));
        }
        self.reload_counter += 1;
        if !self.reload_pending.contains(&name.to_string()) {
            self.reload_pending.push(name.to_string());
        }
        Ok(())
    }

    pub fn reload_counter(&self) -> u64 {
        self.reload_counter
    }

    /// Applies every pending reload queued since the last call. Unloads in
    /// reverse-dependency order with the reloading flag set, then reloads
    /// in forward dependency order. Call once per reactor tick.
    pub fn apply_pending_reloads(&mut self, bus: &mut EventBus) -> Vec<(String, Result<(), Error>)> {
        let pending = std::mem::take(&mut self.reload_pending);
        let mut results = Vec::new();
        for name in &pending {
            if let Some(slot) = self.modules.get_mut(name) {
                slot.reloading = true;
            }
        }
        for name in &pending {
            if self.is_loaded(name) {
                if let Err(e) = self.unload(name, bus) {
                    results.push((name.clone(), Err(e)));
                    continue;
                }
            }
            let res = self.load(name, bus);
            results.push((name.clone(), res));
        }
        results
    }

    /// Registers a symbol owned by `owner` under `name`, replacing the
    /// value the module's last load may have left there.
    pub fn register_symbol<T: Send + 'static>(&mut self, owner: &str, name: &str, value: T) {
        self.symbols.insert(
            name.to_string(),
            Symbol {
                owner: owner.to_string(),
                value: Box::new(value),
            },
        );
    }

    pub fn lookup_symbol<T: Send + 'static>(&self, name: &str) -> Result<&T, Error> {
        let sym = self
            .symbols
            .get(name)
            .ok_or_else(|| Error::UnknownSymbol(name.to_string()))?;
        sym.value
            .downcast_ref::<T>()
            .ok_or_else(|| Error::SymbolTypeMismatch(name.to_string()))
    }

    pub fn registered_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::Version;

    struct Recorder {
        name: &'static str,
        deps: Vec<String>,
        loaded_with_reload: std::cell::Cell<Option<bool>>,
    }

    impl Module for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn header(&self) -> ModuleHeader {
            ModuleHeader {
                version: Version::new(1, 0, 0),
                description: self.name.to_string(),
            }
        }

        fn dependencies(&self) -> Vec<String> {
            self.deps.clone()
        }

        fn load(&mut self, ctx: &mut LoadCtx<'_>) -> Result<(), Error> {
            self.loaded_with_reload.set(Some(ctx.reloading));
            Ok(())
        }

        fn unload(&mut self, _ctx: &mut UnloadCtx<'_>) -> SaveData {
            SaveData::new()
        }
    }

    #[test]
    fn loading_a_module_loads_its_dependency_first() {
        let mut host = ModuleHost::new(Version::new(1, 0, 0));
        let mut bus = EventBus::new();
        host.register(
            Box::new(Recorder {
                name: "base",
                deps: vec![],
                loaded_with_reload: std::cell::Cell::new(None),
            }),
            None,
        )
        .unwrap();
        host.register(
            Box::new(Recorder {
                name: "dependent",
                deps: vec!["base".to_string()],
                loaded_with_reload: std::cell::Cell::new(None),
            }),
            None,
        )
        .unwrap();

        host.load("dependent", &mut bus).unwrap();
        assert!(host.is_loaded("base"));
        assert!(host.is_loaded("dependent"));
    }

    #[test]
    fn unloading_cascades_to_reverse_dependencies() {
        let mut host = ModuleHost::new(Version::new(1, 0, 0));
        let mut bus = EventBus::new();
        host.register(
            Box::new(Recorder {
                name: "base",
                deps: vec![],
                loaded_with_reload: std::cell::Cell::new(None),
            }),
            None,
        )
        .unwrap();
        host.register(
            Box::new(Recorder {
                name: "dependent",
                deps: vec!["base".to_string()],
                loaded_with_reload: std::cell::Cell::new(None),
            }),
            None,
        )
        .unwrap();
        host.load("dependent", &mut bus).unwrap();

        host.unload("base", &mut bus).unwrap();
        assert!(!host.is_loaded("base"));
        assert!(!host.is_loaded("dependent"));
    }

    #[test]
    fn reload_is_deferred_until_applied() {
        let mut host = ModuleHost::new(Version::new(1, 0, 0));
        let mut bus = EventBus::new();
        host.register(
            Box::new(Recorder {
                name: "m",
                deps: vec![],
                loaded_with_reload: std::cell::Cell::new(None),
            }),
            None,
        )
        .unwrap();
        host.load("m", &mut bus).unwrap();

        host.reload_module("m").unwrap();
        assert_eq!(host.reload_counter(), 1);
        assert!(host.is_loaded("m"), "reload must not act until applied");

        let results = host.apply_pending_reloads(&mut bus);
        assert_eq!(results.len(), 1);
        assert!(results[0].1.is_ok());
        assert!(host.is_loaded("m"));
    }

    #[test]
    fn refuses_incompatible_major_version() {
        let mut host = ModuleHost::new(Version::new(2, 0, 0));
        let mut bus = EventBus::new();
        struct Newer;
        impl Module for Newer {
            fn name(&self) -> &str {
                "newer"
            }
            fn header(&self) -> ModuleHeader {
                ModuleHeader {
                    version: Version::new(3, 0, 0),
                    description: String::new(),
                }
            }
            fn load(&mut self, _ctx: &mut LoadCtx<'_>) -> Result<(), Error> {
                Ok(())
            }
            fn unload(&mut self, _ctx: &mut UnloadCtx<'_>) -> SaveData {
                SaveData::new()
            }
        }
        host.register(Box::new(Newer), None).unwrap();
        let err = host.load("newer", &mut bus).unwrap_err();
        assert!(matches!(err, Error::IncompatibleVersion { .. }));
    }
}
