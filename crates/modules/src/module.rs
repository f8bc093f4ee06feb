use relayd_config::Entry;
use relayd_hooks::EventBus;

use crate::error::Error;
use crate::savedata::SaveData;
use crate::version::Version;

/// `{major,minor,patch,version}` header every module exposes.
#[derive(Clone, Debug)]
pub struct ModuleHeader {
    pub version: Version,
    pub description: String,
}

/// Context passed to [`Module::load`]. `savedata` carries whatever the
/// module's previous `unload` call (if this is a reload) wrote; `conf` is
/// this module's `data { … }` config block, if the `modules` section of the
/// config tree gave it one.
pub struct LoadCtx<'a> {
    pub reloading: bool,
    pub savedata: SaveData,
    pub conf: Option<&'a Entry>,
    pub bus: &'a mut EventBus,
}

/// Context passed to [`Module::unload`].
pub struct UnloadCtx<'a> {
    pub reloading: bool,
    pub bus: &'a mut EventBus,
}

/// An in-process pluggable unit.
pub trait Module: Send {
    fn name(&self) -> &str;
    fn header(&self) -> ModuleHeader;

    /// Names of modules that must be loaded (with their symbols exported)
    /// before this one, one name per entry.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Called after dependencies are loaded and the version check passes.
    /// `ctx.savedata` holds this module's own records from its last
    /// `unload`, if `ctx.reloading`.
    fn load(&mut self, ctx: &mut LoadCtx<'_>) -> Result<(), Error>;

    /// Called before the module handle is dropped. Returns whatever state
    /// the next `load` should see; empty if there is nothing to carry.
    fn unload(&mut self, ctx: &mut UnloadCtx<'_>) -> SaveData;
}
