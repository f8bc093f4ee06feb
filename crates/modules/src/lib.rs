//! The hot-swappable module system: a registry of [`Module`]s with
//! dependency resolution, ABI version policy, deferred reload, a global
//! symbol table, and the [`mdext`] per-object extension mechanism.
//!
//! Modules are `Box<dyn Module>` registered at startup rather than
//! `dlopen`'d shared objects — see DESIGN.md for the reasoning; the
//! version/dependency/reload lifecycle semantics are unaffected.

mod error;
mod host;
mod mdext;
mod module;
mod savedata;
mod version;

pub use error::Error;
pub use host::ModuleHost;
pub use mdext::{ExtItemHandle, MdextHeader, MdextHost};
pub use module::{LoadCtx, Module, ModuleHeader, UnloadCtx};
pub use savedata::{SaveData, SaveRecord};
pub use version::{check_version, Version, VersionPolicy};
