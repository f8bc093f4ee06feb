use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("module {0:?} is not registered")]
    UnknownModule(String),
    #[error("module {0:?} is already registered")]
    AlreadyRegistered(String),
    #[error("module {0:?} depends on unknown module {1:?}")]
    UnknownDependency(String, String),
    #[error("module {module:?} ABI {theirs} incompatible with host baseline {ours}")]
    IncompatibleVersion {
        module: String,
        ours: crate::version::Version,
        theirs: crate::version::Version,
    },
    #[error("module {0:?} load callback failed")]
    LoadFailed(String),
    #[error("module {0:?} has live reverse dependencies: {1:?}")]
    HasDependents(String, Vec<String>),
    #[error("symbol {0:?} is not registered")]
    UnknownSymbol(String),
    #[error("symbol {0:?} is registered with a different type")]
    SymbolTypeMismatch(String),
}
