use thiserror::Error as ThisError;

#[derive(ThisError, Debug, Eq, PartialEq)]
pub enum Error {
    #[error("command {0:?} is already registered")]
    AlreadyRegistered(String),
    #[error("command {0:?} is not registered")]
    UnknownCommand(String),
    #[error("alias {0:?} would shadow an existing command")]
    AliasShadowsCommand(String),
}
