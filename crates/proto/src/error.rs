use thiserror::Error as ThisError;

#[derive(ThisError, Debug, Eq, PartialEq)]
pub enum Error {
    #[error("empty command")]
    EmptyCommand,
    #[error("origin {0:?} does not name a known client or server")]
    UnknownOrigin(String),
}
