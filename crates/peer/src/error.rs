use thiserror::Error as ThisError;

#[derive(ThisError, Debug, Eq, PartialEq)]
pub enum Error {
    #[error("malformed NICK introduction: {0}")]
    MalformedNick(String),
    #[error("no such channel {0:?}")]
    NoSuchChannel(String),
    #[error("illegal state transition: {0}")]
    IllegalTransition(String),
    #[error("burst message malformed: {0}")]
    MalformedBurst(String),
}
