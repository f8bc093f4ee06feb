use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("event {0:?} is not registered")]
    UnknownEvent(String),
    #[error("event {0:?} is already registered")]
    AlreadyRegistered(String),
    #[error("hook {0:?} is not registered on this event")]
    UnknownHook(super::HookId),
}
