use thiserror::Error as ThisError;

#[derive(ThisError, Debug, Eq, PartialEq)]
pub enum Error {
    #[error("no such channel")]
    NoSuchChannel,
    #[error("no such nick {0:?}")]
    NoSuchNick(String),
    #[error("not a member of this channel")]
    NotMember,
    #[error("invalid argument {0:?} for this mode")]
    InvalidArgument(String),
}

impl From<relayd_state::Error> for Error {
    fn from(e: relayd_state::Error) -> Self {
        match e {
            relayd_state::Error::NoSuchChannel(_) | relayd_state::Error::NoSuchChannelName(_) => {
                Error::NoSuchChannel
            }
            relayd_state::Error::NotMember => Error::NotMember,
            _ => Error::NoSuchChannel,
        }
    }
}
