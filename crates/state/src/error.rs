use relayd_types::{ChannelId, ClientId, ServerId};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug, Eq, PartialEq)]
pub enum Error {
    #[error("nick {0:?} is already in use")]
    NickInUse(String),
    #[error("client {0:?} not found")]
    NoSuchClient(ClientId),
    #[error("channel {0:?} not found")]
    NoSuchChannel(ChannelId),
    #[error("server {0:?} not found")]
    NoSuchServer(ServerId),
    #[error("no such nick {0:?}")]
    NoSuchNick(String),
    #[error("no such channel {0:?}")]
    NoSuchChannelName(String),
    #[error("client is already a member of this channel")]
    AlreadyMember,
    #[error("client is not a member of this channel")]
    NotMember,
    #[error("channel ban list is full (max {0})")]
    BanListFull(usize),
}
