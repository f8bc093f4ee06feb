//! The in-memory state graph: clients, channels, servers, and the
//! membership edges between them, plus the indexes and history ring that
//! sit on top.

mod casemap;
mod channel;
mod client;
mod error;
mod graph;
mod history;
mod membership;
mod server;

pub use casemap::{Ascii, CaseMap, Rfc1459};
pub use channel::{Ban, BanKind, Channel, ChannelModes};
pub use client::{Client, UserModes};
pub use error::Error;
pub use graph::StateGraph;
pub use history::{WhowasEntry, WhowasRing};
pub use membership::{Membership, PrefixFlags};
pub use server::{PeerCaps, Server};
