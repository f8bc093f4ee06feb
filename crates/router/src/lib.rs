//! Message delivery primitives: given the state graph, compute the
//! set of recipients for a channel, a common-channel neighborhood, a peer
//! selection, or an operator-notice flag. Formatting the actual
//! [`relayd_proto::Message`] and serializing it per peer dialect is the
//! caller's job (the dispatcher builds the message; `relayd-peer` encodes
//! it per adapter) — this crate only answers "who".

mod recipients;
mod sflag;

pub use recipients::{
    to_channel_local, to_channel_prefixes, to_common_channels, to_flag, to_match, to_one,
    to_serv, to_serv_butone, to_serv_pflag,
};
pub use sflag::SflagRegistry;
