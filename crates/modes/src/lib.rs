//! Channel/user mode classification and application, ban matching, and the
//! conditional access-check events that sit on top of them.

mod access;
mod apply;
mod ban;
mod class;
mod error;
mod glob;
mod user;

pub use access::{
    check, register_core_access_hooks, JoinCheck, NickChannelCheck, NickClientCheck, SeeCheck,
    SendCheck, SendClientCheck, CAN_JOIN_CHANNEL, CAN_NICK_CHANNEL, CAN_NICK_CLIENT,
    CAN_SEE_CHANNEL, CAN_SEND_CHANNEL, CAN_SEND_CLIENT,
};
pub use apply::{apply_channel_modes, ChanModeOutcome, ModeCheck};
pub use ban::{ban_matches, count_matching_bans, recount_channel_bans};
pub use class::{ChanLetter, ModeClass};
pub use error::Error;
pub use glob::glob_match;
pub use user::{apply_user_modes, UserLetter, UserModeOutcome};
