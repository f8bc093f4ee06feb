//! Server-to-server replication: dialect adapters, burst generation,
//! the timestamp conflict resolver and its state-reset side effect, nick
//! collision resolution, and the peer/client connection state machines.
//!
//! This crate builds the *decisions* (what a dialect's `NICK` means, which
//! side a collision kills, whether an incoming mode message resets the
//! channel) and the state mutation that directly follows from them
//! (`reset_channel`). Wiring those decisions to actual socket I/O and
//! `relayd-router` fan-out is the daemon binary's job.

mod burst;
mod collision;
mod connection;
mod dialect;
mod error;
mod reset;
mod tsresolve;

pub use burst::burst;
pub use collision::{resolve as resolve_collision, ExistingClaimant, Resolution as CollisionResolution};
pub use connection::{ClientState, ConnState};
pub use dialect::{Bahamut14, Dialect, Dreamforge, Ithildin1, NickIntro, Rfc1459Peer};
pub use error::Error;
pub use reset::{reset_channel, ResetRecord};
pub use tsresolve::{adopted_ts, resolve as resolve_ts, Outcome as TsOutcome};
