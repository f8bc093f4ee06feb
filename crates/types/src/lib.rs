//! Identifiers and wire constants shared across the rest of the workspace.
//!
//! Crates higher up the stack (state, modes, dispatch, router, peer) all
//! need to name the same handful of things — a client, a channel, a
//! timestamp, a numeric reply — without depending on each other. Putting
//! them here keeps the dependency graph a DAG rooted at this crate.

mod ids;
mod numeric;
mod ts;

pub use ids::{ChannelId, ClientId, ConnId, MembershipId, ServerId};
pub use numeric::Numeric;
pub use ts::Ts;

/// Maximum bytes in a line, CRLF included.
pub const MAX_LINE_LEN: usize = 512;

/// Maximum whitespace-separated arguments in a line, trailing included.
pub const MAX_ARGS: usize = 15;

/// Default per-channel ban list ceiling.
pub const MAX_BANS_PER_CHANNEL: usize = 100;

/// Default open-socket ceiling.
pub const DEFAULT_MAX_SOCKETS: usize = 1024;

/// Default maximum mode letters accepted in one `MODE` line from a local
/// client.
pub const DEFAULT_MAX_MODES_PER_LINE: usize = 6;

/// Default number of `WHOWAS` entries retained per nick history ring.
pub const DEFAULT_WHOWAS_CAPACITY: usize = 10;
