//! Applying a [`crate::tsresolve::Outcome::ResetAndApply`] verdict to the
//! live state graph: strip every channel mode and every member's prefix
//! flags, adopt the peer's (smaller) timestamp, and report what changed so
//! the caller can relay the implied `-mode` cascade.

use relayd_state::{ChannelModes, PrefixFlags, StateGraph};
use relayd_types::{ChannelId, ClientId, Ts};

/// What a reset actually removed, so the caller can build `-mode` lines.
/// Unlike the `ResetAndApply` branch of [`crate::tsresolve`], which only
/// decides *that* a reset happens, this is the record of what it did.
#[derive(Default, Debug)]
pub struct ResetRecord {
    /// Channel-scalar modes that were on before the reset (bans/key/limit
    /// are cleared unconditionally; this only names the class-D flags, to
    /// mirror exactly what the condensed `-mode` string would name).
    pub stripped_modes: ChannelModes,
    pub had_key: bool,
    pub had_limit: bool,
    pub bans_cleared: usize,
    /// `(client, flags_removed)` for every member who held a prefix.
    pub stripped_prefixes: Vec<(ClientId, PrefixFlags)>,
}

impl ResetRecord {
    pub fn is_empty(&self) -> bool {
        self.stripped_modes.is_empty()
            && !self.had_key
            && !self.had_limit
            && self.bans_cleared == 0
            && self.stripped_prefixes.is_empty()
    }
}

/// Strips a channel bare and adopts `new_ts` as its creation time. Bans are
/// cleared too — a lower timestamp means the peer's view of the channel
/// predates ours, so nothing local survives it.
pub fn reset_channel(graph: &mut StateGraph, channel_id: ChannelId, new_ts: Ts) -> ResetRecord {
    let mut record = ResetRecord::default();

    let members = match graph.channel(channel_id) {
        Some(chan) => chan.members.clone(),
        None => return record,
    };

    if let Some(chan) = graph.channel_mut(channel_id) {
        record.stripped_modes = chan.modes;
        record.had_key = chan.key.take().is_some();
        record.had_limit = chan.limit.take().is_some();
        record.bans_cleared = chan.bans.len();
        chan.bans.clear();
        chan.modes = ChannelModes::NONE;
        chan.created = new_ts;
    }

    for client in members {
        if let Some(membership) = graph.membership_mut(client, channel_id) {
            if !membership.flags.is_empty() {
                let removed = membership.flags;
                membership.flags = PrefixFlags::NONE;
                record.stripped_prefixes.push((client, removed));
            }
        }
    }

    record
}
