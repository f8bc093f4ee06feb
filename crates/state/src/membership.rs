use relayd_types::{ChannelId, ClientId};

/// Per-membership prefix flags, one bit per `PREFIX` mode (op,
/// voice, …). Rank order (highest first) is the order these constants are
/// declared in, matching how `NAMES`/`WHO` pick the single rank character
/// to display.
#[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
pub struct PrefixFlags(u16);

impl PrefixFlags {
    pub const NONE: PrefixFlags = PrefixFlags(0);
    pub const OP: PrefixFlags = PrefixFlags(1 << 0);
    pub const HALFOP: PrefixFlags = PrefixFlags(1 << 1);
    pub const VOICE: PrefixFlags = PrefixFlags(1 << 2);

    pub fn contains(self, other: PrefixFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether this set shares any bit with `other` — the test `to_channel_prefixes`
    /// wants when `other` is a multi-bit "op or halfop" style mask,
    /// as opposed to [`Self::contains`]'s "has every named bit" test.
    pub fn intersects(self, other: PrefixFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn set(&mut self, other: PrefixFlags) {
        self.0 |= other.0;
    }

    pub fn unset(&mut self, other: PrefixFlags) {
        self.0 &= !other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The single rank character shown in `NAMES`/`WHO` output: the
    /// highest-ranked prefix this membership holds, or none.
    pub fn rank_char(self) -> Option<char> {
        if self.contains(PrefixFlags::OP) {
            Some('@')
        } else if self.contains(PrefixFlags::HALFOP) {
            Some('%')
        } else if self.contains(PrefixFlags::VOICE) {
            Some('+')
        } else {
            None
        }
    }
}

impl std::ops::BitOr for PrefixFlags {
    type Output = PrefixFlags;
    fn bitor(self, rhs: PrefixFlags) -> PrefixFlags {
        PrefixFlags(self.0 | rhs.0)
    }
}

/// The (Client, Channel) edge record: one membership per join, carrying
/// the member's prefix flags and cached ban-match count.
pub struct Membership {
    pub client: ClientId,
    pub channel: ChannelId,
    pub flags: PrefixFlags,
    /// Cached count of the channel's bans that match this client, so a
    /// message send need not rescan the ban list.
    pub bans: usize,
}

impl Membership {
    pub fn new(client: ClientId, channel: ChannelId) -> Self {
        Membership {
            client,
            channel,
            flags: PrefixFlags::NONE,
            bans: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_char_prefers_op_over_halfop_over_voice() {
        assert_eq!(PrefixFlags::NONE.rank_char(), None);
        assert_eq!(PrefixFlags::VOICE.rank_char(), Some('+'));
        assert_eq!(PrefixFlags::HALFOP.rank_char(), Some('%'));
        assert_eq!(PrefixFlags::OP.rank_char(), Some('@'));
        let both = PrefixFlags::OP | PrefixFlags::VOICE;
        assert_eq!(both.rank_char(), Some('@'));
    }

    #[test]
    fn intersects_differs_from_contains_on_partial_overlap() {
        let mask = PrefixFlags::OP | PrefixFlags::HALFOP;
        assert!(PrefixFlags::OP.intersects(mask));
        assert!(!PrefixFlags::OP.contains(mask));
        assert!(mask.contains(PrefixFlags::OP));
    }

    #[test]
    fn new_membership_starts_with_no_flags_and_zero_bans() {
        let m = Membership::new(ClientId::from_raw(1), ChannelId::from_raw(2));
        assert!(m.flags.is_empty());
        assert_eq!(m.bans, 0);
    }
}
