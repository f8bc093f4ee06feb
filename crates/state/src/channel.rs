use relayd_modules::MdextHost;
use relayd_types::{ClientId, Ts};

/// Scalar (class D) channel mode flags. Class A/B/C modes (bans,
/// key, limit) have their own auxiliary storage on [`Channel`] because
/// they carry data beyond a single bit.
#[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
pub struct ChannelModes(u32);

impl ChannelModes {
    pub const NONE: ChannelModes = ChannelModes(0);
    pub const MODERATED: ChannelModes = ChannelModes(1 << 0);
    pub const SECRET: ChannelModes = ChannelModes(1 << 1);
    pub const NO_EXTERNAL: ChannelModes = ChannelModes(1 << 2);
    pub const TOPIC_LOCK: ChannelModes = ChannelModes(1 << 3);
    pub const INVITE_ONLY: ChannelModes = ChannelModes(1 << 4);
    pub const PRIVATE: ChannelModes = ChannelModes(1 << 5);

    pub fn contains(self, other: ChannelModes) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, other: ChannelModes) {
        self.0 |= other.0;
    }

    pub fn unset(&mut self, other: ChannelModes) {
        self.0 &= !other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for ChannelModes {
    type Output = ChannelModes;
    fn bitor(self, rhs: ChannelModes) -> ChannelModes {
        ChannelModes(self.0 | rhs.0)
    }
}

/// What a class-A list mode entry represents; bans is the primary case,
/// except/invex reuse the same shape.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum BanKind {
    Ban,
    Except,
    InviteExempt,
}

/// One `nick!user@host` ban-list entry.
#[derive(Clone, Debug)]
pub struct Ban {
    pub nick: String,
    pub user: String,
    pub host: String,
    pub who: String,
    pub when: Ts,
    pub kind: BanKind,
}

impl Ban {
    pub fn mask(&self) -> String {
        format!("{}!{}@{}", self.nick, self.user, self.host)
    }
}

/// A live channel.
pub struct Channel {
    pub name: String,
    pub created: Ts,
    pub modes: ChannelModes,
    pub key: Option<String>,
    pub limit: Option<u32>,
    pub bans: Vec<Ban>,
    /// `(text, setter mask, when)`.
    pub topic: Option<(String, String, Ts)>,
    /// Ordered member list. The per-user
    /// prefix bits and ban-match cache live on the [`crate::Membership`]
    /// edge, not here.
    pub members: Vec<ClientId>,
    /// Single-use invites, by client.
    pub invites: Vec<ClientId>,

    ext: Vec<u8>,
}

impl Channel {
    pub fn new(name: impl Into<String>, created: Ts) -> Self {
        Channel {
            name: name.into(),
            created,
            modes: ChannelModes::NONE,
            key: None,
            limit: None,
            bans: Vec::new(),
            topic: None,
            members: Vec::new(),
            invites: Vec::new(),
            ext: Vec::new(),
        }
    }

    pub fn is_invited(&self, client: ClientId) -> bool {
        self.invites.contains(&client)
    }

    /// Consumes a pending invite, returning whether one was present.
    pub fn consume_invite(&mut self, client: ClientId) -> bool {
        if let Some(pos) = self.invites.iter().position(|&c| c == client) {
            self.invites.remove(pos);
            true
        } else {
            false
        }
    }
}

impl MdextHost for Channel {
    fn ext_area(&mut self) -> &mut Vec<u8> {
        &mut self.ext
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayd_types::ClientId;

    #[test]
    fn channel_modes_bitset_ops() {
        let mut m = ChannelModes::NONE;
        assert!(m.is_empty());
        m.set(ChannelModes::MODERATED | ChannelModes::SECRET);
        assert!(m.contains(ChannelModes::MODERATED));
        assert!(m.contains(ChannelModes::SECRET));
        assert!(!m.is_empty());
        m.unset(ChannelModes::SECRET);
        assert!(!m.contains(ChannelModes::SECRET));
        assert!(m.contains(ChannelModes::MODERATED));
    }

    #[test]
    fn ban_mask_is_nick_bang_user_at_host() {
        let ban = Ban {
            nick: "*".into(),
            user: "*".into(),
            host: "evil.example".into(),
            who: "Op".into(),
            when: Ts(100),
            kind: BanKind::Ban,
        };
        assert_eq!(ban.mask(), "*!*@evil.example");
    }

    #[test]
    fn invite_is_single_use() {
        let mut chan = Channel::new("#t", Ts(1000));
        let client = ClientId::from_raw(3);
        assert!(!chan.is_invited(client));
        chan.invites.push(client);
        assert!(chan.is_invited(client));
        assert!(chan.consume_invite(client));
        assert!(!chan.is_invited(client));
        assert!(!chan.consume_invite(client));
    }
}
