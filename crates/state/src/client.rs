use std::net::IpAddr;

use relayd_modules::MdextHost;
use relayd_types::{ChannelId, ConnId, ServerId, Ts};

/// Per-client mode bit-set.
#[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
pub struct UserModes(u32);

impl UserModes {
    pub const NONE: UserModes = UserModes(0);
    pub const INVISIBLE: UserModes = UserModes(1 << 0);
    pub const OPER: UserModes = UserModes(1 << 1);
    pub const WALLOPS: UserModes = UserModes(1 << 2);
    pub const RESTRICTED: UserModes = UserModes(1 << 3);
    pub const SERVICE: UserModes = UserModes(1 << 4);

    pub fn contains(self, other: UserModes) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, other: UserModes) {
        self.0 |= other.0;
    }

    pub fn unset(&mut self, other: UserModes) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for UserModes {
    type Output = UserModes;
    fn bitor(self, rhs: UserModes) -> UserModes {
        UserModes(self.0 | rhs.0)
    }
}

/// A live client: local (has a `conn`) or reachable only via the peer link
/// to its owning server.
pub struct Client {
    pub nick: String,
    pub user: String,
    pub host: String,
    /// Pre-mask hostname, kept around for the ban-check's third pass
    /// (glob against original host).
    pub orighost: String,
    pub ip: IpAddr,
    pub info: String,

    /// Local accept time.
    pub signon: Ts,
    /// Network-authoritative timestamp; `0` means untrusted.
    pub ts: Ts,
    /// Idle-timer base, bumped on each message the client sends.
    pub last: Ts,

    pub modes: UserModes,
    pub away: Option<String>,

    pub server: ServerId,
    pub conn: Option<ConnId>,

    /// Channels this client is a member of; deliberately a small `Vec` —
    /// membership lookup is O(members-of-client), which is fine because a
    /// human's channel list is small.
    pub channels: Vec<ChannelId>,

    ext: Vec<u8>,
}

impl Client {
    pub fn new(
        nick: impl Into<String>,
        user: impl Into<String>,
        host: impl Into<String>,
        ip: IpAddr,
        info: impl Into<String>,
        server: ServerId,
        signon: Ts,
        ts: Ts,
    ) -> Self {
        let host = host.into();
        Client {
            nick: nick.into(),
            user: user.into(),
            orighost: host.clone(),
            host,
            ip,
            info: info.into(),
            signon,
            ts,
            last: signon,
            modes: UserModes::NONE,
            away: None,
            server,
            conn: None,
            channels: Vec::new(),
            ext: Vec::new(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.conn.is_some()
    }

    pub fn full_mask(&self) -> String {
        format!("{}!{}@{}", self.nick, self.user, self.host)
    }
}

impl MdextHost for Client {
    fn ext_area(&mut self) -> &mut Vec<u8> {
        &mut self.ext
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_modes_set_unset_and_contains() {
        let mut m = UserModes::NONE;
        assert!(!m.contains(UserModes::OPER));
        m.set(UserModes::OPER | UserModes::INVISIBLE);
        assert!(m.contains(UserModes::OPER));
        assert!(m.contains(UserModes::INVISIBLE));
        assert!(m.contains(UserModes::OPER | UserModes::INVISIBLE));
        m.unset(UserModes::OPER);
        assert!(!m.contains(UserModes::OPER));
        assert!(m.contains(UserModes::INVISIBLE));
    }

    #[test]
    fn full_mask_is_nick_bang_user_at_host() {
        let c = Client::new(
            "Alice",
            "alice",
            "host.example",
            "127.0.0.1".parse().unwrap(),
            "info",
            ServerId::from_raw(0),
            Ts(1000),
            Ts(1000),
        );
        assert_eq!(c.full_mask(), "Alice!alice@host.example");
        assert!(!c.is_local());
    }
}
