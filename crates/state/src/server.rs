use relayd_modules::MdextHost;
use relayd_types::ConnId;

/// Peer-protocol capability flags negotiated at handshake. Carried
/// on the [`Server`] rather than the Connection because they describe the
/// *remote daemon*, which outlives any one TCP session across reconnects.
#[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
pub struct PeerCaps(u16);

impl PeerCaps {
    pub const NONE: PeerCaps = PeerCaps(0);
    /// Peer trusts and sends channel/client timestamps.
    pub const TS: PeerCaps = PeerCaps(1 << 0);
    /// `MODE` carries a timestamp at a fixed position.
    pub const TSMODE: PeerCaps = PeerCaps(1 << 1);
    /// Server-initiated joins use `SJOIN`.
    pub const SJOIN: PeerCaps = PeerCaps(1 << 2);
    /// A `SQUIT` implies quits of all downstream clients.
    pub const NOQUIT: PeerCaps = PeerCaps(1 << 3);
    pub const ATTR: PeerCaps = PeerCaps(1 << 4);
    pub const SHORTAKILL: PeerCaps = PeerCaps(1 << 5);

    /// The capability set a self-link (our own process, or a fully modern
    /// peer) exposes.
    pub const ALL: PeerCaps = PeerCaps(0x3f);

    pub fn contains(self, other: PeerCaps) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, other: PeerCaps) {
        self.0 |= other.0;
    }

    pub fn unset(&mut self, other: PeerCaps) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for PeerCaps {
    type Output = PeerCaps;
    fn bitor(self, rhs: PeerCaps) -> PeerCaps {
        PeerCaps(self.0 | rhs.0)
    }
}

/// A server in the spanning tree, local or remote. The local process's own entry is the distinguished
/// "self-server" with `hops == 0` and no `conn`.
pub struct Server {
    pub name: String,
    pub info: String,
    pub hops: u32,
    pub conn: Option<ConnId>,
    pub caps: PeerCaps,
    /// Immediate and transitive children in the spanning tree, by id.
    pub children: Vec<relayd_types::ServerId>,

    ext: Vec<u8>,
}

impl Server {
    pub fn new_self(name: impl Into<String>, info: impl Into<String>) -> Self {
        Server {
            name: name.into(),
            info: info.into(),
            hops: 0,
            conn: None,
            caps: PeerCaps::ALL,
            children: Vec::new(),
            ext: Vec::new(),
        }
    }

    pub fn new_peer(name: impl Into<String>, info: impl Into<String>, hops: u32) -> Self {
        Server {
            name: name.into(),
            info: info.into(),
            hops,
            conn: None,
            caps: PeerCaps::NONE,
            children: Vec::new(),
            ext: Vec::new(),
        }
    }

    pub fn is_immediate_peer(&self) -> bool {
        self.conn.is_some()
    }
}

impl MdextHost for Server {
    fn ext_area(&mut self) -> &mut Vec<u8> {
        &mut self.ext
    }
}
