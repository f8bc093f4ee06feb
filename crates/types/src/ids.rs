use std::fmt;

macro_rules! slab_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
        pub struct $name(pub usize);

        impl $name {
            /// Build an id from a raw slab key. Only the owning arena should
            /// call this; everyone else receives ids from arena operations.
            pub fn from_raw(raw: usize) -> Self {
                Self(raw)
            }

            pub fn raw(self) -> usize {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

slab_id!(ClientId, "Arena key for a live Client.");
slab_id!(ChannelId, "Arena key for a live Channel.");
slab_id!(ServerId, "Arena key for a live Server, local or remote.");
slab_id!(
    MembershipId,
    "Arena key for a (Client, Channel) membership edge."
);

/// Identifies a reactor-registered socket: a listener or a live connection.
/// Kept distinct from [`ClientId`]/[`ServerId`] because a Connection can
/// exist before the Client/Server it will become is known, during
/// registration.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ConnId(pub usize);

impl ConnId {
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Debug for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnId({})", self.0)
    }
}
