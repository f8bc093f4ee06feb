use std::fmt;

/// A network-authoritative timestamp, in seconds, as carried on channels and
/// clients. `0` means "untrusted" —
/// the peer that sent it never adopted a TS discipline.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Ts(pub i64);

impl Ts {
    pub const UNTRUSTED: Ts = Ts(0);

    pub fn is_untrusted(self) -> bool {
        self.0 == 0
    }

    /// The resolver only ever adopts a *smaller* timestamp. `None` if either side is untrusted — callers
    /// decide what untrusted means for their dialect.
    pub fn min_trusted(self, other: Ts) -> Option<Ts> {
        if self.is_untrusted() || other.is_untrusted() {
            None
        } else {
            Some(Ts(self.0.min(other.0)))
        }
    }
}

impl fmt::Debug for Ts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ts({})", self.0)
    }
}

impl From<i64> for Ts {
    fn from(v: i64) -> Self {
        Ts(v)
    }
}
