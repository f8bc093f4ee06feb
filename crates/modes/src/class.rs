use relayd_state::{ChannelModes, PrefixFlags};

/// Channel mode classes: how a
/// letter's argument behaves on set/unset and how its state persists.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ModeClass {
    /// Class A — list mode; both set and unset take an argument (bans).
    List,
    /// Class B — parameter always required, one persisted value (key).
    Param,
    /// Class C — parameter required on set, absent on unset (limit).
    ParamOnSet,
    /// Class D — pure flag, never takes an argument.
    Flag,
    /// PREFIX — attaches to a membership rather than the channel itself.
    Prefix,
}

/// Every channel-mode letter this build understands. Concrete rather than
/// a dynamic setter/query table.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ChanLetter {
    Ban,
    Key,
    Limit,
    Moderated,
    Secret,
    NoExternal,
    TopicLock,
    InviteOnly,
    Private,
    Op,
    Halfop,
    Voice,
}

impl ChanLetter {
    pub const ALL: [ChanLetter; 12] = [
        ChanLetter::Ban,
        ChanLetter::Key,
        ChanLetter::Limit,
        ChanLetter::Moderated,
        ChanLetter::Secret,
        ChanLetter::NoExternal,
        ChanLetter::TopicLock,
        ChanLetter::InviteOnly,
        ChanLetter::Private,
        ChanLetter::Op,
        ChanLetter::Halfop,
        ChanLetter::Voice,
    ];

    pub fn from_char(c: char) -> Option<ChanLetter> {
        Self::ALL.into_iter().find(|m| m.letter() == c)
    }

    pub fn letter(self) -> char {
        match self {
            ChanLetter::Ban => 'b',
            ChanLetter::Key => 'k',
            ChanLetter::Limit => 'l',
            ChanLetter::Moderated => 'm',
            ChanLetter::Secret => 's',
            ChanLetter::NoExternal => 'n',
            ChanLetter::TopicLock => 't',
            ChanLetter::InviteOnly => 'i',
            ChanLetter::Private => 'p',
            ChanLetter::Op => 'o',
            ChanLetter::Halfop => 'h',
            ChanLetter::Voice => 'v',
        }
    }

    pub fn class(self) -> ModeClass {
        match self {
            ChanLetter::Ban => ModeClass::List,
            ChanLetter::Key => ModeClass::Param,
            ChanLetter::Limit => ModeClass::ParamOnSet,
            ChanLetter::Moderated
            | ChanLetter::Secret
            | ChanLetter::NoExternal
            | ChanLetter::TopicLock
            | ChanLetter::InviteOnly
            | ChanLetter::Private => ModeClass::Flag,
            ChanLetter::Op | ChanLetter::Halfop | ChanLetter::Voice => ModeClass::Prefix,
        }
    }

    pub fn flag_bit(self) -> Option<ChannelModes> {
        match self {
            ChanLetter::Moderated => Some(ChannelModes::MODERATED),
            ChanLetter::Secret => Some(ChannelModes::SECRET),
            ChanLetter::NoExternal => Some(ChannelModes::NO_EXTERNAL),
            ChanLetter::TopicLock => Some(ChannelModes::TOPIC_LOCK),
            ChanLetter::InviteOnly => Some(ChannelModes::INVITE_ONLY),
            ChanLetter::Private => Some(ChannelModes::PRIVATE),
            _ => None,
        }
    }

    pub fn prefix_bit(self) -> Option<PrefixFlags> {
        match self {
            ChanLetter::Op => Some(PrefixFlags::OP),
            ChanLetter::Halfop => Some(PrefixFlags::HALFOP),
            ChanLetter::Voice => Some(PrefixFlags::VOICE),
            _ => None,
        }
    }

    /// `NAMES`/`WHO` rank character for a PREFIX mode.
    pub fn rank_char(self) -> Option<char> {
        match self {
            ChanLetter::Op => Some('@'),
            ChanLetter::Halfop => Some('%'),
            ChanLetter::Voice => Some('+'),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_letter_round_trips_through_from_char() {
        for m in ChanLetter::ALL {
            assert_eq!(ChanLetter::from_char(m.letter()), Some(m));
        }
    }
}
