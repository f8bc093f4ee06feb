/// Numeric reply codes.
///
/// Not exhaustive — only the codes the core dispatcher and its built-in
/// commands emit. Modules are free to define their own and look them up by
/// raw code via [`Numeric::Other`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Numeric {
    RplWelcome,
    RplAway,
    RplWhoisUser,
    RplWhoisServer,
    RplEndOfWhois,
    RplWhoWasUser,
    RplEndOfWhoWas,
    RplList,
    RplListEnd,
    RplChannelModeIs,
    RplNoTopic,
    RplTopic,
    RplInviting,
    RplWhoReply,
    RplEndOfWho,
    RplNamReply,
    RplEndOfNames,
    RplBanList,
    RplEndOfBanList,
    RplYoureOper,
    RplUserHost,
    ErrNoSuchNick,
    ErrWasNoSuchNick,
    ErrNoSuchChannel,
    ErrCannotSendToChan,
    ErrTooManyChannels,
    ErrNoOrigin,
    ErrNoRecipient,
    ErrNoTextToSend,
    ErrUnknownCommand,
    ErrNoMotd,
    ErrNoNicknameGiven,
    ErrErroneousNickname,
    ErrNicknameInUse,
    ErrUserNotInChannel,
    ErrNotOnChannel,
    ErrUserOnChannel,
    ErrNotRegistered,
    ErrNeedMoreParams,
    ErrAlreadyRegistered,
    ErrPasswdMismatch,
    ErrChannelIsFull,
    ErrUnknownMode,
    ErrInviteOnlyChan,
    ErrBannedFromChan,
    ErrBadChannelKey,
    ErrNoPrivileges,
    ErrChanOpPrivsNeeded,
    ErrNoOperHost,
    ErrUsersDontMatch,
    /// A module-defined code not in the core table.
    Other(u16),
}

impl Numeric {
    pub fn code(self) -> u16 {
        use Numeric::*;
        match self {
            RplWelcome => 1,
            RplAway => 301,
            RplWhoisUser => 311,
            RplWhoisServer => 312,
            RplEndOfWhois => 318,
            RplWhoWasUser => 314,
            RplEndOfWhoWas => 369,
            RplList => 322,
            RplListEnd => 323,
            RplChannelModeIs => 324,
            RplNoTopic => 331,
            RplTopic => 332,
            RplInviting => 341,
            RplWhoReply => 352,
            RplEndOfWho => 315,
            RplNamReply => 353,
            RplEndOfNames => 366,
            RplBanList => 367,
            RplEndOfBanList => 368,
            RplYoureOper => 381,
            RplUserHost => 302,
            ErrNoSuchNick => 401,
            ErrWasNoSuchNick => 406,
            ErrNoSuchChannel => 403,
            ErrCannotSendToChan => 404,
            ErrTooManyChannels => 405,
            ErrNoOrigin => 409,
            ErrNoRecipient => 411,
            ErrNoTextToSend => 412,
            ErrUnknownCommand => 421,
            ErrNoMotd => 422,
            ErrNoNicknameGiven => 431,
            ErrErroneousNickname => 432,
            ErrNicknameInUse => 433,
            ErrUserNotInChannel => 441,
            ErrNotOnChannel => 442,
            ErrUserOnChannel => 443,
            ErrNotRegistered => 451,
            ErrNeedMoreParams => 461,
            ErrAlreadyRegistered => 462,
            ErrPasswdMismatch => 464,
            ErrChannelIsFull => 471,
            ErrUnknownMode => 472,
            ErrInviteOnlyChan => 473,
            ErrBannedFromChan => 474,
            ErrBadChannelKey => 475,
            ErrNoPrivileges => 481,
            ErrChanOpPrivsNeeded => 482,
            ErrNoOperHost => 491,
            ErrUsersDontMatch => 502,
            Other(code) => code,
        }
    }
}

impl std::fmt::Display for Numeric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_rfc_1459_conventions() {
        assert_eq!(Numeric::RplAway.code(), 301);
        assert_eq!(Numeric::RplWhoisUser.code(), 311);
        assert_eq!(Numeric::RplList.code(), 322);
        assert_eq!(Numeric::RplChannelModeIs.code(), 324);
        assert_eq!(Numeric::RplTopic.code(), 332);
        assert_eq!(Numeric::RplInviting.code(), 341);
        assert_eq!(Numeric::RplWhoReply.code(), 352);
        assert_eq!(Numeric::RplBanList.code(), 367);
        assert_eq!(Numeric::RplYoureOper.code(), 381);
        assert_eq!(Numeric::ErrNicknameInUse.code(), 433);
        assert_eq!(Numeric::ErrChannelIsFull.code(), 471);
        assert_eq!(Numeric::ErrInviteOnlyChan.code(), 473);
        assert_eq!(Numeric::ErrBannedFromChan.code(), 474);
        assert_eq!(Numeric::ErrBadChannelKey.code(), 475);
        assert_eq!(Numeric::ErrChanOpPrivsNeeded.code(), 482);
    }

    #[test]
    fn display_is_zero_padded_to_three_digits() {
        assert_eq!(Numeric::RplWelcome.to_string(), "001");
        assert_eq!(Numeric::ErrChanOpPrivsNeeded.to_string(), "482");
        assert_eq!(Numeric::Other(5).to_string(), "005");
    }

    #[test]
    fn other_carries_a_module_defined_code_through_unchanged() {
        assert_eq!(Numeric::Other(710).code(), 710);
    }
}
