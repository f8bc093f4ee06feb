/// Per-command registration flags.
#[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
pub struct CommandFlags(u8);

impl CommandFlags {
    pub const NONE: CommandFlags = CommandFlags(0);
    /// Only a not-yet-registered connection may issue this command (e.g.
    /// `PASS`, `USER` before the handshake completes).
    pub const UNREGISTERED: CommandFlags = CommandFlags(1 << 0);
    /// Only a fully registered client may issue this command.
    pub const REGISTERED: CommandFlags = CommandFlags(1 << 1);
    /// Only an operator-flagged client may issue this command.
    pub const OPERATOR: CommandFlags = CommandFlags(1 << 2);
    /// Tokens past `max_args` are rejoined with single spaces into the
    /// final parameter instead of being dropped.
    pub const FOLD_EXCESS_ARGS_INTO_LAST: CommandFlags = CommandFlags(1 << 3);

    pub fn contains(self, other: CommandFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, other: CommandFlags) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for CommandFlags {
    type Output = CommandFlags;
    fn bitor(self, rhs: CommandFlags) -> CommandFlags {
        CommandFlags(self.0 | rhs.0)
    }
}

/// Flood-penalty weights a handler's return value is drawn from. Not
/// exhaustive or enforced — a handler may return any `i32` — but these
/// match the buckets command modules actually use (`away.c`'s
/// `COMMAND_WEIGHT_HIGH` etc).
pub mod weight {
    pub const NONE: i32 = 0;
    pub const LOW: i32 = 1;
    pub const NORMAL: i32 = 2;
    pub const HIGH: i32 = 4;
    pub const EXTREME: i32 = 8;
}
