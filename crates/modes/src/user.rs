use relayd_state::{Client, UserModes};

/// User mode letters this build understands.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum UserLetter {
    Invisible,
    Oper,
    Wallops,
    Restricted,
    Service,
}

impl UserLetter {
    pub const ALL: [UserLetter; 5] = [
        UserLetter::Invisible,
        UserLetter::Oper,
        UserLetter::Wallops,
        UserLetter::Restricted,
        UserLetter::Service,
    ];

    pub fn from_char(c: char) -> Option<UserLetter> {
        Self::ALL.into_iter().find(|m| m.letter() == c)
    }

    pub fn letter(self) -> char {
        match self {
            UserLetter::Invisible => 'i',
            UserLetter::Oper => 'o',
            UserLetter::Wallops => 'w',
            UserLetter::Restricted => 'r',
            UserLetter::Service => 'k',
        }
    }

    pub fn bit(self) -> UserModes {
        match self {
            UserLetter::Invisible => UserModes::INVISIBLE,
            UserLetter::Oper => UserModes::OPER,
            UserLetter::Wallops => UserModes::WALLOPS,
            UserLetter::Restricted => UserModes::RESTRICTED,
            UserLetter::Service => UserModes::SERVICE,
        }
    }

    /// A client may set this flag on itself with no special privilege, but
    /// only a server (never a plain `MODE` from the client itself) may turn
    /// it on — `+o`/`+r` are granted through `OPER`/registration instead,
    /// and a client clearing them is always allowed.
    pub fn settable_by_self(self, plus: bool) -> bool {
        match self {
            UserLetter::Oper | UserLetter::Restricted | UserLetter::Service => !plus,
            UserLetter::Invisible | UserLetter::Wallops => true,
        }
    }
}

#[derive(Default, Debug)]
pub struct UserModeOutcome {
    pub condensed: String,
    pub unknown: Vec<char>,
    pub no_permission: Vec<char>,
}

/// Folds a `MODE <nick> <modestring>` over `client`. There is no argument
/// stream to consume (every user mode letter is class D), so this is
/// considerably simpler than [`crate::apply_channel_modes`]; `from_server`
/// gates the self-only letters.
pub fn apply_user_modes(client: &mut Client, modestring: &str, from_server: bool) -> UserModeOutcome {
    let mut outcome = UserModeOutcome::default();
    let mut plus = true;
    let mut condensed = String::new();
    let mut last_sign: Option<bool> = None;

    for c in modestring.chars() {
        if c == '+' {
            plus = true;
            continue;
        }
        if c == '-' {
            plus = false;
            continue;
        }

        let Some(letter) = UserLetter::from_char(c) else {
            outcome.unknown.push(c);
            continue;
        };

        if !from_server && !letter.settable_by_self(plus) {
            outcome.no_permission.push(c);
            continue;
        }

        let bit = letter.bit();
        let had = client.modes.contains(bit);
        if plus == had {
            continue;
        }
        if plus {
            client.modes.set(bit);
        } else {
            client.modes.unset(bit);
        }

        if last_sign != Some(plus) {
            condensed.push(if plus { '+' } else { '-' });
            last_sign = Some(plus);
        }
        condensed.push(c);
    }

    outcome.condensed = condensed;
    outcome
}
