use std::collections::HashMap;

use relayd_types::Numeric;

/// A connection's message class, selecting which format string `RPL_FMT`
/// returns for a given code.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum MessageClass {
    User,
    Operator,
}

/// Registry of numeric-reply format strings, keyed by code and optionally
/// by [`MessageClass`]. Each loaded module registers the codes it emits;
/// nothing here is built in.
#[derive(Default)]
pub struct ReplyTable {
    by_class: HashMap<(Numeric, MessageClass), String>,
    default: HashMap<Numeric, String>,
}

impl ReplyTable {
    pub fn new() -> Self {
        ReplyTable::default()
    }

    /// Registers the format used for every message class that doesn't have
    /// its own override.
    pub fn register(&mut self, code: Numeric, fmt: impl Into<String>) {
        self.default.insert(code, fmt.into());
    }

    /// Registers a format that overrides the default for one class only.
    pub fn register_for_class(&mut self, code: Numeric, class: MessageClass, fmt: impl Into<String>) {
        self.by_class.insert((code, class), fmt.into());
    }

    /// Unregisters every format for `code` (`DMSG` on module unload).
    pub fn unregister(&mut self, code: Numeric) {
        self.default.remove(&code);
        self.by_class.retain(|(c, _), _| *c != code);
    }

    /// `RPL_FMT(class, code)`: the class-specific format if one was
    /// registered, else the class-agnostic default, else `None`.
    pub fn format(&self, code: Numeric, class: MessageClass) -> Option<&str> {
        self.by_class
            .get(&(code, class))
            .or_else(|| self.default.get(&code))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn an_operator_specific_format_overrides_the_default_only_for_operators() {
        let mut table = ReplyTable::new();
        table.register(Numeric::RplYoureOper, ":You are now an IRC operator");
        table.register_for_class(
            Numeric::RplYoureOper,
            MessageClass::Operator,
            ":You now have operator privileges on {0}",
        );

        assert_eq!(
            table.format(Numeric::RplYoureOper, MessageClass::User),
            Some(":You are now an IRC operator")
        );
        assert_eq!(
            table.format(Numeric::RplYoureOper, MessageClass::Operator),
            Some(":You now have operator privileges on {0}")
        );
    }

    #[test]
    fn unregister_clears_both_default_and_per_class_formats() {
        let mut table = ReplyTable::new();
        table.register(Numeric::RplAway, "%s :%s");
        table.register_for_class(Numeric::RplAway, MessageClass::Operator, "%s :[away] %s");
        table.unregister(Numeric::RplAway);
        assert_eq!(table.format(Numeric::RplAway, MessageClass::User), None);
        assert_eq!(table.format(Numeric::RplAway, MessageClass::Operator), None);
    }
}
