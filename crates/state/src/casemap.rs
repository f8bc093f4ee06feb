/// The configured name-folding scheme shared by the nick and channel
/// indexes.
///
/// [`Ascii`] is a plain ASCII fold with no special handling of `{}|^`.
/// [`Rfc1459`] is the textbook IRC casemapping (RFC 1459: `[]\~` fold to
/// `{}|^`). Both are offered because `CASEMAPPING` is a genuine
/// per-network config choice in practice; see DESIGN.md for the default.
pub trait CaseMap: Send + Sync {
    fn fold_char(&self, c: u8) -> u8;

    fn fold(&self, s: &str) -> String {
        s.bytes().map(|b| self.fold_char(b)).map(|b| b as char).collect()
    }

    fn eq(&self, a: &str, b: &str) -> bool {
        a.len() == b.len()
            && a.bytes().zip(b.bytes()).all(|(x, y)| self.fold_char(x) == self.fold_char(y))
    }
}

/// Plain ASCII uppercase fold, with no special-casing of `{}|^`.
pub struct Ascii;

impl CaseMap for Ascii {
    fn fold_char(&self, c: u8) -> u8 {
        c.to_ascii_uppercase()
    }
}

/// RFC 1459 casemapping: ASCII fold plus `{}|^` treated as the
/// lowercase counterparts of `[]\~`.
pub struct Rfc1459;

impl CaseMap for Rfc1459 {
    fn fold_char(&self, c: u8) -> u8 {
        match c {
            b'{' => b'[',
            b'}' => b']',
            b'|' => b'\\',
            b'^' => b'~',
            other => other.to_ascii_uppercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_does_not_fold_brackets() {
        assert!(!Ascii.eq("nick{}", "nick[]"));
    }

    #[test]
    fn rfc1459_folds_brackets_and_case() {
        assert!(Rfc1459.eq("Nick{home}", "NICK[HOME]"));
    }
}
