/// IRC-style mask matching: `*` matches any run of characters (including
/// none), `?` matches exactly one, everything else is literal and
/// case-folded per the channel's casemapping. No character classes or escaping — ban masks
/// in this protocol family never use them.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = text.chars().collect();
    match_at(&pat, &txt)
}

fn match_at(pat: &[char], txt: &[char]) -> bool {
    let mut memo = vec![vec![None; txt.len() + 1]; pat.len() + 1];
    match_rec(pat, txt, &mut memo)
}

fn match_rec(pat: &[char], txt: &[char], memo: &mut Vec<Vec<Option<bool>>>) -> bool {
    if let Some(cached) = memo[pat.len()][txt.len()] {
        return cached;
    }
    let result = match (pat.first(), txt.first()) {
        (None, None) => true,
        (None, Some(_)) => false,
        (Some('*'), _) => match_rec(&pat[1..], txt, memo) || (!txt.is_empty() && match_rec(pat, &txt[1..], memo)),
        (Some('?'), Some(_)) => match_rec(&pat[1..], &txt[1..], memo),
        (Some(_), None) => false,
        (Some(&p), Some(&t)) => p.to_ascii_uppercase() == t.to_ascii_uppercase() && match_rec(&pat[1..], &txt[1..], memo),
    };
    memo[pat.len()][txt.len()] = Some(result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_any_run() {
        assert!(glob_match("*!*@h2", "b!u@h2"));
        assert!(!glob_match("*!*@h2", "b!u@h3"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        assert!(glob_match("n?ck", "nick"));
        assert!(!glob_match("n?ck", "nck"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(glob_match("*!*@HOST", "nick!user@host"));
    }
}
