//! The hierarchical `name [value] { … };` configuration grammar.
//!
//! `$INCLUDE "path";` is resolved by the lexer, never the parser — by the
//! time a [`ConfigTree`] exists, include boundaries are gone. Reload
//! re-parses the top-level path and swaps the whole tree; there is no
//! incremental diff.

mod error;
mod fs;
mod lexer;
mod parser;
mod tree;

pub use error::Error;
pub use fs::{FileLoader, RealFs};
pub use tree::{find_first, find_list, find_next, find_recursive, find_value, ConfigTree, Entry};

use std::path::Path;

/// Parses a config tree starting from `path`, inlining any `$INCLUDE`s
/// along the way.
pub fn parse_file(path: impl AsRef<Path>, fs: &dyn FileLoader) -> Result<ConfigTree, Error> {
    let mut lexer = lexer::Lexer::new(path.as_ref(), fs)?;
    let entries = parser::parse(&mut lexer)?;
    Ok(ConfigTree::new(entries))
}

/// Parses a config tree from an in-memory string, as if it were the sole
/// top-level file (used by tests and by `-C` check-config dry runs piped
/// from stdin).
pub fn parse_str(source: &str) -> Result<ConfigTree, Error> {
    let mut lexer = lexer::Lexer::from_str("<string>", source);
    let entries = parser::parse(&mut lexer)?;
    Ok(ConfigTree::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn parses_data_and_list_entries() {
        let tree = parse_str(
            r#"
            maxsockets 1024;
            admin {
                name "Alice Admin";
                email alice@example.com;
            };
            "#,
        )
        .unwrap();
        let max = tree.find_first("maxsockets").unwrap();
        assert_eq!(max.value(), Some("1024"));
        let admin = tree.find_list("admin").unwrap();
        assert_eq!(admin.children().len(), 2);
        assert_eq!(
            find_first(admin.children(), "name").unwrap().value(),
            Some("Alice Admin")
        );
    }

    #[test]
    fn quoted_strings_support_c_style_escapes() {
        let tree = parse_str(r#"reason "line one\nline two\ttabbed \"quoted\"";"#).unwrap();
        let entry = tree.find_first("reason").unwrap();
        assert_eq!(entry.value(), Some("line one\nline two\ttabbed \"quoted\""));
    }

    #[test]
    fn comments_of_all_three_kinds_are_skipped() {
        let tree = parse_str(
            "# hash comment\nkeep 1; // trailing comment\n/* block\ncomment */ also 2;",
        )
        .unwrap();
        assert_eq!(tree.find_first("keep").unwrap().value(), Some("1"));
        assert_eq!(tree.find_first("also").unwrap().value(), Some("2"));
    }

    #[test]
    fn anonymous_entries_use_an_empty_name() {
        let tree = parse_str(r#"{ nested 1; };"#).unwrap();
        assert_eq!(tree.roots()[0].name(), "");
        assert_eq!(tree.roots()[0].children().len(), 1);
    }

    #[test]
    fn data_entry_with_no_value_yields_empty_string() {
        let tree = parse_str("flag;").unwrap();
        assert_eq!(tree.find_first("flag").unwrap().value(), Some(""));
    }

    #[test]
    fn malformed_input_is_a_syntax_error() {
        assert!(parse_str("name { unterminated").is_err());
        assert!(parse_str("\"unterminated string").is_err());
    }

    #[test]
    fn include_splices_transparently_at_the_reference_point() {
        let mut files = HashMap::new();
        files.insert(
            "/etc/relayd.conf".to_string(),
            r#"top 1; $INCLUDE "/etc/included.conf"; bottom 3;"#.to_string(),
        );
        files.insert("/etc/included.conf".to_string(), "middle 2;".to_string());
        let fs = fs::MapFs(files);
        let tree = parse_file("/etc/relayd.conf", &fs).unwrap();
        let names: Vec<&str> = tree.roots().iter().map(Entry::name).collect();
        assert_eq!(names, vec!["top", "middle", "bottom"]);
    }

    #[test]
    fn relative_include_paths_resolve_against_the_including_file() {
        let mut files = HashMap::new();
        files.insert(
            "/etc/conf.d/relayd.conf".to_string(),
            r#"$INCLUDE "modules.conf";"#.to_string(),
        );
        files.insert(
            "/etc/conf.d/modules.conf".to_string(),
            "module \"a.so\";".to_string(),
        );
        let fs = fs::MapFs(files);
        let tree = parse_file("/etc/conf.d/relayd.conf", &fs).unwrap();
        assert_eq!(tree.find_first("module").unwrap().value(), Some("a.so"));
    }

    #[test]
    fn print_parse_round_trip_is_idempotent_modulo_whitespace() {
        let source = r#"
            maxsockets 1024;
            operator "Oper One" {
                pass "s3cr3t";
                class opers;
            };
        "#;
        let first = parse_str(source).unwrap();
        let printed_once = first.print();
        let second = parse_str(&printed_once).unwrap();
        let printed_twice = second.print();
        assert_eq!(printed_once, printed_twice);
    }
}
