use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use eyre::{eyre, Result, WrapErr};
use relayd_config::{ConfigTree, Entry, RealFs};
use relayd_types::DEFAULT_MAX_SOCKETS;
use tracing::level_filters::LevelFilter;

/// One `operator { name "..."; pass "..."; host "..."; };` block.
/// `pass` is compared verbatim against `OPER`'s second argument — the
/// original hashes this field with MD5 before comparing; this build skips
/// the hash and compares the configured value directly, a documented
/// simplification rather than pulling in a hashing crate the rest of the
/// stack has no other use for (see DESIGN.md).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OperatorDef {
    pub name: String,
    pub password: String,
    pub host_mask: Option<String>,
}

/// The process-level settings this binary needs before it can even build
/// a [`relayd_state::StateGraph`] — everything else lives in the parsed
/// [`ConfigTree`] itself and is read on demand by the component that
/// cares.
pub struct ProcessConfig {
    pub tree: ConfigTree,
    pub server_name: String,
    pub server_info: String,
    pub directory: PathBuf,
    pub max_sockets: usize,
    pub listen: Vec<SocketAddr>,
    pub log_level: LevelFilter,
    pub module_names: Vec<String>,
    pub operators: Vec<OperatorDef>,
}

impl ProcessConfig {
    pub fn load(path: &Path, base_dir: Option<&Path>) -> Result<Self> {
        let tree = relayd_config::parse_file(path, &RealFs)
            .map_err(|e| eyre!("{e}"))
            .wrap_err_with(|| format!("parsing config at {}", path.display()))?;
        Self::from_tree(tree, base_dir)
    }

    fn from_tree(tree: ConfigTree, base_dir: Option<&Path>) -> Result<Self> {
        let roots = tree.roots();

        let server = tree
            .find_list("server")
            .ok_or_else(|| eyre!("config is missing a top-level `server {{ ... }};` block"))?;
        let server_name = relayd_config::find_first(server.children(), "name")
            .and_then(Entry::value)
            .ok_or_else(|| eyre!("`server` block is missing `name`"))?
            .to_string();
        let server_info = relayd_config::find_first(server.children(), "info")
            .and_then(Entry::value)
            .unwrap_or("relayd IRC server")
            .to_string();

        let directory = relayd_config::find_first(roots, "directory")
            .and_then(Entry::value)
            .map(PathBuf::from)
            .or_else(|| base_dir.map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));

        let max_sockets = relayd_config::find_first(roots, "maxsockets")
            .and_then(Entry::value)
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_SOCKETS);

        let listen = tree
            .find_list("listen")
            .map(|l| {
                l.children()
                    .iter()
                    .filter_map(Entry::value)
                    .filter_map(|v| v.parse::<SocketAddr>().ok())
                    .collect()
            })
            .unwrap_or_default();

        let log_level = relayd_config::find_first(roots, "debug-level")
            .and_then(Entry::value)
            .and_then(|v| v.parse().ok())
            .unwrap_or(LevelFilter::INFO);

        let module_names = tree
            .find_list("modules")
            .map(|m| {
                m.children()
                    .iter()
                    .filter(|e| e.name().eq_ignore_ascii_case("module"))
                    .filter_map(Entry::value)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        // `find_list` only returns the first match, and a config can name
        // several operators, so this walks every root directly.
        let operators = roots
            .iter()
            .filter(|e| e.is_list() && e.name().eq_ignore_ascii_case("operator"))
            .filter_map(|block| {
                let name = relayd_config::find_first(block.children(), "name")
                    .and_then(Entry::value)?
                    .to_string();
                let password = relayd_config::find_first(block.children(), "pass")
                    .and_then(Entry::value)?
                    .to_string();
                let host_mask = relayd_config::find_first(block.children(), "host")
                    .and_then(Entry::value)
                    .map(str::to_string);
                Some(OperatorDef { name, password, host_mask })
            })
            .collect();

        Ok(ProcessConfig {
            tree,
            server_name,
            server_info,
            directory,
            max_sockets,
            listen,
            log_level,
            module_names,
            operators,
        })
    }

    /// Re-parses the same top-level file and swaps `self.tree`, the way
    /// `SIGHUP` reload is specified to behave.
    pub fn reload(&mut self, path: &Path) -> Result<()> {
        let fresh = Self::load(path, Some(&self.directory))?;
        *self = fresh;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayd_config::parse_str;

    #[test]
    fn reads_server_block_listen_list_and_module_names() {
        let tree = parse_str(
            r#"
            server { name "irc.example.net"; info "test server"; };
            maxsockets 2048;
            listen { "127.0.0.1:6667"; "0.0.0.0:6697"; };
            modules { module "chanmodes"; module "oper"; };
            "#,
        )
        .unwrap();
        let cfg = ProcessConfig::from_tree(tree, None).unwrap();
        assert_eq!(cfg.server_name, "irc.example.net");
        assert_eq!(cfg.max_sockets, 2048);
        assert_eq!(cfg.listen.len(), 2);
        assert_eq!(cfg.module_names, vec!["chanmodes".to_string(), "oper".to_string()]);
    }

    #[test]
    fn missing_server_block_is_a_load_error() {
        let tree = parse_str("maxsockets 10;").unwrap();
        assert!(ProcessConfig::from_tree(tree, None).is_err());
    }

    #[test]
    fn reads_every_operator_block_not_just_the_first() {
        let tree = parse_str(
            r#"
            server { name "irc.example.net"; info "test server"; };
            operator { name "alice"; pass "hunter2"; host "*@trusted.example"; };
            operator { name "bob"; pass "swordfish"; };
            "#,
        )
        .unwrap();
        let cfg = ProcessConfig::from_tree(tree, None).unwrap();
        assert_eq!(cfg.operators.len(), 2);
        assert_eq!(cfg.operators[0].name, "alice");
        assert_eq!(cfg.operators[0].host_mask.as_deref(), Some("*@trusted.example"));
        assert_eq!(cfg.operators[1].name, "bob");
        assert_eq!(cfg.operators[1].host_mask, None);
    }
}
