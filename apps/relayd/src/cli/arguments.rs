use std::path::PathBuf;

use clap::Parser;

/// Command-line flags this daemon accepts.
#[derive(Parser, Debug)]
#[clap(author, version, about = "A federated line-protocol chat daemon", long_about = None)]
pub struct Run {
    /// Config file path (`-c`).
    #[clap(short = 'c', long = "config", value_name = "FILE")]
    pub config: PathBuf,

    /// Parse and validate the config, then exit without starting (`-C`).
    #[clap(short = 'C', long = "check-config")]
    pub check_config: bool,

    /// Debug level; repeatable (`-d`, `-dd`, …).
    #[clap(short = 'd', long = "debug", action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Extra module search path (`-l`).
    #[clap(short = 'l', long = "libdir", value_name = "PATH")]
    pub libdir: Option<PathBuf>,

    /// Stay in the foreground instead of daemonizing (`-n`).
    #[clap(short = 'n', long = "no-fork")]
    pub no_fork: bool,

    /// Base directory relative paths in the config (module files, PID
    /// file, …) are resolved against (`-p`).
    #[clap(short = 'p', long = "path", value_name = "DIR")]
    pub path: Option<PathBuf>,
}
