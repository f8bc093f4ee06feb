use std::io;

use thiserror::Error;

/// Errors surfaced by the reactor loop itself. Per-connection
/// errors never reach here — they are folded into `Io::Disconnect`
/// outputs from the service instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}
