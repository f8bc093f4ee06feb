//! CRLF-terminated line framing and parsing shared by client and peer
//! connections. Client and peer framing share one shape; dialect
//! differences live in `relayd-peer`, not here.

mod codec;
mod error;
mod message;

pub use codec::{encode, parse_line, Framer};
pub use error::Error;
pub use message::{Message, Prefix};
