//! Command registration, arity/permission checking, flood weighting, and
//! the numeric-reply format registry.

mod error;
mod flags;
mod pass;
mod reply;
mod table;

pub use error::Error;
pub use flags::{weight, CommandFlags};
pub use pass::{pass_command, PassOutcome};
pub use reply::{MessageClass, ReplyTable};
pub use table::{CommandFn, CommandSpec, CommandTable, DispatchOutcome};
