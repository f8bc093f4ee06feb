/// Sender identity as carried on the wire.
///
/// A prefix containing `.` identifies a Server; otherwise a Client. This is
/// a syntactic judgment only — resolving the text to an actual
/// [`relayd_types::ClientId`]/[`relayd_types::ServerId`] is the state
/// graph's job, not the codec's.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Prefix(pub String);

impl Prefix {
    pub fn is_server(&self) -> bool {
        self.0.contains('.')
    }

    pub fn is_client(&self) -> bool {
        !self.is_server()
    }
}

/// A parsed line: `[:prefix ]COMMAND arg1 … [:trailing]`. Holds no
/// CRLF — that is a framing concern, stripped by [`crate::Framer`] before
/// this is built, and re-added by [`crate::encode`] after.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    pub prefix: Option<Prefix>,
    pub command: String,
    pub args: Vec<String>,
}

impl Message {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Message {
            prefix: None,
            command: command.into(),
            args,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(Prefix(prefix.into()));
        self
    }

    pub fn arg(&self, n: usize) -> Option<&str> {
        self.args.get(n).map(|s| s.as_str())
    }
}
