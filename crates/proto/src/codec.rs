use relayd_types::MAX_ARGS;

use crate::error::Error;
use crate::message::{Message, Prefix};

/// Splits raw bytes into CRLF/LF-terminated lines, enforcing a capacity
/// bound on the accumulation buffer.
///
/// When the buffer fills with no newline in sight, the accumulated bytes
/// are handed back as a single (likely-truncated) line — the parser above
/// will usually reject it — and everything up to the *next* newline is
/// silently discarded, since those bytes are the tail of the same
/// over-long message rather than a new one.
pub struct Framer {
    buf: Vec<u8>,
    capacity: usize,
    dirty: bool,
}

impl Framer {
    pub fn new(capacity: usize) -> Self {
        Framer {
            buf: Vec::with_capacity(capacity),
            capacity,
            dirty: false,
        }
    }

    /// Appends freshly read bytes and returns every complete line found,
    /// CRLF/LF stripped, in arrival order.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(data);
        let mut lines = Vec::new();
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
                line.pop(); // drop the \n itself
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                if self.dirty {
                    self.dirty = false;
                } else {
                    lines.push(line);
                }
                continue;
            }
            if self.buf.len() >= self.capacity {
                let overflow = std::mem::take(&mut self.buf);
                self.dirty = true;
                lines.push(overflow);
            }
            break;
        }
        lines
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Parses one already-unframed line (no CRLF) into a [`Message`].
pub fn parse_line(line: &str) -> Result<Message, Error> {
    let mut rest = line.trim_start_matches(' ');

    let mut prefix = None;
    if let Some(after_colon) = rest.strip_prefix(':') {
        let (token, remainder) = split_token(after_colon);
        prefix = Some(Prefix(token.to_string()));
        rest = remainder.trim_start_matches(' ');
    }

    let (command, mut remainder) = split_token(rest);
    if command.is_empty() {
        return Err(Error::EmptyCommand);
    }

    let mut args = Vec::new();
    while args.len() < MAX_ARGS - 1 {
        remainder = remainder.trim_start_matches(' ');
        if remainder.is_empty() {
            break;
        }
        if let Some(trailing) = remainder.strip_prefix(':') {
            args.push(trailing.to_string());
            remainder = "";
            break;
        }
        let (token, next) = split_token(remainder);
        args.push(token.to_string());
        remainder = next;
    }

    // Anything left over past MAXARGS-1 tokens folds into one final
    // argument, trailing-colon stripped if present.
    let leftover = remainder.trim_start_matches(' ');
    if !leftover.is_empty() {
        let folded = leftover.strip_prefix(':').unwrap_or(leftover);
        args.push(folded.to_string());
    }

    Ok(Message {
        prefix,
        command: command.to_ascii_uppercase(),
        args,
    })
}

fn split_token(s: &str) -> (&str, &str) {
    match s.find(' ') {
        Some(idx) => (&s[..idx], &s[idx + 1..]),
        None => (s, ""),
    }
}

/// Serializes a [`Message`] back to wire bytes, CRLF included. The last
/// argument gets a `:` prefix if it is empty or contains a space, to avoid
/// a client misparsing it. Overlong output is truncated, never split
/// across multiple lines.
pub fn encode(msg: &Message) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(p) = &msg.prefix {
        out.push(b':');
        out.extend_from_slice(p.0.as_bytes());
        out.push(b' ');
    }
    out.extend_from_slice(msg.command.as_bytes());
    for (i, arg) in msg.args.iter().enumerate() {
        out.push(b' ');
        let is_last = i + 1 == msg.args.len();
        let needs_colon = is_last && (arg.is_empty() || arg.contains(' ') || arg.starts_with(':'));
        if needs_colon {
            out.push(b':');
        }
        out.extend_from_slice(arg.as_bytes());
    }
    out.truncate(relayd_types::MAX_LINE_LEN - 2);
    out.extend_from_slice(b"\r\n");
    out
}
