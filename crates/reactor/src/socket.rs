use std::io::{self, Read, Write};
use std::net::SocketAddr;

/// Per-socket readiness state. `want_read` /
/// `want_write` are the interest the reactor registers with `popol`;
/// the `_pending` fields are transient, reset at the start of every tick,
/// and record what actually happened this tick so handlers run once per
/// condition rather than re-testing the raw poll event.
#[derive(Copy, Clone, Default, Debug)]
pub struct SocketFlags {
    pub want_read: bool,
    pub want_write: bool,
    pub read_pending: bool,
    pub write_pending: bool,
    pub error_pending: bool,
    pub eof: bool,
}

impl SocketFlags {
    pub fn reset_transient(&mut self) {
        self.read_pending = false;
        self.write_pending = false;
        self.error_pending = false;
        self.eof = false;
    }
}

/// A registered connection: the underlying stream, its readiness flags,
/// a pending outbound buffer, and the **marked dead, reaped later** flag.
pub struct Socket<R> {
    pub stream: R,
    pub addr: SocketAddr,
    pub flags: SocketFlags,
    outbox: Vec<u8>,
    dead: bool,
}

impl<R: Read + Write> Socket<R> {
    pub fn new(stream: R, addr: SocketAddr) -> Self {
        Socket {
            stream,
            addr,
            flags: SocketFlags {
                want_read: true,
                ..SocketFlags::default()
            },
            outbox: Vec::new(),
            dead: false,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Marks the socket dead. The reactor's reaper removes
    /// it from the registry on the following tick.
    pub fn mark_dead(&mut self) {
        self.dead = true;
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.outbox.extend_from_slice(bytes);
        self.flags.want_write = true;
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.outbox.is_empty()
    }

    /// Writes as much of the pending outbox as the socket will currently
    /// accept. Returns `Ok(true)` once the outbox has fully drained.
    pub fn flush(&mut self) -> io::Result<bool> {
        while !self.outbox.is_empty() {
            match self.stream.write(&self.outbox) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                Ok(n) => {
                    self.outbox.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
                Err(e) => return Err(e),
            }
        }
        self.flags.want_write = false;
        Ok(true)
    }

    pub fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}
