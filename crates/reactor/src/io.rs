use std::time::Duration;

/// Direction a connection was established in.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Link {
    Inbound,
    Outbound,
}

impl Link {
    pub fn is_inbound(self) -> bool {
        matches!(self, Link::Inbound)
    }

    pub fn is_outbound(self) -> bool {
        matches!(self, Link::Outbound)
    }
}

/// The instructions a [`crate::Service`] hands back to the reactor each
/// tick, drained via [`crate::Service::next`].
#[derive(Debug)]
pub enum Io<Id> {
    /// Bytes ready to be queued for `id`.
    Write(Id, Vec<u8>),
    /// Dial out to `id`.
    Connect(Id),
    /// Tear down the connection to `id` with a human-readable reason.
    Disconnect(Id, String),
    /// Request a one-shot wakeup after the given delay.
    SetTimer(Duration),
    /// An event to forward to whatever is observing the reactor (metrics,
    /// the module host's `after-poll` hook).
    Event(String),
}
