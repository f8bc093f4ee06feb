//! The connection and client state machines.
//!
//! `ConnState` tracks a socket from accept to reap; `ClientState` tracks a
//! client's registration independent of (but driven by transitions of) its
//! connection. Kept as plain enums with guarded transition functions
//! rather than a typestate-per-struct encoding, because both the dispatcher
//! and the peer burst logic need to store the *current* state in a
//! `HashMap` alongside other per-connection bookkeeping — a typestate
//! would force that map to hold an enum of structs anyway.

use crate::error::Error;

/// A connection's lifecycle: `ACCEPTED → TLS_HANDSHAKING? → REGISTERING →
/// REGISTERED → [CONNECTED peer/client] → CLOSING → DEAD`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ConnState {
    Accepted,
    TlsHandshaking,
    Registering,
    Registered,
    ConnectedClient,
    ConnectedPeer,
    Closing,
    Dead,
}

impl ConnState {
    /// Advances from `self` to `next`, rejecting any transition not shown
    /// in the lifecycle above. `Closing`/`Dead` are reachable from any
    /// state (a socket can die mid-handshake), so they are not gated here.
    pub fn advance(self, next: ConnState) -> Result<ConnState, Error> {
        use ConnState::*;
        let allowed = matches!(
            (self, next),
            (_, Closing)
                | (_, Dead)
                | (Accepted, TlsHandshaking)
                | (Accepted, Registering)
                | (TlsHandshaking, Registering)
                | (Registering, Registered)
                | (Registered, ConnectedClient)
                | (Registered, ConnectedPeer)
        );
        if allowed {
            Ok(next)
        } else {
            Err(Error::IllegalTransition(format!("{self:?} -> {next:?}")))
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ConnState::Dead)
    }
}

/// A client's registration lifecycle: `UNREGISTERED → REGISTERED →
/// KILLED/QUIT`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ClientState {
    Unregistered,
    Registered,
    Killed,
    Quit,
}

impl ClientState {
    pub fn advance(self, next: ClientState) -> Result<ClientState, Error> {
        use ClientState::*;
        let allowed = matches!(
            (self, next),
            (Unregistered, Registered) | (_, Killed) | (_, Quit)
        );
        if allowed {
            Ok(next)
        } else {
            Err(Error::IllegalTransition(format!("{self:?} -> {next:?}")))
        }
    }

    pub fn is_live(self) -> bool {
        matches!(self, ClientState::Unregistered | ClientState::Registered)
    }
}
