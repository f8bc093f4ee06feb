//! Nickname collision resolution: what happens
//! when a `NICK` from a peer, or a local rename, targets a nick already
//! claimed by a different live client `K`, with the incoming claimant `U`.
//!
//! This module only computes the *verdict* — which side(s) die and which
//! survives. Applying it (sending `KILL`s, removing the loser from the
//! state graph, relaying the winner) is the caller's job, because that
//! needs the full router/dispatch context this crate doesn't own.

use relayd_types::Ts;

/// Which side(s) a collision kills, and whether a kill needs to be sent
/// toward peers for a rename (as opposed to a fresh introduction, which
/// peers will reject on their own once they see the kill).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Resolution {
    /// `K` is local and still unregistered; it loses unconditionally and
    /// `U` takes the nick outright, no kill traffic at all.
    DropUnregisteredLocal,
    /// Both sides collide: kill `K` and kill `U`, in both directions.
    KillBoth,
    /// `U` loses silently — an older message for us still in flight.
    /// `send_kill_for_rename` is set when this collision arose from a
    /// rename (not a fresh introduction), in which case a `KILL` for `U`
    /// must still go out so the peer that sent it corrects itself.
    DropIncoming { send_kill_for_rename: bool },
    /// `K` loses: kill it locally and toward all peers; `U` is accepted.
    DropExisting,
}

/// The existing claimant `K`'s timestamp and whether it is a local client
/// that never completed registration — only local clients can be
/// unregistered from this process's point of view.
pub struct ExistingClaimant {
    pub ts: Ts,
    pub is_local_unregistered: bool,
}

/// Resolves a collision between the existing claimant `k` and an incoming
/// claimant with timestamp `u_ts`.
pub fn resolve(k: &ExistingClaimant, u_ts: Ts, is_rename: bool) -> Resolution {
    if k.is_local_unregistered {
        return Resolution::DropUnregisteredLocal;
    }
    if k.ts.is_untrusted() || u_ts.is_untrusted() || k.ts == u_ts {
        return Resolution::KillBoth;
    }
    if k.ts < u_ts {
        return Resolution::DropIncoming {
            send_kill_for_rename: is_rename,
        };
    }
    Resolution::DropExisting
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claimant(ts: i64) -> ExistingClaimant {
        ExistingClaimant {
            ts: Ts(ts),
            is_local_unregistered: false,
        }
    }

    #[test]
    fn unregistered_local_always_loses_with_no_kill_traffic() {
        let k = ExistingClaimant {
            ts: Ts(500),
            is_local_unregistered: true,
        };
        assert_eq!(resolve(&k, Ts(999), false), Resolution::DropUnregisteredLocal);
    }

    #[test]
    fn equal_timestamps_collide_both_sides() {
        assert_eq!(resolve(&claimant(1700), Ts(1700), false), Resolution::KillBoth);
    }

    #[test]
    fn untrusted_timestamps_always_collide() {
        assert_eq!(resolve(&claimant(0), Ts(1700), false), Resolution::KillBoth);
        assert_eq!(resolve(&claimant(1700), Ts(0), false), Resolution::KillBoth);
    }

    #[test]
    fn older_local_claim_drops_incoming_silently_unless_a_rename() {
        assert_eq!(
            resolve(&claimant(1000), Ts(2000), false),
            Resolution::DropIncoming {
                send_kill_for_rename: false
            }
        );
        assert_eq!(
            resolve(&claimant(1000), Ts(2000), true),
            Resolution::DropIncoming {
                send_kill_for_rename: true
            }
        );
    }

    #[test]
    fn newer_local_claim_drops_the_existing_claimant() {
        assert_eq!(resolve(&claimant(2000), Ts(1000), false), Resolution::DropExisting);
    }
}
