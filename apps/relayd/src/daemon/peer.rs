//! Server-link wiring: turns the decisions `relayd-peer` computes
//! (nick collisions, TS conflicts, burst content) into actual mutations of
//! the live [`StateGraph`] and messages queued back out to the peer
//! connection. The dialect adapters and the pure decision functions
//! themselves live in `relayd-peer`; this module is the part that is
//! specific to *this* daemon's socket/graph wiring, same division as
//! `relayd-modes`'s access checks vs. `apps/relayd/src/daemon/commands.rs`.

use std::net::SocketAddr;

use relayd_peer::{burst, resolve_collision, ExistingClaimant};
use relayd_proto::Message;
use relayd_state::Server;
use relayd_types::Ts;

use super::state::CmdState;

/// Introduces a peer-relayed `NICK` into the graph, resolving a collision
/// against any client already holding that nick before creating the new
/// one. Returns `true` if the introduction stands (either nothing
/// collided, or it won the collision).
pub fn introduce_peer_nick(
    ctx: &mut CmdState,
    server: relayd_types::ServerId,
    intro: &relayd_peer::NickIntro,
) -> bool {
    if let Some(existing) = ctx.graph.find_client_by_nick(&intro.nick) {
        let claimant = ExistingClaimant {
            ts: ctx.graph.client(existing).map(|c| c.ts).unwrap_or(Ts::UNTRUSTED),
            is_local_unregistered: false,
        };
        use relayd_peer::CollisionResolution;
        match resolve_collision(&claimant, intro.ts, false) {
            CollisionResolution::DropExisting => {
                let now = super::commands::now_ts();
                let _ = ctx.graph.remove_client(existing, now);
                ctx.forget_client(existing);
            }
            CollisionResolution::DropIncoming { .. } => return false,
            CollisionResolution::KillBoth => {
                let now = super::commands::now_ts();
                let _ = ctx.graph.remove_client(existing, now);
                ctx.forget_client(existing);
                return false;
            }
            CollisionResolution::DropUnregisteredLocal => {
                let now = super::commands::now_ts();
                let _ = ctx.graph.remove_client(existing, now);
                ctx.forget_client(existing);
            }
        }
    }

    let ip = intro.ip.unwrap_or(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));
    ctx.graph
        .create_client(intro.nick.clone(), intro.user.clone(), intro.host.clone(), ip, intro.info.clone(), server, intro.ts, intro.ts)
        .is_ok()
}

/// Registers a new remote server in the spanning tree and queues the full
/// state burst back to it, in the dialect it negotiated.
pub fn link_and_burst(ctx: &mut CmdState, addr: SocketAddr, name: &str, info: &str, hops: u32, dialect: &dyn relayd_peer::Dialect) {
    let server_id = ctx.graph.create_server(Server::new_peer(name, info, hops));
    if let Some(s) = ctx.graph.server_mut(server_id) {
        s.caps = dialect.caps();
    }

    ctx.queue(addr, &dialect.banner());
    let messages = burst(&ctx.graph, dialect);
    for msg in &messages {
        ctx.queue(addr, msg);
    }
}
