use relayd_state::StateGraph;
use relayd_types::ServerId;

use crate::error::Error;

/// Result of [`pass_command`]: whether the named target lives on this
/// server or must be forwarded to its owning peer.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum PassOutcome {
    Local,
    Forward(ServerId),
}

pub fn pass_command(graph: &StateGraph, target_nick: &str) -> Result<PassOutcome, Error> {
    let id = graph
        .find_client_by_nick(target_nick)
        .ok_or_else(|| Error::UnknownCommand(target_nick.to_string()))?;
    let client = graph
        .client(id)
        .ok_or_else(|| Error::UnknownCommand(target_nick.to_string()))?;
    if client.server == graph.self_server() {
        Ok(PassOutcome::Local)
    } else {
        Ok(PassOutcome::Forward(client.server))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayd_types::Ts;
    use std::net::{IpAddr, Ipv4Addr};

    fn graph() -> StateGraph {
        StateGraph::new(Box::new(relayd_state::Rfc1459), "here", "test server", 64)
    }

    #[test]
    fn a_local_client_passes_through_locally() {
        let mut g = graph();
        g.create_client(
            "alice",
            "u",
            "h",
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            "i",
            g.self_server(),
            Ts(1),
            Ts(1),
        )
        .unwrap();
        assert_eq!(pass_command(&g, "alice").unwrap(), PassOutcome::Local);
    }

    #[test]
    fn a_client_on_a_peer_server_forwards_there() {
        let mut g = graph();
        let peer = g.create_server(relayd_state::Server::new_peer("peer.example", "peer server", 1));
        g.create_client(
            "bob",
            "u",
            "h",
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            "i",
            peer,
            Ts(1),
            Ts(1),
        )
        .unwrap();
        assert_eq!(pass_command(&g, "bob").unwrap(), PassOutcome::Forward(peer));
    }

    #[test]
    fn an_unknown_nick_is_an_error() {
        let g = graph();
        assert!(pass_command(&g, "nobody").is_err());
    }
}
