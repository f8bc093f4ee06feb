use std::collections::HashSet;

use relayd_state::{PeerCaps, PrefixFlags, StateGraph};
use relayd_types::{ChannelId, ClientId, ServerId};

/// One local client, if it is in fact local and still present.
pub fn to_one(graph: &StateGraph, target: ClientId) -> Vec<ClientId> {
    match graph.client(target) {
        Some(c) if c.is_local() => vec![target],
        _ => Vec::new(),
    }
}

/// Every local member of `channel` other than `except`.
pub fn to_channel_local(graph: &StateGraph, channel: ChannelId, except: Option<ClientId>) -> Vec<ClientId> {
    let Some(chan) = graph.channel(channel) else {
        return Vec::new();
    };
    chan.members
        .iter()
        .copied()
        .filter(|&id| Some(id) != except)
        .filter(|&id| graph.client(id).is_some_and(|c| c.is_local()))
        .collect()
}

/// Local members of `channel` whose highest prefix is among `mask` — e.g. "only chanops and above".
pub fn to_channel_prefixes(
    graph: &StateGraph,
    channel: ChannelId,
    except: Option<ClientId>,
    mask: PrefixFlags,
) -> Vec<ClientId> {
    let Some(chan) = graph.channel(channel) else {
        return Vec::new();
    };
    chan.members
        .iter()
        .copied()
        .filter(|&id| Some(id) != except)
        .filter(|&id| graph.client(id).is_some_and(|c| c.is_local()))
        .filter(|&id| graph.membership(id, channel).is_some_and(|m| m.flags.intersects(mask)))
        .collect()
}

/// The set-union of local members across every channel `source` is in,
/// each named once, `source` and `except` excluded.
pub fn to_common_channels(graph: &StateGraph, source: ClientId, except: Option<ClientId>) -> Vec<ClientId> {
    let Some(client) = graph.client(source) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for &channel in &client.channels {
        for member in to_channel_local(graph, channel, None) {
            if member == source || Some(member) == except {
                continue;
            }
            if seen.insert(member) {
                out.push(member);
            }
        }
    }
    out
}

/// A single peer.
pub fn to_serv(graph: &StateGraph, server: ServerId) -> Vec<ServerId> {
    match graph.server(server) {
        Some(s) if s.is_immediate_peer() => vec![server],
        _ => Vec::new(),
    }
}

/// Every immediately-connected peer but one.
pub fn to_serv_butone(graph: &StateGraph, except: ServerId) -> Vec<ServerId> {
    all_immediate_peers(graph)
        .into_iter()
        .filter(|&id| id != except)
        .collect()
}

/// Immediately-connected peers selected by whether they hold `flag`.
pub fn to_serv_pflag(graph: &StateGraph, flag: PeerCaps, want: bool) -> Vec<ServerId> {
    all_immediate_peers(graph)
        .into_iter()
        .filter(|&id| graph.server(id).is_some_and(|s| s.caps.contains(flag) == want))
        .collect()
}

fn all_immediate_peers(graph: &StateGraph) -> Vec<ServerId> {
    graph
        .servers()
        .filter(|&id| id != graph.self_server())
        .filter(|&id| graph.server(id).is_some_and(|s| s.is_immediate_peer()))
        .collect()
}

/// Everyone subscribed to the named operator-notice flag.
pub fn to_flag<'a>(registry: &'a crate::sflag::SflagRegistry, flag: &str) -> &'a [ClientId] {
    registry.members(flag)
}

/// Clients whose display host or server name glob-matches `pattern`.
pub fn to_match(graph: &StateGraph, all_clients: &[ClientId], pattern: &str) -> Vec<ClientId> {
    all_clients
        .iter()
        .copied()
        .filter(|&id| {
            graph.client(id).is_some_and(|c| {
                relayd_modes::glob_match(pattern, &c.host)
                    || graph
                        .server(c.server)
                        .is_some_and(|s| relayd_modes::glob_match(pattern, &s.name))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayd_state::{Rfc1459, Server};
    use relayd_types::{ConnId, Ts};
    use std::net::{IpAddr, Ipv4Addr};

    fn graph() -> StateGraph {
        StateGraph::new(Box::new(Rfc1459), "here", "test server", 64)
    }

    fn add_client(graph: &mut StateGraph, nick: &str, server: ServerId) -> ClientId {
        let id = graph
            .create_client(
                nick,
                "u",
                "host",
                IpAddr::V4(Ipv4Addr::LOCALHOST),
                "i",
                server,
                Ts(1),
                Ts(1),
            )
            .unwrap();
        if server == graph.self_server() {
            graph.client_mut(id).unwrap().conn = Some(ConnId::from_raw(id.raw()));
        }
        id
    }

    #[test]
    fn to_channel_local_excludes_the_given_except_and_remote_clients() {
        let mut g = graph();
        let chan = g.find_or_create_channel("#t", Ts(1));
        let alice = add_client(&mut g, "alice", g.self_server());
        let bob = add_client(&mut g, "bob", g.self_server());
        g.join_channel(alice, chan).unwrap();
        g.join_channel(bob, chan).unwrap();

        let recipients = to_channel_local(&g, chan, Some(alice));
        assert_eq!(recipients, vec![bob]);
    }

    #[test]
    fn to_common_channels_unions_without_duplicates_and_excludes_the_source() {
        let mut g = graph();
        let a = g.find_or_create_channel("#a", Ts(1));
        let b = g.find_or_create_channel("#b", Ts(1));
        let alice = add_client(&mut g, "alice", g.self_server());
        let bob = add_client(&mut g, "bob", g.self_server());
        g.join_channel(alice, a).unwrap();
        g.join_channel(alice, b).unwrap();
        g.join_channel(bob, a).unwrap();
        g.join_channel(bob, b).unwrap();

        let recipients = to_common_channels(&g, alice, None);
        assert_eq!(recipients, vec![bob]);
    }

    #[test]
    fn to_serv_butone_excludes_the_named_peer_but_keeps_other_immediate_peers() {
        let mut g = graph();
        let p1 = g.create_server(Server::new_peer("p1.example", "p1", 1));
        let p2 = g.create_server(Server::new_peer("p2.example", "p2", 1));
        g.server_mut(p1).unwrap().conn = Some(ConnId::from_raw(0));
        g.server_mut(p2).unwrap().conn = Some(ConnId::from_raw(1));

        let mut recipients = to_serv_butone(&g, p1);
        recipients.sort_by_key(|s| s.raw());
        assert_eq!(recipients, vec![p2]);
    }

    #[test]
    fn to_match_globs_against_host_and_server_name() {
        let mut g = graph();
        let alice = add_client(&mut g, "alice", g.self_server());
        let all = vec![alice];
        assert_eq!(to_match(&g, &all, "*.example").len(), 0);
        assert_eq!(to_match(&g, &all, "host"), vec![alice]);
    }
}
