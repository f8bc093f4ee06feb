//! Burst generation: the state dump a peer receives on
//! link-up, expressed purely as the sequence of [`Message`]s to write to
//! its connection. Building the message list and actually queuing bytes on
//! a socket are kept separate so this stays testable without a reactor.

use relayd_proto::Message;
use relayd_state::StateGraph;
use relayd_types::{ChannelId, Ts};

use crate::dialect::{Dialect, NickIntro};

/// Everything this process knows, serialized in burst order: servers first
/// (so later `NICK`s can resolve their origin), then clients, then
/// channels with their members/modes/bans/topic.
pub fn burst(graph: &StateGraph, dialect: &dyn Dialect) -> Vec<Message> {
    let mut out = Vec::new();
    burst_servers(graph, &mut out);
    burst_clients(graph, dialect, &mut out);
    for channel_id in graph.channels() {
        burst_channel(graph, dialect, channel_id, &mut out);
    }
    out
}

fn burst_servers(graph: &StateGraph, out: &mut Vec<Message>) {
    for id in graph.servers() {
        if id == graph.self_server() {
            continue;
        }
        let Some(server) = graph.server(id) else { continue };
        out.push(Message::new(
            "SERVER",
            vec![server.name.clone(), server.hops.to_string(), server.info.clone()],
        ));
    }
}

fn burst_clients(graph: &StateGraph, dialect: &dyn Dialect, out: &mut Vec<Message>) {
    for server_id in graph.servers() {
        let Some(server) = graph.server(server_id) else { continue };
        let server_name = server.name.clone();
        for &client_id in graph.clients_on_server(server_id) {
            let Some(client) = graph.client(client_id) else { continue };
            let intro = NickIntro {
                nick: client.nick.clone(),
                hops: server.hops + 1,
                ts: client.ts,
                user: client.user.clone(),
                host: client.host.clone(),
                server: server_name.clone(),
                ip: Some(client.ip),
                info: client.info.clone(),
            };
            out.push(dialect.serialize_nick(&intro));
            if let Some(away) = &client.away {
                out.push(Message::new("AWAY", vec![away.clone()]).with_prefix(client.nick.clone()));
            }
        }
    }
}

fn burst_channel(graph: &StateGraph, dialect: &dyn Dialect, channel_id: ChannelId, out: &mut Vec<Message>) {
    let Some(channel) = graph.channel(channel_id) else { return };

    if dialect.supports_sjoin() {
        let members: Vec<String> = channel
            .members
            .iter()
            .filter_map(|&c| {
                let client = graph.client(c)?;
                let membership = graph.membership(c, channel_id)?;
                let prefix = membership.flags.rank_char().map(String::from).unwrap_or_default();
                Some(format!("{prefix}{}", client.nick))
            })
            .collect();
        let modestring = condensed_modes(channel);
        out.push(Message::new(
            "SJOIN",
            vec![channel.created.0.to_string(), channel.name.clone(), modestring, members.join(" ")],
        ));
    } else {
        for &client_id in &channel.members {
            let Some(client) = graph.client(client_id) else { continue };
            out.push(Message::new("JOIN", vec![channel.name.clone()]).with_prefix(client.nick.clone()));
            if let Some(membership) = graph.membership(client_id, channel_id) {
                if let Some(rank) = membership.flags.rank_char() {
                    let letter = match rank {
                        '@' => "o",
                        '%' => "h",
                        _ => "v",
                    };
                    out.push(
                        Message::new("MODE", vec![channel.name.clone(), format!("+{letter}"), client.nick.clone()])
                            .with_prefix(graph.server(graph.self_server()).map(|s| s.name.clone()).unwrap_or_default()),
                    );
                }
            }
        }
    }

    for ban in &channel.bans {
        out.push(Message::new("MODE", vec![channel.name.clone(), "+b".to_string(), ban.mask()]));
    }

    if let Some((text, setter, _)) = &channel.topic {
        out.push(Message::new("TOPIC", vec![channel.name.clone(), text.clone()]).with_prefix(setter.clone()));
    }
}

fn condensed_modes(channel: &relayd_state::Channel) -> String {
    let mut s = String::from("+");
    if channel.modes.contains(relayd_state::ChannelModes::MODERATED) {
        s.push('m');
    }
    if channel.modes.contains(relayd_state::ChannelModes::SECRET) {
        s.push('s');
    }
    if channel.modes.contains(relayd_state::ChannelModes::NO_EXTERNAL) {
        s.push('n');
    }
    if channel.modes.contains(relayd_state::ChannelModes::TOPIC_LOCK) {
        s.push('t');
    }
    if channel.modes.contains(relayd_state::ChannelModes::INVITE_ONLY) {
        s.push('i');
    }
    if channel.modes.contains(relayd_state::ChannelModes::PRIVATE) {
        s.push('p');
    }
    if let Some(key) = &channel.key {
        s.push('k');
        let _ = key;
    }
    if channel.limit.is_some() {
        s.push('l');
    }
    if s == "+" {
        String::new()
    } else {
        s
    }
}
