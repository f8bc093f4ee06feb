//! Built-in command registrations: the handlers that make NICK,
//! USER, PING, JOIN, PART, PRIVMSG/NOTICE, MODE, TOPIC, INVITE, KICK,
//! AWAY and QUIT do something, wired against the [`CmdState`] bundle
//! rather than the whole daemon.

use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use relayd_dispatch::{weight, CommandFlags, CommandSpec, CommandTable, Error as DispatchError};
use relayd_modes::{
    apply_channel_modes, ban_matches, check, count_matching_bans, glob_match, recount_channel_bans,
    ChanLetter, JoinCheck, ModeCheck, SeeCheck, SendCheck, CAN_JOIN_CHANNEL, CAN_SEE_CHANNEL,
    CAN_SEND_CHANNEL,
};
use relayd_proto::Message;
use relayd_router::{to_channel_local, to_common_channels};
use relayd_state::{ChannelModes, PrefixFlags, UserModes};
use relayd_types::{Numeric, Ts};

use super::state::CmdState;

pub fn now_ts() -> Ts {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(1);
    Ts(secs)
}

/// Registers every built-in command. `NOTICE`/`PRIVMSG` share a handler
/// shape but are kept as separate specs since their delivery semantics
/// around errors differ — a `NOTICE` never gets a numeric error back.
pub fn register_builtins(table: &mut CommandTable<CmdState>) -> Result<(), DispatchError> {
    table.register(CommandSpec {
        name: "NICK".into(),
        min_args: 1,
        // 1 when a local client sets/renames its own nick; 7 for a
        // peer-relayed introduction.
        max_args: 7,
        flags: CommandFlags::FOLD_EXCESS_ARGS_INTO_LAST,
        handler: Box::new(handle_nick),
    })?;
    table.register(CommandSpec {
        name: "USER".into(),
        min_args: 4,
        max_args: 4,
        flags: CommandFlags::UNREGISTERED,
        handler: Box::new(handle_user),
    })?;
    table.register(CommandSpec {
        name: "PING".into(),
        min_args: 1,
        max_args: 1,
        flags: CommandFlags::NONE,
        handler: Box::new(handle_ping),
    })?;
    table.register(CommandSpec {
        name: "PONG".into(),
        min_args: 1,
        max_args: 1,
        flags: CommandFlags::NONE,
        handler: Box::new(|_, _| weight::NONE),
    })?;
    table.register(CommandSpec {
        name: "JOIN".into(),
        min_args: 1,
        max_args: 2,
        flags: CommandFlags::REGISTERED,
        handler: Box::new(handle_join),
    })?;
    table.register(CommandSpec {
        name: "PART".into(),
        min_args: 1,
        max_args: 2,
        flags: CommandFlags::REGISTERED | CommandFlags::FOLD_EXCESS_ARGS_INTO_LAST,
        handler: Box::new(handle_part),
    })?;
    table.register(CommandSpec {
        name: "PRIVMSG".into(),
        min_args: 2,
        max_args: 2,
        flags: CommandFlags::REGISTERED | CommandFlags::FOLD_EXCESS_ARGS_INTO_LAST,
        handler: Box::new(|ctx, args| handle_message(ctx, args, "PRIVMSG")),
    })?;
    table.register(CommandSpec {
        name: "NOTICE".into(),
        min_args: 2,
        max_args: 2,
        flags: CommandFlags::REGISTERED | CommandFlags::FOLD_EXCESS_ARGS_INTO_LAST,
        handler: Box::new(|ctx, args| handle_message(ctx, args, "NOTICE")),
    })?;
    table.register(CommandSpec {
        name: "MODE".into(),
        min_args: 1,
        max_args: 10,
        flags: CommandFlags::REGISTERED,
        handler: Box::new(handle_mode),
    })?;
    table.register(CommandSpec {
        name: "TOPIC".into(),
        min_args: 1,
        max_args: 2,
        flags: CommandFlags::REGISTERED | CommandFlags::FOLD_EXCESS_ARGS_INTO_LAST,
        handler: Box::new(handle_topic),
    })?;
    table.register(CommandSpec {
        name: "AWAY".into(),
        min_args: 0,
        max_args: 1,
        flags: CommandFlags::REGISTERED | CommandFlags::FOLD_EXCESS_ARGS_INTO_LAST,
        handler: Box::new(handle_away),
    })?;
    table.register(CommandSpec {
        name: "QUIT".into(),
        min_args: 0,
        max_args: 1,
        flags: CommandFlags::NONE,
        handler: Box::new(handle_quit),
    })?;
    table.register(CommandSpec {
        name: "SERVER".into(),
        min_args: 2,
        max_args: 3,
        flags: CommandFlags::UNREGISTERED | CommandFlags::FOLD_EXCESS_ARGS_INTO_LAST,
        handler: Box::new(handle_server),
    })?;
    table.register(CommandSpec {
        name: "INVITE".into(),
        min_args: 2,
        max_args: 2,
        flags: CommandFlags::REGISTERED,
        handler: Box::new(handle_invite),
    })?;
    table.register(CommandSpec {
        name: "KICK".into(),
        min_args: 2,
        max_args: 3,
        flags: CommandFlags::REGISTERED | CommandFlags::FOLD_EXCESS_ARGS_INTO_LAST,
        handler: Box::new(handle_kick),
    })?;
    table.register(CommandSpec {
        name: "PASS".into(),
        min_args: 1,
        max_args: 1,
        flags: CommandFlags::UNREGISTERED,
        handler: Box::new(handle_pass),
    })?;
    table.register(CommandSpec {
        name: "OPER".into(),
        min_args: 2,
        max_args: 2,
        flags: CommandFlags::REGISTERED,
        handler: Box::new(handle_oper),
    })?;
    table.register(CommandSpec {
        name: "WHOIS".into(),
        min_args: 1,
        max_args: 2,
        flags: CommandFlags::REGISTERED,
        handler: Box::new(handle_whois),
    })?;
    table.register(CommandSpec {
        name: "WHOWAS".into(),
        min_args: 1,
        max_args: 2,
        flags: CommandFlags::REGISTERED,
        handler: Box::new(handle_whowas),
    })?;
    table.register(CommandSpec {
        name: "WHO".into(),
        min_args: 0,
        max_args: 1,
        flags: CommandFlags::REGISTERED,
        handler: Box::new(handle_who),
    })?;
    table.register(CommandSpec {
        name: "LIST".into(),
        min_args: 0,
        max_args: 1,
        flags: CommandFlags::REGISTERED,
        handler: Box::new(handle_list),
    })?;
    table.register(CommandSpec {
        name: "USERHOST".into(),
        min_args: 1,
        max_args: 5,
        flags: CommandFlags::REGISTERED,
        handler: Box::new(handle_userhost),
    })?;
    table.register(CommandSpec {
        name: "SAMODE".into(),
        min_args: 2,
        max_args: 10,
        flags: CommandFlags::REGISTERED | CommandFlags::OPERATOR,
        handler: Box::new(handle_samode),
    })?;
    Ok(())
}

/// A new server introduces itself: `SERVER <name> <hopcount> [:info]`.
/// Dialect negotiation (`CAPAB`) is assumed to have already run at the
/// connection level; the fixed RFC 1459 baseline adapter stands in for it
/// here, same simplification `relayd-peer`'s own tests make.
fn handle_server(ctx: &mut CmdState, args: &[String]) -> i32 {
    let addr = ctx.current;
    let name = &args[0];
    let hops: u32 = args[1].parse().unwrap_or(1);
    let info = args.get(2).map(String::as_str).unwrap_or("");
    if ctx.graph.find_server(name).is_some() {
        return weight::NONE;
    }
    super::peer::link_and_burst(ctx, addr, name, info, hops, &relayd_peer::Rfc1459Peer);
    weight::NONE
}

fn handle_nick(ctx: &mut CmdState, args: &[String]) -> i32 {
    if args.len() >= 6 {
        return handle_peer_nick(ctx, args);
    }
    let nick = args[0].clone();
    match ctx.current_client() {
        None => {
            let addr = ctx.current;
            if let Some(conn) = ctx.conns.get_mut(&addr) {
                conn.pending_nick = Some(nick);
            }
            try_complete_registration(ctx, addr);
        }
        Some(client_id) => {
            if ctx.graph.find_client_by_nick(&nick).is_some() {
                ctx.numeric(Numeric::ErrNicknameInUse, vec![nick]);
                return weight::LOW;
            }
            let old_mask = ctx.graph.client(client_id).map(|c| c.full_mask()).unwrap_or_default();
            if ctx.graph.rename_client(client_id, nick.clone()).is_ok() {
                let recipients = to_common_channels(&ctx.graph, client_id, None);
                let msg = Message::new("NICK", vec![nick]).with_prefix(old_mask);
                ctx.send_to_clients(&recipients, &msg);
                ctx.send_to_client(client_id, &msg);
            }
        }
    }
    weight::LOW
}

/// A peer relays another server's client into our graph. Arg shape
/// and collision handling come straight from `relayd-peer`; this is only
/// the glue that hands its output to the state graph and flood weight.
fn handle_peer_nick(ctx: &mut CmdState, args: &[String]) -> i32 {
    use relayd_peer::Dialect;
    let msg = Message::new("NICK", args.to_vec());
    if let Ok(intro) = relayd_peer::Rfc1459Peer.parse_nick(&msg) {
        let server = ctx
            .graph
            .find_server(&intro.server)
            .unwrap_or_else(|| ctx.graph.self_server());
        super::peer::introduce_peer_nick(ctx, server, &intro);
    }
    weight::NONE
}

fn handle_user(ctx: &mut CmdState, args: &[String]) -> i32 {
    let addr = ctx.current;
    if let Some(conn) = ctx.conns.get_mut(&addr) {
        conn.pending_user = Some((args[0].clone(), args[1].clone(), args[3].clone()));
    }
    try_complete_registration(ctx, addr);
    weight::LOW
}

/// Creates the [`relayd_state::Client`] once both halves of the
/// registration handshake (`NICK`, `USER`) have arrived, then sends the
/// welcome burst.
fn try_complete_registration(ctx: &mut CmdState, addr: SocketAddr) {
    let Some(conn) = ctx.conns.get(&addr) else { return };
    if conn.client.is_some() {
        return;
    }
    let (Some(nick), Some((user, _mode, realname))) =
        (conn.pending_nick.clone(), conn.pending_user.clone())
    else {
        return;
    };
    if ctx.graph.find_client_by_nick(&nick).is_some() {
        ctx.numeric(Numeric::ErrNicknameInUse, vec![nick]);
        return;
    }

    let ip = addr.ip();
    let server = ctx.graph.self_server();
    let now = now_ts();
    let client_id = match ctx
        .graph
        .create_client(nick, user, addr.ip().to_string(), ip, realname, server, now, now)
    {
        Ok(id) => id,
        Err(_) => return,
    };

    if let Some(conn) = ctx.conns.get_mut(&addr) {
        conn.client = Some(client_id);
        conn.conn_state = conn
            .conn_state
            .advance(relayd_peer::ConnState::Registered)
            .and_then(|s| s.advance(relayd_peer::ConnState::ConnectedClient))
            .unwrap_or(conn.conn_state);
    }
    ctx.client_addr.insert(client_id, addr);

    let nick = ctx.graph.client(client_id).map(|c| c.nick.clone()).unwrap_or_default();
    ctx.numeric(
        Numeric::RplWelcome,
        vec![format!("Welcome to the network, {nick}")],
    );
}

fn handle_ping(ctx: &mut CmdState, args: &[String]) -> i32 {
    let addr = ctx.current;
    let reply = Message::new("PONG", vec![ctx.server_name.clone(), args[0].clone()])
        .with_prefix(ctx.server_name.clone());
    ctx.queue(addr, &reply);
    weight::NONE
}

fn handle_join(ctx: &mut CmdState, args: &[String]) -> i32 {
    let Some(client_id) = ctx.current_client() else { return weight::NONE };
    let keys: Vec<&str> = args.get(1).map(|k| k.split(',').collect()).unwrap_or_default();

    for (i, name) in args[0].split(',').enumerate() {
        if name.is_empty() || !name.starts_with('#') {
            ctx.numeric(Numeric::ErrNoSuchChannel, vec![name.to_string()]);
            continue;
        }
        let now = now_ts();
        let existed = ctx.graph.find_channel(name).is_some();
        let channel_id = ctx.graph.find_or_create_channel(name, now);
        let key_given = keys.get(i).copied();

        let (banned, invited, invite_only, key_ok, limit_ok) = {
            let chan = ctx.graph.channel(channel_id).expect("just created/found");
            let client = ctx.graph.client(client_id).expect("dispatch only runs for a live client");
            let banned = chan.bans.iter().any(|b| ban_matches(b, client));
            let invited = chan.is_invited(client_id);
            let invite_only = chan.modes.contains(relayd_state::ChannelModes::INVITE_ONLY);
            let key_ok = chan.key.as_deref().map(|k| Some(k) == key_given).unwrap_or(true);
            let limit_ok = chan.limit.map(|l| (chan.members.len() as u32) < l).unwrap_or(true);
            (banned, invited, invite_only, key_ok, limit_ok)
        };

        let verdict = check(
            &mut ctx.access_bus,
            CAN_JOIN_CHANNEL,
            &JoinCheck { invited, banned, invite_only, key_ok, limit_ok },
        );
        if let Ok(Err(code)) = verdict {
            let numeric = code.map(|c| Numeric::Other(c as u16)).unwrap_or(Numeric::ErrNoSuchChannel);
            ctx.numeric(numeric, vec![name.to_string()]);
            continue;
        }

        if ctx.graph.join_channel(client_id, channel_id).is_err() {
            continue;
        }
        if !existed {
            if let Some(m) = ctx.graph.membership_mut(client_id, channel_id) {
                m.flags.set(PrefixFlags::OP);
            }
        }
        // An accepted invite is single-use and forces the ban cache to 0
        // even if the client's mask still matches a ban entry (§4.H/S4).
        let consumed_invite = ctx
            .graph
            .channel_mut(channel_id)
            .map(|c| c.consume_invite(client_id))
            .unwrap_or(false);
        let bans_count = if consumed_invite {
            0
        } else {
            let chan = ctx.graph.channel(channel_id).expect("just joined");
            let client = ctx.graph.client(client_id).expect("just joined");
            count_matching_bans(&chan.bans, client)
        };
        if let Some(m) = ctx.graph.membership_mut(client_id, channel_id) {
            m.bans = bans_count;
        }
        let mask = ctx.graph.client(client_id).map(|c| c.full_mask()).unwrap_or_default();
        let msg = Message::new("JOIN", vec![name.to_string()]).with_prefix(mask);
        let recipients = to_channel_local(&ctx.graph, channel_id, None);
        ctx.send_to_clients(&recipients, &msg);

        send_names(ctx, channel_id, name);
    }
    weight::LOW
}

fn send_names(ctx: &mut CmdState, channel_id: relayd_types::ChannelId, name: &str) {
    let members: Vec<String> = ctx
        .graph
        .channel(channel_id)
        .map(|chan| {
            chan.members
                .iter()
                .filter_map(|&m| {
                    let membership = ctx.graph.membership(m, channel_id)?;
                    let nick = ctx.graph.client(m)?.nick.clone();
                    Some(match membership.flags.rank_char() {
                        Some(c) => format!("{c}{nick}"),
                        None => nick,
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    ctx.numeric(Numeric::RplNamReply, vec!["=".into(), name.to_string(), members.join(" ")]);
    ctx.numeric(Numeric::RplEndOfNames, vec![name.to_string(), "End of /NAMES list".into()]);
}

fn handle_part(ctx: &mut CmdState, args: &[String]) -> i32 {
    let Some(client_id) = ctx.current_client() else { return weight::NONE };
    let reason = args.get(1).cloned();

    for name in args[0].split(',') {
        let Some(channel_id) = ctx.graph.find_channel(name) else {
            ctx.numeric(Numeric::ErrNoSuchChannel, vec![name.to_string()]);
            continue;
        };
        if ctx.graph.membership(client_id, channel_id).is_none() {
            ctx.numeric(Numeric::ErrNotOnChannel, vec![name.to_string()]);
            continue;
        }
        let recipients = to_channel_local(&ctx.graph, channel_id, None);
        let mask = ctx.graph.client(client_id).map(|c| c.full_mask()).unwrap_or_default();
        let mut part_args = vec![name.to_string()];
        if let Some(r) = &reason {
            part_args.push(r.clone());
        }
        let msg = Message::new("PART", part_args).with_prefix(mask);
        ctx.send_to_clients(&recipients, &msg);

        let _ = ctx.graph.part_channel(client_id, channel_id);
        ctx.graph.destroy_channel_if_empty(channel_id);
    }
    weight::LOW
}

fn handle_message(ctx: &mut CmdState, args: &[String], command: &str) -> i32 {
    let Some(client_id) = ctx.current_client() else { return weight::NONE };
    let target = &args[0];
    let text = &args[1];
    let mask = ctx.graph.client(client_id).map(|c| c.full_mask()).unwrap_or_default();

    if target.starts_with('#') {
        let Some(channel_id) = ctx.graph.find_channel(target) else {
            if command == "PRIVMSG" {
                ctx.numeric(Numeric::ErrNoSuchChannel, vec![target.clone()]);
            }
            return weight::LOW;
        };
        let membership = ctx.graph.membership(client_id, channel_id);
        let is_member = membership.is_some();
        let has_voice_or_higher = membership
            .map(|m| m.flags.intersects(PrefixFlags::OP | PrefixFlags::HALFOP | PrefixFlags::VOICE))
            .unwrap_or(false);
        // `membership.bans` is the cache `JOIN`/`MODE +b` already kept
        // current (§4.H) — a send never rescans the ban list itself.
        let banned = membership.map(|m| m.bans > 0).unwrap_or(false);
        let (moderated, no_external) = {
            let chan = ctx.graph.channel(channel_id).expect("looked up above");
            (
                chan.modes.contains(relayd_state::ChannelModes::MODERATED),
                chan.modes.contains(relayd_state::ChannelModes::NO_EXTERNAL),
            )
        };
        let verdict = check(
            &mut ctx.access_bus,
            CAN_SEND_CHANNEL,
            &SendCheck { is_member, has_voice_or_higher, moderated, no_external, banned },
        );
        if let Ok(Err(code)) = verdict {
            if command == "PRIVMSG" {
                let numeric = code.map(|c| Numeric::Other(c as u16)).unwrap_or(Numeric::ErrCannotSendToChan);
                ctx.numeric(numeric, vec![target.clone()]);
            }
            return weight::LOW;
        }
        let recipients = to_channel_local(&ctx.graph, channel_id, Some(client_id));
        let msg = Message::new(command, vec![target.clone(), text.clone()]).with_prefix(mask);
        ctx.send_to_clients(&recipients, &msg);
    } else {
        let Some(target_id) = ctx.graph.find_client_by_nick(target) else {
            if command == "PRIVMSG" {
                ctx.numeric(Numeric::ErrNoSuchNick, vec![target.clone()]);
            }
            return weight::LOW;
        };
        let msg = Message::new(command, vec![target.clone(), text.clone()]).with_prefix(mask);
        ctx.send_to_client(target_id, &msg);
    }
    weight::LOW
}

fn handle_mode(ctx: &mut CmdState, args: &[String]) -> i32 {
    let Some(client_id) = ctx.current_client() else { return weight::NONE };
    let target = &args[0];

    if !target.starts_with('#') {
        return weight::LOW;
    }
    let Some(channel_id) = ctx.graph.find_channel(target) else {
        ctx.numeric(Numeric::ErrNoSuchChannel, vec![target.clone()]);
        return weight::LOW;
    };

    if args.len() == 1 {
        let condensed = ctx
            .graph
            .channel(channel_id)
            .map(condensed_mode_string)
            .unwrap_or_default();
        ctx.numeric(Numeric::RplChannelModeIs, vec![target.clone(), condensed]);
        return weight::LOW;
    }

    let is_op = ctx
        .graph
        .membership(client_id, channel_id)
        .map(|m| m.flags.intersects(PrefixFlags::OP | PrefixFlags::HALFOP))
        .unwrap_or(false);
    let mask = ctx.graph.client(client_id).map(|c| c.full_mask()).unwrap_or_default();
    let now = now_ts();

    let outcome = apply_channel_modes(
        &mut ctx.graph,
        channel_id,
        &mask,
        now,
        &args[1..],
        relayd_types::DEFAULT_MAX_MODES_PER_LINE,
        |letter: ChanLetter, _plus: bool, _arg: Option<&str>| {
            if is_op {
                ModeCheck::Allow
            } else {
                match letter {
                    ChanLetter::Op | ChanLetter::Halfop | ChanLetter::Voice | ChanLetter::Ban => ModeCheck::Deny,
                    _ => ModeCheck::Deny,
                }
            }
        },
    );

    if let Ok(outcome) = outcome {
        if !outcome.no_permission.is_empty() {
            ctx.numeric(Numeric::ErrChanOpPrivsNeeded, vec![target.clone()]);
        }
        if !outcome.unknown.is_empty() {
            ctx.numeric(Numeric::ErrUnknownMode, vec![outcome.unknown.iter().collect()]);
        }
        if !outcome.condensed.is_empty() {
            if outcome.condensed.contains(ChanLetter::Ban.letter()) {
                recount_channel_bans(&mut ctx.graph, channel_id);
            }
            let recipients = to_channel_local(&ctx.graph, channel_id, None);
            let mut mode_args = vec![target.clone()];
            mode_args.extend(outcome.condensed.split(' ').map(str::to_string));
            let msg = Message::new("MODE", mode_args).with_prefix(mask);
            ctx.send_to_clients(&recipients, &msg);
        }
    }
    weight::NORMAL
}

fn condensed_mode_string(chan: &relayd_state::Channel) -> String {
    let mut s = String::from("+");
    for letter in ChanLetter::ALL {
        if let Some(bit) = letter.flag_bit() {
            if chan.modes.contains(bit) {
                s.push(letter.letter());
            }
        }
    }
    if chan.key.is_some() {
        s.push('k');
    }
    if chan.limit.is_some() {
        s.push('l');
    }
    s
}

fn handle_topic(ctx: &mut CmdState, args: &[String]) -> i32 {
    let Some(client_id) = ctx.current_client() else { return weight::NONE };
    let Some(channel_id) = ctx.graph.find_channel(&args[0]) else {
        ctx.numeric(Numeric::ErrNoSuchChannel, vec![args[0].clone()]);
        return weight::LOW;
    };
    if ctx.graph.membership(client_id, channel_id).is_none() {
        ctx.numeric(Numeric::ErrNotOnChannel, vec![args[0].clone()]);
        return weight::LOW;
    }

    if args.len() == 1 {
        match ctx.graph.channel(channel_id).and_then(|c| c.topic.clone()) {
            Some((text, setter, _when)) => {
                ctx.numeric(Numeric::RplTopic, vec![args[0].clone(), text]);
                let _ = setter;
            }
            None => {
                ctx.numeric(Numeric::RplNoTopic, vec![args[0].clone(), "No topic is set".into()]);
            }
        }
        return weight::LOW;
    }

    let locked = ctx
        .graph
        .channel(channel_id)
        .map(|c| c.modes.contains(relayd_state::ChannelModes::TOPIC_LOCK))
        .unwrap_or(false);
    let is_op = ctx
        .graph
        .membership(client_id, channel_id)
        .map(|m| m.flags.intersects(PrefixFlags::OP | PrefixFlags::HALFOP))
        .unwrap_or(false);
    if locked && !is_op {
        ctx.numeric(Numeric::ErrChanOpPrivsNeeded, vec![args[0].clone()]);
        return weight::LOW;
    }

    let mask = ctx.graph.client(client_id).map(|c| c.full_mask()).unwrap_or_default();
    let now = now_ts();
    if let Some(chan) = ctx.graph.channel_mut(channel_id) {
        chan.topic = Some((args[1].clone(), mask.clone(), now));
    }
    let recipients = to_channel_local(&ctx.graph, channel_id, None);
    let msg = Message::new("TOPIC", vec![args[0].clone(), args[1].clone()]).with_prefix(mask);
    ctx.send_to_clients(&recipients, &msg);
    weight::LOW
}

/// `INVITE <nick> <channel>` — single-use, consumed by the next `JOIN`
/// from the invited client (see `handle_join`'s `JoinCheck::invited`).
/// An accepted invite is a hard override: `can_join_channel`'s built-in
/// hooks (`relayd_modes::register_core_access_hooks`) grant `ALWAYS_OK`
/// on `invited`, ahead of ban/key/limit/invite-only checks.
fn handle_invite(ctx: &mut CmdState, args: &[String]) -> i32 {
    let Some(client_id) = ctx.current_client() else { return weight::NONE };
    let nick = &args[0];
    let channel_name = &args[1];

    let Some(target_id) = ctx.graph.find_client_by_nick(nick) else {
        ctx.numeric(Numeric::ErrNoSuchNick, vec![nick.clone()]);
        return weight::LOW;
    };
    let Some(channel_id) = ctx.graph.find_channel(channel_name) else {
        ctx.numeric(Numeric::ErrNoSuchChannel, vec![channel_name.clone()]);
        return weight::LOW;
    };
    let membership = ctx.graph.membership(client_id, channel_id);
    if membership.is_none() {
        ctx.numeric(Numeric::ErrNotOnChannel, vec![channel_name.clone()]);
        return weight::LOW;
    }
    if ctx.graph.membership(target_id, channel_id).is_some() {
        ctx.numeric(Numeric::ErrUserOnChannel, vec![nick.clone(), channel_name.clone()]);
        return weight::LOW;
    }
    let invite_only = ctx
        .graph
        .channel(channel_id)
        .map(|c| c.modes.contains(relayd_state::ChannelModes::INVITE_ONLY))
        .unwrap_or(false);
    let is_op = membership
        .map(|m| m.flags.intersects(PrefixFlags::OP | PrefixFlags::HALFOP))
        .unwrap_or(false);
    if invite_only && !is_op {
        ctx.numeric(Numeric::ErrChanOpPrivsNeeded, vec![channel_name.clone()]);
        return weight::LOW;
    }

    if let Some(chan) = ctx.graph.channel_mut(channel_id) {
        if !chan.invites.contains(&target_id) {
            chan.invites.push(target_id);
        }
    }
    let inviter_nick = ctx.graph.client(client_id).map(|c| c.nick.clone()).unwrap_or_default();
    ctx.numeric(Numeric::RplInviting, vec![nick.clone(), channel_name.clone()]);
    let invite_msg = Message::new("INVITE", vec![nick.clone(), channel_name.clone()])
        .with_prefix(ctx.graph.client(client_id).map(|c| c.full_mask()).unwrap_or(inviter_nick));
    ctx.send_to_client(target_id, &invite_msg);
    weight::LOW
}

/// `KICK <channel> <nick> [reason]` — requires op/halfop in the channel;
/// forcibly parts the target the same way `PART` does, but from the
/// kicker rather than the target, and with a distinct wire command so
/// the target (and everyone else) sees *why* the membership ended.
fn handle_kick(ctx: &mut CmdState, args: &[String]) -> i32 {
    let Some(client_id) = ctx.current_client() else { return weight::NONE };
    let channel_name = &args[0];
    let target_nick = &args[1];
    let reason = args.get(2).cloned().unwrap_or_else(|| target_nick.clone());

    let Some(channel_id) = ctx.graph.find_channel(channel_name) else {
        ctx.numeric(Numeric::ErrNoSuchChannel, vec![channel_name.clone()]);
        return weight::LOW;
    };
    let Some(target_id) = ctx.graph.find_client_by_nick(target_nick) else {
        ctx.numeric(Numeric::ErrNoSuchNick, vec![target_nick.clone()]);
        return weight::LOW;
    };
    let is_op = ctx
        .graph
        .membership(client_id, channel_id)
        .map(|m| m.flags.intersects(PrefixFlags::OP | PrefixFlags::HALFOP))
        .unwrap_or(false);
    if !is_op {
        ctx.numeric(Numeric::ErrChanOpPrivsNeeded, vec![channel_name.clone()]);
        return weight::LOW;
    }
    if ctx.graph.membership(target_id, channel_id).is_none() {
        ctx.numeric(Numeric::ErrUserNotInChannel, vec![target_nick.clone(), channel_name.clone()]);
        return weight::LOW;
    }

    let mask = ctx.graph.client(client_id).map(|c| c.full_mask()).unwrap_or_default();
    let recipients = to_channel_local(&ctx.graph, channel_id, None);
    let msg = Message::new("KICK", vec![channel_name.clone(), target_nick.clone(), reason])
        .with_prefix(mask);
    ctx.send_to_clients(&recipients, &msg);

    let _ = ctx.graph.part_channel(target_id, channel_id);
    ctx.graph.destroy_channel_if_empty(channel_id);
    weight::NORMAL
}

fn handle_away(ctx: &mut CmdState, args: &[String]) -> i32 {
    let Some(client_id) = ctx.current_client() else { return weight::NONE };
    if let Some(client) = ctx.graph.client_mut(client_id) {
        if args.is_empty() {
            client.away = None;
            ctx.numeric(Numeric::Other(305), vec!["You are no longer marked as being away".into()]);
        } else {
            client.away = Some(args[0].clone());
            ctx.numeric(Numeric::Other(306), vec!["You have been marked as being away".into()]);
        }
    }
    weight::LOW
}

fn handle_quit(ctx: &mut CmdState, args: &[String]) -> i32 {
    let Some(client_id) = ctx.current_client() else {
        ctx.disconnect_current("client quit");
        return weight::NONE;
    };
    let reason = args.first().cloned().unwrap_or_else(|| "Client Quit".to_string());
    let mask = ctx.graph.client(client_id).map(|c| c.full_mask()).unwrap_or_default();
    let recipients = to_common_channels(&ctx.graph, client_id, Some(client_id));
    let msg = Message::new("QUIT", vec![reason]).with_prefix(mask);
    ctx.send_to_clients(&recipients, &msg);

    let now = now_ts();
    let _ = ctx.graph.remove_client(client_id, now);
    ctx.forget_client(client_id);
    ctx.disconnect_current("client quit");
    weight::LOW
}

/// `PASS <password>` — stashed for `OPER`'s use but never itself checked
/// against a link password; only a pre-registration connection may send
/// it, and only the most recent value before `NICK`/`USER` complete the
/// handshake is kept.
fn handle_pass(ctx: &mut CmdState, args: &[String]) -> i32 {
    let addr = ctx.current;
    if let Some(conn) = ctx.conns.get_mut(&addr) {
        conn.pending_pass = Some(args[0].clone());
    }
    weight::NONE
}

/// `OPER <name> <password>` — matched against the configured
/// `operator { }` blocks. A block's optional `host` is a glob checked
/// against the caller's current display host, same mask shape a ban uses.
fn handle_oper(ctx: &mut CmdState, args: &[String]) -> i32 {
    let Some(client_id) = ctx.current_client() else { return weight::NONE };
    let name = &args[0];
    let password = &args[1];

    let Some(def) = ctx.operators.iter().find(|o| &o.name == name).cloned() else {
        ctx.numeric(Numeric::ErrNoOperHost, vec!["No O-lines for your host".into()]);
        return weight::LOW;
    };
    let host_ok = match &def.host_mask {
        Some(mask) => ctx
            .graph
            .client(client_id)
            .map(|c| glob_match(mask, &c.host) || glob_match(mask, &c.orighost))
            .unwrap_or(false),
        None => true,
    };
    if !host_ok {
        ctx.numeric(Numeric::ErrNoOperHost, vec!["No O-lines for your host".into()]);
        return weight::LOW;
    }
    if &def.password != password {
        ctx.numeric(Numeric::ErrPasswdMismatch, vec!["Password incorrect".into()]);
        return weight::LOW;
    }

    if let Some(client) = ctx.graph.client_mut(client_id) {
        client.modes.set(UserModes::OPER);
    }
    ctx.numeric(Numeric::RplYoureOper, vec!["You are now an IRC operator".into()]);
    weight::LOW
}

/// `WHOIS <nick>` — the user-info, server, and (if set) away lines any
/// client can see; no channel list, since that would need per-channel
/// `can_see_channel` filtering this build doesn't bother with for a
/// reply this cheap to skip.
fn handle_whois(ctx: &mut CmdState, args: &[String]) -> i32 {
    let nick = &args[0];
    let Some(target_id) = ctx.graph.find_client_by_nick(nick) else {
        ctx.numeric(Numeric::ErrNoSuchNick, vec![nick.clone(), "No such nick/channel".into()]);
        return weight::LOW;
    };
    let Some(target) = ctx.graph.client(target_id) else {
        ctx.numeric(Numeric::ErrNoSuchNick, vec![nick.clone(), "No such nick/channel".into()]);
        return weight::LOW;
    };
    let (nick, user, host, info, away, is_oper, server) = (
        target.nick.clone(),
        target.user.clone(),
        target.host.clone(),
        target.info.clone(),
        target.away.clone(),
        target.modes.contains(UserModes::OPER),
        target.server,
    );
    let server_name = ctx.graph.server(server).map(|s| s.name.clone()).unwrap_or_default();
    let server_info = ctx.graph.server(server).map(|s| s.info.clone()).unwrap_or_default();

    ctx.numeric(Numeric::RplWhoisUser, vec![nick.clone(), user, host, "*".into(), info]);
    ctx.numeric(Numeric::RplWhoisServer, vec![nick.clone(), server_name, server_info]);
    if let Some(msg) = away {
        ctx.numeric(Numeric::RplAway, vec![nick.clone(), msg]);
    }
    if is_oper {
        ctx.numeric(Numeric::Other(313), vec![nick.clone(), "is an IRC operator".into()]);
    }
    ctx.numeric(Numeric::RplEndOfWhois, vec![nick, "End of /WHOIS list".into()]);
    weight::LOW
}

/// `WHOWAS <nick> [count]` — every recorded identity for `nick`, most
/// recent first, optionally capped by `count`.
fn handle_whowas(ctx: &mut CmdState, args: &[String]) -> i32 {
    let nick = &args[0];
    let limit: usize = args.get(1).and_then(|n| n.parse().ok()).filter(|&n| n > 0).unwrap_or(usize::MAX);
    let eq = |a: &str, b: &str| ctx.graph.case_eq(a, b);
    let entries: Vec<_> = ctx.graph.whowas().find_by_nick(nick, &eq).take(limit).cloned().collect();

    if entries.is_empty() {
        ctx.numeric(Numeric::ErrWasNoSuchNick, vec![nick.clone(), "There was no such nickname".into()]);
    } else {
        for e in entries {
            ctx.numeric(
                Numeric::RplWhoWasUser,
                vec![e.nick, e.user, e.host, "*".into(), e.info],
            );
        }
    }
    ctx.numeric(Numeric::RplEndOfWhoWas, vec![nick.clone(), "End of WHOWAS".into()]);
    weight::LOW
}

/// `WHO [mask]` — a channel name scans that channel's membership (subject
/// to `can_see_channel`); anything else (or no argument) globs every
/// client's nick/user/host, the way a plain `WHO *` would.
fn handle_who(ctx: &mut CmdState, args: &[String]) -> i32 {
    let Some(client_id) = ctx.current_client() else { return weight::NONE };
    let mask = args.first().cloned().unwrap_or_else(|| "*".to_string());

    if let Some(channel_id) = ctx.graph.find_channel(&mask) {
        let is_member = ctx.graph.membership(client_id, channel_id).is_some();
        let secret_or_private = ctx
            .graph
            .channel(channel_id)
            .map(|c| c.modes.contains(ChannelModes::SECRET | ChannelModes::PRIVATE))
            .unwrap_or(false);
        let verdict = check(&mut ctx.access_bus, CAN_SEE_CHANNEL, &SeeCheck { secret_or_private, is_member });
        if verdict.map(|v| v.is_err()).unwrap_or(true) {
            ctx.numeric(Numeric::RplEndOfWho, vec![mask, "End of /WHO list".into()]);
            return weight::LOW;
        }
        let members = ctx.graph.channel(channel_id).map(|c| c.members.clone()).unwrap_or_default();
        for member in members {
            send_who_reply(ctx, member, &mask);
        }
    } else {
        let matches: Vec<_> = ctx
            .graph
            .clients()
            .filter(|&id| {
                ctx.graph
                    .client(id)
                    .map(|c| {
                        glob_match(&mask, &c.nick) || glob_match(&mask, &c.user) || glob_match(&mask, &c.host)
                    })
                    .unwrap_or(false)
            })
            .collect();
        for member in matches {
            send_who_reply(ctx, member, "*");
        }
    }
    ctx.numeric(Numeric::RplEndOfWho, vec![mask, "End of /WHO list".into()]);
    weight::LOW
}

fn send_who_reply(ctx: &mut CmdState, client_id: relayd_types::ClientId, channel_token: &str) {
    let Some(client) = ctx.graph.client(client_id) else { return };
    let (nick, user, host, info, away, is_oper, server) = (
        client.nick.clone(),
        client.user.clone(),
        client.host.clone(),
        client.info.clone(),
        client.away.is_some(),
        client.modes.contains(UserModes::OPER),
        client.server,
    );
    let server_name = ctx.graph.server(server).map(|s| s.name.clone()).unwrap_or_default();
    let mut flags = if away { "G".to_string() } else { "H".to_string() };
    if is_oper {
        flags.push('*');
    }
    ctx.numeric(
        Numeric::RplWhoReply,
        vec![
            channel_token.to_string(),
            user,
            host,
            server_name,
            nick,
            flags,
            format!("0 {info}"),
        ],
    );
}

/// `LIST [chanlist]` — every channel the caller can see (secret/private
/// ones only show to their own members), or just the named ones.
fn handle_list(ctx: &mut CmdState, args: &[String]) -> i32 {
    let Some(client_id) = ctx.current_client() else { return weight::NONE };
    let wanted: Option<Vec<String>> = args.first().map(|s| s.split(',').map(str::to_string).collect());

    let channel_ids: Vec<_> = match &wanted {
        Some(names) => names.iter().filter_map(|n| ctx.graph.find_channel(n)).collect(),
        None => ctx.graph.channels().collect(),
    };

    for channel_id in channel_ids {
        let is_member = ctx.graph.membership(client_id, channel_id).is_some();
        let Some((name, member_count, topic, secret_or_private)) = ctx.graph.channel(channel_id).map(|c| {
            (
                c.name.clone(),
                c.members.len(),
                c.topic.as_ref().map(|(t, _, _)| t.clone()).unwrap_or_default(),
                c.modes.contains(ChannelModes::SECRET | ChannelModes::PRIVATE),
            )
        }) else {
            continue;
        };
        let verdict = check(&mut ctx.access_bus, CAN_SEE_CHANNEL, &SeeCheck { secret_or_private, is_member });
        if verdict.map(|v| v.is_err()).unwrap_or(true) {
            continue;
        }
        ctx.numeric(Numeric::RplList, vec![name, member_count.to_string(), topic]);
    }
    ctx.numeric(Numeric::RplListEnd, vec!["End of /LIST".into()]);
    weight::NORMAL
}

/// `USERHOST <nick> [nick...]` — up to five nicks, one reply line.
fn handle_userhost(ctx: &mut CmdState, args: &[String]) -> i32 {
    let replies: Vec<String> = args
        .iter()
        .filter_map(|nick| {
            let id = ctx.graph.find_client_by_nick(nick)?;
            let c = ctx.graph.client(id)?;
            let oper_flag = if c.modes.contains(UserModes::OPER) { "*" } else { "" };
            let away_flag = if c.away.is_some() { '-' } else { '+' };
            Some(format!("{}{oper_flag}={away_flag}{}@{}", c.nick, c.user, c.host))
        })
        .collect();
    ctx.numeric(Numeric::RplUserHost, vec![replies.join(" ")]);
    weight::LOW
}

/// `SAMODE <channel> <modes> [args]` — an operator-only bypass of the
/// op/halfop gate `MODE` enforces; otherwise identical plumbing.
fn handle_samode(ctx: &mut CmdState, args: &[String]) -> i32 {
    let Some(client_id) = ctx.current_client() else { return weight::NONE };
    let target = &args[0];
    let Some(channel_id) = ctx.graph.find_channel(target) else {
        ctx.numeric(Numeric::ErrNoSuchChannel, vec![target.clone()]);
        return weight::LOW;
    };
    let mask = ctx.graph.client(client_id).map(|c| c.full_mask()).unwrap_or_default();
    let now = now_ts();

    let outcome = apply_channel_modes(
        &mut ctx.graph,
        channel_id,
        &mask,
        now,
        &args[1..],
        relayd_types::DEFAULT_MAX_MODES_PER_LINE,
        |_letter: ChanLetter, _plus: bool, _arg: Option<&str>| ModeCheck::Allow,
    );

    if let Ok(outcome) = outcome {
        if !outcome.unknown.is_empty() {
            ctx.numeric(Numeric::ErrUnknownMode, vec![outcome.unknown.iter().collect()]);
        }
        if !outcome.condensed.is_empty() {
            if outcome.condensed.contains(ChanLetter::Ban.letter()) {
                recount_channel_bans(&mut ctx.graph, channel_id);
            }
            let recipients = to_channel_local(&ctx.graph, channel_id, None);
            let mut mode_args = vec![target.clone()];
            mode_args.extend(outcome.condensed.split(' ').map(str::to_string));
            let msg = Message::new("MODE", mode_args).with_prefix(mask);
            ctx.send_to_clients(&recipients, &msg);
        }
    }
    weight::NORMAL
}

#[cfg(test)]
mod command_tests {
    use super::*;
    use relayd_dispatch::{CommandTable, DispatchOutcome};
    use relayd_hooks::EventBus;
    use relayd_state::{Rfc1459, StateGraph};
    use std::net::SocketAddr;

    struct Harness {
        table: CommandTable<CmdState>,
        bus: EventBus,
        state: CmdState,
    }

    impl Harness {
        fn new() -> Self {
            let mut table = CommandTable::new();
            register_builtins(&mut table).unwrap();
            let graph = StateGraph::new(Box::new(Rfc1459), "irc.example.net", "test server", 64);
            let state = CmdState::new(graph, "irc.example.net", Vec::new());
            Harness { table, bus: EventBus::new(), state }
        }

        /// Connects a fresh address and runs `NICK`/`USER` so the connection
        /// ends up a live, registered client, returning its id.
        fn register(&mut self, addr: &str, nick: &str) -> relayd_types::ClientId {
            let addr: SocketAddr = addr.parse().unwrap();
            self.state.conns.insert(addr, ConnMeta::new());
            self.send(addr, &format!("NICK {nick}"));
            self.send(addr, &format!("USER {nick} 0 * :{nick} Realname"));
            self.state.conns.get(&addr).and_then(|c| c.client).expect("registration completes")
        }

        fn send(&mut self, addr: SocketAddr, line: &str) -> DispatchOutcome {
            let parsed = relayd_proto::parse_line(line).unwrap();
            self.state.current = addr;
            let is_registered = self.state.conns.get(&addr).map(|c| c.is_registered()).unwrap_or(false);
            let is_operator = self
                .state
                .current_client()
                .and_then(|id| self.state.graph.client(id))
                .map(|c| c.modes.contains(UserModes::OPER))
                .unwrap_or(false);
            self.table.dispatch(&mut self.bus, &mut self.state, is_registered, is_operator, &parsed.command, &parsed.args)
        }

        fn drain_numerics_for(&mut self, addr: SocketAddr) -> Vec<Message> {
            let mut out = Vec::new();
            self.state.outputs.retain(|io| match io {
                relayd_reactor::Io::Write(a, bytes) if *a == addr => {
                    let text = String::from_utf8_lossy(bytes);
                    if let Ok(msg) = relayd_proto::parse_line(text.trim_end()) {
                        out.push(msg);
                    }
                    false
                }
                _ => true,
            });
            out
        }
    }

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    #[test]
    fn nick_and_user_complete_registration_with_a_welcome_numeric() {
        let mut h = Harness::new();
        let client_id = h.register("127.0.0.1:1001", "Alice");
        assert!(h.state.graph.client(client_id).is_some());
        let replies = h.drain_numerics_for(addr("127.0.0.1:1001"));
        assert!(replies.iter().any(|m| m.command == Numeric::RplWelcome.to_string()));
    }

    #[test]
    fn duplicate_nick_is_rejected_with_nicknameinuse() {
        let mut h = Harness::new();
        h.register("127.0.0.1:1001", "Alice");
        let a2 = addr("127.0.0.1:1002");
        h.state.conns.insert(a2, ConnMeta::new());
        h.send(a2, "NICK Alice");
        let replies = h.drain_numerics_for(a2);
        assert!(replies.iter().any(|m| m.command == Numeric::ErrNicknameInUse.to_string()));
    }

    /// spec.md S1: a ban set after two members have joined recounts the
    /// ban-match cache immediately, and the banned member's next PRIVMSG is
    /// rejected while the operator's own message still goes through.
    #[test]
    fn s1_ban_takes_effect_only_after_membership_recount() {
        let mut h = Harness::new();
        let _a = h.register("127.0.0.1:1001", "A");
        let _b = h.register("127.0.0.1:1002", "B");
        let addr_a = addr("127.0.0.1:1001");
        let addr_b = addr("127.0.0.1:1002");

        h.send(addr_a, "JOIN #t");
        h.send(addr_b, "JOIN #t");
        h.drain_numerics_for(addr_a);
        h.drain_numerics_for(addr_b);

        h.send(addr_a, "MODE #t +b *!*@127.0.0.1");
        let chan = h.state.graph.find_channel("#t").unwrap();
        let membership_b = h
            .state
            .graph
            .membership(h.state.graph.find_client_by_nick("B").unwrap(), chan)
            .unwrap();
        assert_eq!(membership_b.bans, 1);

        h.send(addr_b, "PRIVMSG #t :hi");
        let replies_b = h.drain_numerics_for(addr_b);
        assert!(replies_b.iter().any(|m| m.command == Numeric::ErrCannotSendToChan.to_string()));

        h.send(addr_a, "PRIVMSG #t :hi");
        let replies_a = h.drain_numerics_for(addr_a);
        assert!(!replies_a.iter().any(|m| m.command == Numeric::ErrCannotSendToChan.to_string()));
    }

    /// spec.md S4: an accepted invite bypasses `+i`/`+b`, is single-use, and
    /// forces the joining member's ban cache to zero.
    #[test]
    fn s4_invite_bypasses_ban_and_invite_only() {
        let mut h = Harness::new();
        let _op = h.register("127.0.0.1:1001", "O");
        let _u = h.register("127.0.0.1:1002", "U");
        let addr_op = addr("127.0.0.1:1001");
        let addr_u = addr("127.0.0.1:1002");

        h.send(addr_op, "JOIN #t");
        h.drain_numerics_for(addr_op);
        h.send(addr_op, "MODE #t +i");
        h.send(addr_op, "MODE #t +b *!*@127.0.0.1");
        h.drain_numerics_for(addr_op);

        h.send(addr_op, "INVITE U #t");
        h.drain_numerics_for(addr_op);

        h.send(addr_u, "JOIN #t");
        let replies_u = h.drain_numerics_for(addr_u);
        assert!(!replies_u.iter().any(|m| m.command == Numeric::ErrInviteOnlyChan.to_string()));
        assert!(!replies_u.iter().any(|m| m.command == Numeric::ErrBannedFromChan.to_string()));

        let chan = h.state.graph.find_channel("#t").unwrap();
        let u_id = h.state.graph.find_client_by_nick("U").unwrap();
        assert!(h.state.graph.membership(u_id, chan).is_some());
        assert_eq!(h.state.graph.membership(u_id, chan).unwrap().bans, 0);

        // The invite is single-use: a PART then re-JOIN without a fresh
        // invite is rejected again by `+i`.
        h.send(addr_u, "PART #t");
        h.drain_numerics_for(addr_u);
        h.send(addr_u, "JOIN #t");
        let replies_u2 = h.drain_numerics_for(addr_u);
        assert!(replies_u2.iter().any(|m| m.command == Numeric::ErrInviteOnlyChan.to_string()));
    }

    #[test]
    fn topic_lock_requires_op_and_unlocked_channel_accepts_from_anyone() {
        let mut h = Harness::new();
        let _op = h.register("127.0.0.1:1001", "O");
        let _u = h.register("127.0.0.1:1002", "U");
        let addr_op = addr("127.0.0.1:1001");
        let addr_u = addr("127.0.0.1:1002");
        h.send(addr_op, "JOIN #t");
        h.send(addr_u, "JOIN #t");
        h.drain_numerics_for(addr_op);
        h.drain_numerics_for(addr_u);

        h.send(addr_op, "MODE #t +t");
        h.drain_numerics_for(addr_op);

        h.send(addr_u, "TOPIC #t :hello from U");
        let replies_u = h.drain_numerics_for(addr_u);
        assert!(replies_u.iter().any(|m| m.command == Numeric::ErrChanOpPrivsNeeded.to_string()));

        h.send(addr_op, "TOPIC #t :hello from O");
        let chan = h.state.graph.find_channel("#t").unwrap();
        assert_eq!(
            h.state.graph.channel(chan).unwrap().topic.as_ref().map(|(t, _, _)| t.clone()),
            Some("hello from O".to_string())
        );
    }

    #[test]
    fn kick_requires_op_and_removes_membership() {
        let mut h = Harness::new();
        let _op = h.register("127.0.0.1:1001", "O");
        let _u = h.register("127.0.0.1:1002", "U");
        let addr_op = addr("127.0.0.1:1001");
        let addr_u = addr("127.0.0.1:1002");
        h.send(addr_op, "JOIN #t");
        h.send(addr_u, "JOIN #t");
        h.drain_numerics_for(addr_op);
        h.drain_numerics_for(addr_u);

        h.send(addr_u, "KICK #t O");
        let replies_u = h.drain_numerics_for(addr_u);
        assert!(replies_u.iter().any(|m| m.command == Numeric::ErrChanOpPrivsNeeded.to_string()));

        h.send(addr_op, "KICK #t U bye");
        let chan = h.state.graph.find_channel("#t").unwrap();
        let u_id = h.state.graph.find_client_by_nick("U").unwrap();
        assert!(h.state.graph.membership(u_id, chan).is_none());
    }

    #[test]
    fn privmsg_to_unknown_nick_yields_no_such_nick() {
        let mut h = Harness::new();
        let _a = h.register("127.0.0.1:1001", "A");
        let addr_a = addr("127.0.0.1:1001");
        h.send(addr_a, "PRIVMSG Ghost :hello?");
        let replies = h.drain_numerics_for(addr_a);
        assert!(replies.iter().any(|m| m.command == Numeric::ErrNoSuchNick.to_string()));
    }

    #[test]
    fn unknown_command_from_a_registered_client_yields_unknown_command() {
        let mut h = Harness::new();
        let _a = h.register("127.0.0.1:1001", "A");
        let addr_a = addr("127.0.0.1:1001");
        let outcome = h.send(addr_a, "XYZZY foo");
        assert!(matches!(outcome, DispatchOutcome::Error(Numeric::ErrUnknownCommand)));
    }
}
