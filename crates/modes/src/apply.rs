use relayd_state::{Ban, BanKind, StateGraph};
use relayd_types::{ChannelId, ClientId, Ts};

use crate::class::{ChanLetter, ModeClass};
use crate::error::Error;

/// Verdict a permission callback returns for one candidate letter.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ModeCheck {
    Allow,
    Deny,
    Unknown,
}

/// Result of folding a `MODE <chan> <...>` command over the channel.
#[derive(Default, Debug)]
pub struct ChanModeOutcome {
    /// The condensed mode string actually applied, e.g. `"+ov-b nick *!*@h2"`,
    /// empty if nothing changed. This is what gets relayed to the channel
    /// and to peer servers, not the client's original (possibly messier)
    /// input line.
    pub condensed: String,
    pub unknown: Vec<char>,
    pub no_permission: Vec<char>,
}

enum Applied {
    NoOp,
    Flag,
    WithArg(String),
}

/// Splits a ban/except mask into its three glob components, defaulting the
/// parts a bare nick or `user@host` fragment omits to `*`.
fn split_mask(mask: &str) -> (String, String, String) {
    let (nick, rest) = match mask.split_once('!') {
        Some((n, r)) => (n, r),
        None => ("*", mask),
    };
    let (user, host) = match rest.split_once('@') {
        Some((u, h)) => (u, h),
        None => ("*", rest),
    };
    let nick = if nick.is_empty() { "*" } else { nick };
    let user = if user.is_empty() { "*" } else { user };
    let host = if host.is_empty() { "*" } else { host };
    (nick.to_string(), user.to_string(), host.to_string())
}

fn apply_one(
    graph: &mut StateGraph,
    channel_id: ChannelId,
    setter_mask: &str,
    when: Ts,
    letter: ChanLetter,
    plus: bool,
    arg: Option<&str>,
) -> Result<Applied, Error> {
    match letter.class() {
        ModeClass::Flag => {
            let bit = letter.flag_bit().expect("flag class always has a flag bit");
            let chan = graph.channel_mut(channel_id).ok_or(Error::NoSuchChannel)?;
            let had = chan.modes.contains(bit);
            if plus == had {
                return Ok(Applied::NoOp);
            }
            if plus {
                chan.modes.set(bit);
            } else {
                chan.modes.unset(bit);
            }
            Ok(Applied::Flag)
        }
        ModeClass::Param => {
            let arg = arg.ok_or_else(|| Error::InvalidArgument(String::new()))?;
            let chan = graph.channel_mut(channel_id).ok_or(Error::NoSuchChannel)?;
            if plus {
                if chan.key.as_deref() == Some(arg) {
                    return Ok(Applied::NoOp);
                }
                chan.key = Some(arg.to_string());
            } else {
                if chan.key.is_none() {
                    return Ok(Applied::NoOp);
                }
                chan.key = None;
            }
            Ok(Applied::WithArg(arg.to_string()))
        }
        ModeClass::ParamOnSet => {
            let chan = graph.channel_mut(channel_id).ok_or(Error::NoSuchChannel)?;
            if plus {
                let arg = arg.ok_or_else(|| Error::InvalidArgument(String::new()))?;
                let limit: u32 = arg
                    .parse()
                    .map_err(|_| Error::InvalidArgument(arg.to_string()))?;
                if chan.limit == Some(limit) {
                    return Ok(Applied::NoOp);
                }
                chan.limit = Some(limit);
                Ok(Applied::WithArg(limit.to_string()))
            } else {
                if chan.limit.is_none() {
                    return Ok(Applied::NoOp);
                }
                chan.limit = None;
                Ok(Applied::Flag)
            }
        }
        ModeClass::List => {
            let mask = arg.ok_or_else(|| Error::InvalidArgument(String::new()))?;
            if plus {
                let (nick, user, host) = split_mask(mask);
                let canon = format!("{nick}!{user}@{host}");
                let ban = Ban {
                    nick,
                    user,
                    host,
                    who: setter_mask.to_string(),
                    when,
                    kind: BanKind::Ban,
                };
                match graph.add_ban(channel_id, ban) {
                    Ok(()) => Ok(Applied::WithArg(canon)),
                    Err(relayd_state::Error::BanListFull(_)) => Ok(Applied::NoOp),
                    Err(e) => Err(e.into()),
                }
            } else if graph.remove_ban(channel_id, mask) {
                Ok(Applied::WithArg(mask.to_string()))
            } else {
                Ok(Applied::NoOp)
            }
        }
        ModeClass::Prefix => {
            let nick = arg.ok_or_else(|| Error::InvalidArgument(String::new()))?;
            let target = graph
                .find_client_by_nick(nick)
                .ok_or_else(|| Error::NoSuchNick(nick.to_string()))?;
            let bit = letter.prefix_bit().expect("prefix class always has a prefix bit");
            let membership = graph
                .membership_mut(target, channel_id)
                .ok_or(Error::NotMember)?;
            let had = membership.flags.contains(bit);
            if plus == had {
                return Ok(Applied::NoOp);
            }
            if plus {
                membership.flags.set(bit);
            } else {
                membership.flags.unset(bit);
            }
            Ok(Applied::WithArg(nick.to_string()))
        }
    }
}

/// Folds a `MODE <chan> <modestring> [args...]` command over `channel_id`.
///
/// `args[0]` is the mode string (`+o-b`-style); `args[1..]` are positional
/// arguments consumed left to right as class-A/B/PREFIX letters (and class-C
/// letters on set) are encountered. `permission` is asked once per
/// recognised letter, before it is applied, and may inspect the argument
/// (e.g. to resolve the target nick for a PREFIX letter). At most
/// `max_modes` letters are applied; anything past that cap is silently
/// dropped, matching local-client `MAXMODES` truncation.
pub fn apply_channel_modes<F>(
    graph: &mut StateGraph,
    channel_id: ChannelId,
    setter_mask: &str,
    when: Ts,
    args: &[String],
    max_modes: usize,
    mut permission: F,
) -> Result<ChanModeOutcome, Error>
where
    F: FnMut(ChanLetter, bool, Option<&str>) -> ModeCheck,
{
    let mut outcome = ChanModeOutcome::default();
    let Some(modestring) = args.first() else {
        return Ok(outcome);
    };

    let mut extra = args[1..].iter();
    let mut plus = true;
    let mut applied_count = 0usize;
    let mut condensed = String::new();
    let mut condensed_args: Vec<String> = Vec::new();
    let mut last_sign: Option<bool> = None;

    for c in modestring.chars() {
        if c == '+' {
            plus = true;
            continue;
        }
        if c == '-' {
            plus = false;
            continue;
        }
        if applied_count >= max_modes {
            break;
        }

        let Some(letter) = ChanLetter::from_char(c) else {
            outcome.unknown.push(c);
            continue;
        };

        let arg_needed = match letter.class() {
            ModeClass::List | ModeClass::Param | ModeClass::Prefix => true,
            ModeClass::ParamOnSet => plus,
            ModeClass::Flag => false,
        };
        let arg = if arg_needed {
            match extra.next() {
                Some(a) => Some(a.as_str()),
                None => continue,
            }
        } else {
            None
        };

        match permission(letter, plus, arg) {
            ModeCheck::Unknown => {
                outcome.unknown.push(c);
                continue;
            }
            ModeCheck::Deny => {
                outcome.no_permission.push(c);
                continue;
            }
            ModeCheck::Allow => {}
        }

        let applied = apply_one(graph, channel_id, setter_mask, when, letter, plus, arg)?;
        let echoed_arg = match applied {
            Applied::NoOp => continue,
            Applied::Flag => None,
            Applied::WithArg(a) => Some(a),
        };

        if last_sign != Some(plus) {
            condensed.push(if plus { '+' } else { '-' });
            last_sign = Some(plus);
        }
        condensed.push(c);
        if let Some(a) = echoed_arg {
            condensed_args.push(a);
        }
        applied_count += 1;
    }

    outcome.condensed = if condensed.is_empty() {
        String::new()
    } else if condensed_args.is_empty() {
        condensed
    } else {
        format!("{condensed} {}", condensed_args.join(" "))
    };
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayd_state::StateGraph;
    use std::net::{IpAddr, Ipv4Addr};

    fn graph() -> StateGraph {
        StateGraph::new(Box::new(relayd_state::Rfc1459), "here", "test server", 64)
    }

    fn add_client(graph: &mut StateGraph, nick: &str) -> ClientId {
        graph
            .create_client(
                nick,
                "u",
                "host",
                IpAddr::V4(Ipv4Addr::LOCALHOST),
                "info",
                graph.self_server(),
                Ts(1),
                Ts(1),
            )
            .unwrap()
    }

    #[test]
    fn plus_b_then_minus_b_round_trips_the_ban_list() {
        let mut g = graph();
        let chan = g.find_or_create_channel("#t", Ts(1));
        let outcome = apply_channel_modes(
            &mut g,
            chan,
            "op!u@host",
            Ts(2),
            &["+b".into(), "*!*@h2".into()],
            6,
            |_, _, _| ModeCheck::Allow,
        )
        .unwrap();
        assert_eq!(outcome.condensed, "+b *!*@h2");
        assert_eq!(g.channel(chan).unwrap().bans.len(), 1);

        let outcome = apply_channel_modes(
            &mut g,
            chan,
            "op!u@host",
            Ts(3),
            &["-b".into(), "*!*@h2".into()],
            6,
            |_, _, _| ModeCheck::Allow,
        )
        .unwrap();
        assert_eq!(outcome.condensed, "-b *!*@h2");
        assert!(g.channel(chan).unwrap().bans.is_empty());
    }

    #[test]
    fn denied_and_unknown_letters_land_in_their_own_buckets_and_do_not_apply() {
        let mut g = graph();
        let chan = g.find_or_create_channel("#t", Ts(1));
        let outcome = apply_channel_modes(
            &mut g,
            chan,
            "op!u@host",
            Ts(2),
            &["+mZs".into()],
            6,
            |letter, _, _| {
                if letter == ChanLetter::Secret {
                    ModeCheck::Deny
                } else {
                    ModeCheck::Allow
                }
            },
        )
        .unwrap();
        assert_eq!(outcome.condensed, "+m");
        assert_eq!(outcome.unknown, vec!['Z']);
        assert_eq!(outcome.no_permission, vec!['s']);
    }

    #[test]
    fn excess_modes_past_the_per_line_cap_are_dropped_silently() {
        let mut g = graph();
        let chan = g.find_or_create_channel("#t", Ts(1));
        let outcome = apply_channel_modes(
            &mut g,
            chan,
            "op!u@host",
            Ts(2),
            &["+mnst".into()],
            2,
            |_, _, _| ModeCheck::Allow,
        )
        .unwrap();
        assert_eq!(outcome.condensed, "+mn");
        assert!(outcome.unknown.is_empty());
        assert!(outcome.no_permission.is_empty());
    }

    #[test]
    fn prefix_mode_resolves_the_target_nick_and_flips_membership_flags() {
        let mut g = graph();
        let chan = g.find_or_create_channel("#t", Ts(1));
        let alice = add_client(&mut g, "alice");
        g.join_channel(alice, chan).unwrap();

        let outcome = apply_channel_modes(
            &mut g,
            chan,
            "op!u@host",
            Ts(2),
            &["+o".into(), "alice".into()],
            6,
            |_, _, _| ModeCheck::Allow,
        )
        .unwrap();
        assert_eq!(outcome.condensed, "+o alice");
        assert!(g.membership(alice, chan).unwrap().flags.contains(relayd_state::PrefixFlags::OP));
    }

    #[test]
    fn a_no_op_toggle_applies_cleanly_without_appearing_in_the_condensed_string() {
        let mut g = graph();
        let chan = g.find_or_create_channel("#t", Ts(1));
        let outcome = apply_channel_modes(
            &mut g,
            chan,
            "op!u@host",
            Ts(2),
            &["-m".into()],
            6,
            |_, _, _| ModeCheck::Allow,
        )
        .unwrap();
        assert_eq!(outcome.condensed, "");
    }
}
