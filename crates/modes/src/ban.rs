use relayd_state::{Ban, Client, StateGraph};
use relayd_types::ChannelId;

use crate::glob::glob_match;

/// Does `ban` match `client`? Tested `nick` then `user`, then the host in
/// three passes — glob against the display host, a literal match against
/// the numeric IP, glob against the pre-mask original host — any one of
/// which is enough.
pub fn ban_matches(ban: &Ban, client: &Client) -> bool {
    glob_match(&ban.nick, &client.nick)
        && glob_match(&ban.user, &client.user)
        && (glob_match(&ban.host, &client.host)
            || glob_match(&ban.host, &client.ip.to_string())
            || glob_match(&ban.host, &client.orighost))
}

/// Recomputes `clp->bans` for one membership: the count of the channel's
/// bans that match this client. Callers invoke this after
/// any ban-list change or on join so a later `PRIVMSG` need not rescan.
pub fn count_matching_bans(bans: &[Ban], client: &Client) -> usize {
    bans.iter().filter(|b| ban_matches(b, client)).count()
}

/// Recomputes every member's cached `clp->bans` count for one channel.
/// Callers run this after a `MODE +b`/`-b` that actually changed the ban
/// list, and on `JOIN`, so `can_send_channel` never has to rescan.
pub fn recount_channel_bans(graph: &mut StateGraph, channel_id: ChannelId) {
    let Some(channel) = graph.channel(channel_id) else { return };
    let members = channel.members.clone();
    let bans = channel.bans.clone();
    for member in members {
        let count = graph.client(member).map(|c| count_matching_bans(&bans, c)).unwrap_or(0);
        if let Some(m) = graph.membership_mut(member, channel_id) {
            m.bans = count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayd_state::BanKind;
    use relayd_types::Ts;
    use std::net::{IpAddr, Ipv4Addr};

    fn client(nick: &str, user: &str, host: &str) -> Client {
        Client::new(nick, user, host, IpAddr::V4(Ipv4Addr::LOCALHOST), "i", relayd_types::ServerId::from_raw(0), Ts(1), Ts(1))
    }

    fn ban(host: &str) -> Ban {
        Ban {
            nick: "*".into(),
            user: "*".into(),
            host: host.into(),
            who: "op".into(),
            when: Ts(1),
            kind: BanKind::Ban,
        }
    }

    #[test]
    fn ban_on_host_matches_only_the_targeted_client() {
        // clients A!u@h1, B!u@h2; `MODE #t +b *!*@h2` matches only B.
        let a = client("A", "u", "h1");
        let b = client("B", "u", "h2");
        let b1 = ban("h2");
        assert_eq!(count_matching_bans(&[b1.clone()], &a), 0);
        assert_eq!(count_matching_bans(&[b1], &b), 1);
    }

    #[test]
    fn ban_falls_back_to_orighost_when_display_host_is_masked() {
        let mut c = client("n", "u", "cloaked.example");
        c.orighost = "real.example".into();
        let b = ban("real.example");
        assert_eq!(count_matching_bans(&[b], &c), 1);
    }

    #[test]
    fn recount_updates_only_the_matching_members_cache() {
        let mut g = StateGraph::new(Box::new(relayd_state::Rfc1459), "here", "test server", 64);
        let server = g.self_server();
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let a = g.create_client("A", "u", "h1", ip, "i", server, Ts(1), Ts(1)).unwrap();
        let b = g.create_client("B", "u", "h2", ip, "i", server, Ts(1), Ts(1)).unwrap();
        let chan = g.find_or_create_channel("#t", Ts(1000));
        g.join_channel(a, chan).unwrap();
        g.join_channel(b, chan).unwrap();
        assert_eq!(g.membership(a, chan).unwrap().bans, 0);

        g.add_ban(chan, ban("h2")).unwrap();
        recount_channel_bans(&mut g, chan);

        assert_eq!(g.membership(a, chan).unwrap().bans, 0);
        assert_eq!(g.membership(b, chan).unwrap().bans, 1);
    }
}
