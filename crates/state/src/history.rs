use std::collections::VecDeque;
use std::net::IpAddr;

use relayd_types::Ts;

/// A snapshot of a client's identity at the moment it vanished, indexed by
/// nickname so commands chasing a recently-renamed/quit nick can recover
/// the last known identity.
#[derive(Clone, Debug)]
pub struct WhowasEntry {
    pub nick: String,
    pub user: String,
    pub host: String,
    pub orighost: String,
    pub ip: IpAddr,
    pub info: String,
    pub server_name: String,
    pub signoff: Ts,
}

/// A bounded ring of [`WhowasEntry`] records, newest first on lookup.
pub struct WhowasRing {
    capacity: usize,
    entries: VecDeque<WhowasEntry>,
}

impl WhowasRing {
    pub fn new(capacity: usize) -> Self {
        WhowasRing {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, entry: WhowasEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(entry);
    }

    /// Every recorded identity for `nick`, case-insensitively, most recent
    /// first — the basis for "chasing" a vanished client by its last known
    /// nick.
    pub fn find_by_nick<'a>(
        &'a self,
        nick: &'a str,
        eq: &'a dyn Fn(&str, &str) -> bool,
    ) -> impl Iterator<Item = &'a WhowasEntry> + 'a {
        self.entries.iter().filter(move |e| eq(&e.nick, nick))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn entry(nick: &str, signoff: i64) -> WhowasEntry {
        WhowasEntry {
            nick: nick.to_string(),
            user: "u".into(),
            host: "h".into(),
            orighost: "h".into(),
            ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            info: String::new(),
            server_name: "irc.example.net".into(),
            signoff: Ts(signoff),
        }
    }

    #[test]
    fn ring_evicts_oldest_past_capacity() {
        let mut ring = WhowasRing::new(2);
        ring.push(entry("a", 1));
        ring.push(entry("b", 2));
        ring.push(entry("c", 3));
        assert_eq!(ring.len(), 2);
        let found: Vec<_> = ring.find_by_nick("a", &|a, b| a == b).collect();
        assert!(found.is_empty(), "oldest entry must have been evicted");
    }

    #[test]
    fn lookup_returns_most_recent_first() {
        let mut ring = WhowasRing::new(5);
        ring.push(entry("nick", 1));
        ring.push(entry("nick", 2));
        let found: Vec<_> = ring.find_by_nick("nick", &|a, b| a == b).collect();
        assert_eq!(found[0].signoff, Ts(2));
        assert_eq!(found[1].signoff, Ts(1));
    }
}
