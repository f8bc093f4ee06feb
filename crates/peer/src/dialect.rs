use std::net::IpAddr;

use relayd_proto::Message;
use relayd_state::PeerCaps;
use relayd_types::Ts;

use crate::error::Error;

/// What a `NICK` introduction (client or peer-relayed) carries, independent
/// of which dialect put it on the wire (argument layout and IP encoding vary).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NickIntro {
    pub nick: String,
    pub hops: u32,
    pub ts: Ts,
    pub user: String,
    pub host: String,
    pub server: String,
    pub ip: Option<IpAddr>,
    pub info: String,
}

/// A table-driven peer-protocol adapter. New dialects are new
/// table entries, not subclasses. `burst` itself lives in
/// [`crate::burst`] parameterized over `&dyn Dialect`, not as a trait
/// method, since it needs the whole state graph rather than just
/// per-message formatting.
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;
    fn caps(&self) -> PeerCaps;

    fn serialize_nick(&self, intro: &NickIntro) -> Message;
    fn parse_nick(&self, msg: &Message) -> Result<NickIntro, Error>;

    fn sends_tsmode(&self) -> bool {
        self.caps().contains(PeerCaps::TSMODE)
    }
    fn supports_sjoin(&self) -> bool {
        self.caps().contains(PeerCaps::SJOIN)
    }
    fn sends_noquit(&self) -> bool {
        self.caps().contains(PeerCaps::NOQUIT)
    }

    /// The `CAPAB`-style banner sent on an outbound link so the far side
    /// learns our capability set.
    fn banner(&self) -> Message {
        Message::new("CAPAB", vec![cap_names(self.caps()).join(" ")])
    }
}

fn cap_names(caps: PeerCaps) -> Vec<&'static str> {
    let mut names = Vec::new();
    if caps.contains(PeerCaps::TS) {
        names.push("TS");
    }
    if caps.contains(PeerCaps::TSMODE) {
        names.push("TSMODE");
    }
    if caps.contains(PeerCaps::SJOIN) {
        names.push("SJOIN");
    }
    if caps.contains(PeerCaps::NOQUIT) {
        names.push("NOQUIT");
    }
    if caps.contains(PeerCaps::ATTR) {
        names.push("ATTR");
    }
    if caps.contains(PeerCaps::SHORTAKILL) {
        names.push("SHORTAKILL");
    }
    names
}

fn arg(msg: &Message, n: usize, what: &str) -> Result<String, Error> {
    msg.arg(n)
        .map(str::to_string)
        .ok_or_else(|| Error::MalformedNick(format!("missing {what}")))
}

fn parse_ts(s: &str) -> Result<Ts, Error> {
    s.parse::<i64>()
        .map(Ts)
        .map_err(|_| Error::MalformedNick(format!("bad timestamp {s:?}")))
}

fn parse_hops(s: &str) -> Result<u32, Error> {
    s.parse::<u32>()
        .map_err(|_| Error::MalformedNick(format!("bad hop count {s:?}")))
}

/// Our own dialect: exposes every capability, with an IP field on the
/// `NICK` introduction that older dialects lack.
pub struct Ithildin1;

impl Dialect for Ithildin1 {
    fn name(&self) -> &'static str {
        "ithildin1"
    }
    fn caps(&self) -> PeerCaps {
        PeerCaps::ALL
    }
    fn serialize_nick(&self, intro: &NickIntro) -> Message {
        Message::new(
            "NICK",
            vec![
                intro.nick.clone(),
                intro.hops.to_string(),
                intro.ts.0.to_string(),
                intro.user.clone(),
                intro.host.clone(),
                intro.server.clone(),
                intro.ip.map(|ip| ip.to_string()).unwrap_or_else(|| "0".into()),
                intro.info.clone(),
            ],
        )
    }
    fn parse_nick(&self, msg: &Message) -> Result<NickIntro, Error> {
        Ok(NickIntro {
            nick: arg(msg, 0, "nick")?,
            hops: parse_hops(&arg(msg, 1, "hops")?)?,
            ts: parse_ts(&arg(msg, 2, "ts")?)?,
            user: arg(msg, 3, "user")?,
            host: arg(msg, 4, "host")?,
            server: arg(msg, 5, "server")?,
            ip: arg(msg, 6, "ip")?.parse().ok(),
            info: arg(msg, 7, "info")?,
        })
    }
}

/// `NICK nick hops ts umode user host server ip 0 :info` — the fullest
/// legacy layout, including a numeric IP field.
pub struct Bahamut14;

impl Dialect for Bahamut14 {
    fn name(&self) -> &'static str {
        "bahamut14"
    }
    fn caps(&self) -> PeerCaps {
        PeerCaps::TS | PeerCaps::TSMODE | PeerCaps::SJOIN | PeerCaps::NOQUIT | PeerCaps::SHORTAKILL
    }
    fn serialize_nick(&self, intro: &NickIntro) -> Message {
        Message::new(
            "NICK",
            vec![
                intro.nick.clone(),
                intro.hops.to_string(),
                intro.ts.0.to_string(),
                "+".to_string(),
                intro.user.clone(),
                intro.host.clone(),
                intro.server.clone(),
                intro.ip.map(|ip| ip.to_string()).unwrap_or_else(|| "0".into()),
                "0".to_string(),
                intro.info.clone(),
            ],
        )
    }
    fn parse_nick(&self, msg: &Message) -> Result<NickIntro, Error> {
        Ok(NickIntro {
            nick: arg(msg, 0, "nick")?,
            hops: parse_hops(&arg(msg, 1, "hops")?)?,
            ts: parse_ts(&arg(msg, 2, "ts")?)?,
            user: arg(msg, 4, "user")?,
            host: arg(msg, 5, "host")?,
            server: arg(msg, 6, "server")?,
            ip: arg(msg, 7, "ip")?.parse().ok(),
            info: arg(msg, 9, "info")?,
        })
    }
}

/// `NICK nick hops ts user host server 0 :info` — no user-mode field, no IP.
pub struct Dreamforge;

impl Dialect for Dreamforge {
    fn name(&self) -> &'static str {
        "dreamforge"
    }
    fn caps(&self) -> PeerCaps {
        PeerCaps::TS | PeerCaps::TSMODE
    }
    fn serialize_nick(&self, intro: &NickIntro) -> Message {
        Message::new(
            "NICK",
            vec![
                intro.nick.clone(),
                intro.hops.to_string(),
                intro.ts.0.to_string(),
                intro.user.clone(),
                intro.host.clone(),
                intro.server.clone(),
                "0".to_string(),
                intro.info.clone(),
            ],
        )
    }
    fn parse_nick(&self, msg: &Message) -> Result<NickIntro, Error> {
        Ok(NickIntro {
            nick: arg(msg, 0, "nick")?,
            hops: parse_hops(&arg(msg, 1, "hops")?)?,
            ts: parse_ts(&arg(msg, 2, "ts")?)?,
            user: arg(msg, 3, "user")?,
            host: arg(msg, 4, "host")?,
            server: arg(msg, 5, "server")?,
            ip: None,
            info: arg(msg, 7, "info")?,
        })
    }
}

/// The plain RFC 1459 baseline with no timestamp channel at all: `NICK
/// nick hops ts user host server :info`. A peer speaking this dialect is
/// always treated as lacking TS and not master in the conflict resolver;
/// there is no `CAPAB` banner because the base protocol predates
/// capability negotiation.
pub struct Rfc1459Peer;

impl Dialect for Rfc1459Peer {
    fn name(&self) -> &'static str {
        "rfc1459"
    }
    fn caps(&self) -> PeerCaps {
        PeerCaps::NONE
    }
    fn serialize_nick(&self, intro: &NickIntro) -> Message {
        Message::new(
            "NICK",
            vec![
                intro.nick.clone(),
                intro.hops.to_string(),
                intro.ts.0.to_string(),
                intro.user.clone(),
                intro.host.clone(),
                intro.server.clone(),
                intro.info.clone(),
            ],
        )
    }
    fn parse_nick(&self, msg: &Message) -> Result<NickIntro, Error> {
        Ok(NickIntro {
            nick: arg(msg, 0, "nick")?,
            hops: parse_hops(&arg(msg, 1, "hops")?)?,
            ts: parse_ts(&arg(msg, 2, "ts")?)?,
            user: arg(msg, 3, "user")?,
            host: arg(msg, 4, "host")?,
            server: arg(msg, 5, "server")?,
            ip: None,
            info: arg(msg, 6, "info")?,
        })
    }
}
