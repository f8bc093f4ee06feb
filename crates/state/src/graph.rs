use std::collections::HashMap;
use std::net::IpAddr;

use slab::Slab;

use relayd_types::{ChannelId, ClientId, ServerId, Ts, MAX_BANS_PER_CHANNEL};

use crate::casemap::CaseMap;
use crate::channel::{Ban, Channel};
use crate::client::Client;
use crate::error::Error;
use crate::history::{WhowasEntry, WhowasRing};
use crate::membership::Membership;
use crate::server::Server;

/// The whole in-memory IRC graph: clients, channels, servers, membership
/// edges, and the indexes over them. Arena-backed: entities live in slab
/// allocators keyed by small integer ids, and cross-references are ids,
/// never borrowed references, so the graph has no self-referential
/// lifetime problems despite the cyclic logical shape.
pub struct StateGraph {
    casemap: Box<dyn CaseMap>,
    clients: Slab<Client>,
    channels: Slab<Channel>,
    servers: Slab<Server>,
    memberships: HashMap<(ClientId, ChannelId), Membership>,

    nick_index: HashMap<String, ClientId>,
    channel_index: HashMap<String, ChannelId>,
    server_index: HashMap<String, ServerId>,
    by_server: HashMap<ServerId, Vec<ClientId>>,

    self_server: ServerId,
    whowas: WhowasRing,
}

impl StateGraph {
    pub fn new(
        casemap: Box<dyn CaseMap>,
        self_name: impl Into<String>,
        self_info: impl Into<String>,
        whowas_capacity: usize,
    ) -> Self {
        let self_name = self_name.into();
        let mut servers = Slab::new();
        let self_id = ServerId::from_raw(servers.insert(Server::new_self(self_name.clone(), self_info)));
        let mut server_index = HashMap::new();
        server_index.insert(self_name, self_id);

        StateGraph {
            casemap,
            clients: Slab::new(),
            channels: Slab::new(),
            servers,
            memberships: HashMap::new(),
            nick_index: HashMap::new(),
            channel_index: HashMap::new(),
            server_index,
            by_server: HashMap::new(),
            self_server: self_id,
            whowas: WhowasRing::new(whowas_capacity),
        }
    }

    pub fn self_server(&self) -> ServerId {
        self.self_server
    }

    pub fn case_fold(&self, s: &str) -> String {
        self.casemap.fold(s)
    }

    pub fn case_eq(&self, a: &str, b: &str) -> bool {
        self.casemap.eq(a, b)
    }

    // ---- servers -------------------------------------------------------

    pub fn create_server(&mut self, server: Server) -> ServerId {
        let name = server.name.clone();
        let id = ServerId::from_raw(self.servers.insert(server));
        self.server_index.insert(name, id);
        id
    }

    pub fn server(&self, id: ServerId) -> Option<&Server> {
        self.servers.get(id.raw())
    }

    pub fn server_mut(&mut self, id: ServerId) -> Option<&mut Server> {
        self.servers.get_mut(id.raw())
    }

    pub fn find_server(&self, name: &str) -> Option<ServerId> {
        self.server_index.get(name).copied()
    }

    /// Every known server, local and remote, in slab order.
    pub fn servers(&self) -> impl Iterator<Item = ServerId> + '_ {
        self.servers.iter().map(|(raw, _)| ServerId::from_raw(raw))
    }

    /// Removes a server and every client still attached to it.
    pub fn remove_server(&mut self, id: ServerId, when: Ts) -> Vec<ClientId> {
        let removed_clients: Vec<ClientId> =
            self.by_server.get(&id).cloned().unwrap_or_default();
        for client_id in &removed_clients {
            let _ = self.remove_client(*client_id, when);
        }
        if let Some(server) = self.servers.try_remove(id.raw()) {
            self.server_index.remove(&server.name);
        }
        self.by_server.remove(&id);
        removed_clients
    }

    // ---- clients ---------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn create_client(
        &mut self,
        nick: impl Into<String>,
        user: impl Into<String>,
        host: impl Into<String>,
        ip: IpAddr,
        info: impl Into<String>,
        server: ServerId,
        signon: Ts,
        ts: Ts,
    ) -> Result<ClientId, Error> {
        let nick = nick.into();
        let folded = self.casemap.fold(&nick);
        if self.nick_index.contains_key(&folded) {
            return Err(Error::NickInUse(nick));
        }
        let client = Client::new(nick, user, host, ip, info, server, signon, ts);
        let id = ClientId::from_raw(self.clients.insert(client));
        self.nick_index.insert(folded, id);
        self.by_server.entry(server).or_default().push(id);
        Ok(id)
    }

    pub fn client(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(id.raw())
    }

    pub fn client_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.get_mut(id.raw())
    }

    pub fn find_client_by_nick(&self, nick: &str) -> Option<ClientId> {
        self.nick_index.get(&self.casemap.fold(nick)).copied()
    }

    pub fn clients_on_server(&self, server: ServerId) -> &[ClientId] {
        self.by_server.get(&server).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Every live client, local and remote, in slab order (used by `WHO`/
    /// `LIST`-adjacent commands that need to scan the whole graph rather
    /// than one server's or one channel's subset).
    pub fn clients(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.clients.iter().map(|(raw, _)| ClientId::from_raw(raw))
    }

    /// Renames a client's nick in the index. Rejects a collision with a
    /// *different* live client; the caller (peer collision resolver)
    /// decides what happens to the loser before calling this.
    pub fn rename_client(&mut self, id: ClientId, new_nick: impl Into<String>) -> Result<(), Error> {
        let new_nick = new_nick.into();
        let new_folded = self.casemap.fold(&new_nick);
        if let Some(&existing) = self.nick_index.get(&new_folded) {
            if existing != id {
                return Err(Error::NickInUse(new_nick));
            }
        }
        let client = self.clients.get_mut(id.raw()).ok_or(Error::NoSuchClient(id))?;
        let old_folded = self.casemap.fold(&client.nick);
        self.nick_index.remove(&old_folded);
        client.nick = new_nick;
        self.nick_index.insert(new_folded, id);
        Ok(())
    }

    /// Removes a client from every index, every channel it was in, and its
    /// owning server's list, archiving its identity into [`WhowasRing`].
    pub fn remove_client(&mut self, id: ClientId, when: Ts) -> Result<Client, Error> {
        let client = self.clients.try_remove(id.raw()).ok_or(Error::NoSuchClient(id))?;

        let folded = self.casemap.fold(&client.nick);
        self.nick_index.remove(&folded);

        if let Some(list) = self.by_server.get_mut(&client.server) {
            list.retain(|&c| c != id);
        }

        for &channel_id in &client.channels {
            if let Some(channel) = self.channels.get_mut(channel_id.raw()) {
                channel.members.retain(|&c| c != id);
            }
            self.memberships.remove(&(id, channel_id));
        }

        let server_name = self
            .servers
            .get(client.server.raw())
            .map(|s| s.name.clone())
            .unwrap_or_default();
        self.whowas.push(WhowasEntry {
            nick: client.nick.clone(),
            user: client.user.clone(),
            host: client.host.clone(),
            orighost: client.orighost.clone(),
            ip: client.ip,
            info: client.info.clone(),
            server_name,
            signoff: when,
        });

        Ok(client)
    }

    pub fn whowas(&self) -> &WhowasRing {
        &self.whowas
    }

    // ---- channels ----------------------------------------------------

    pub fn find_channel(&self, name: &str) -> Option<ChannelId> {
        self.channel_index.get(&self.casemap.fold(name)).copied()
    }

    /// Every live channel, in slab order (used by peer burst).
    pub fn channels(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.channels.iter().map(|(raw, _)| ChannelId::from_raw(raw))
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(id.raw())
    }

    pub fn channel_mut(&mut self, id: ChannelId) -> Option<&mut Channel> {
        self.channels.get_mut(id.raw())
    }

    /// Finds an existing channel or creates an empty one with the given
    /// creation timestamp.
    pub fn find_or_create_channel(&mut self, name: &str, created: Ts) -> ChannelId {
        if let Some(id) = self.find_channel(name) {
            return id;
        }
        let folded = self.casemap.fold(name);
        let id = ChannelId::from_raw(self.channels.insert(Channel::new(name, created)));
        self.channel_index.insert(folded, id);
        id
    }

    /// Destroys a channel with no members left, as the protocol layer does
    /// immediately after the last `PART`/`KICK`/quit empties it.
    pub fn destroy_channel_if_empty(&mut self, id: ChannelId) -> bool {
        let Some(channel) = self.channels.get(id.raw()) else {
            return false;
        };
        if !channel.members.is_empty() {
            return false;
        }
        let name = channel.name.clone();
        self.channels.remove(id.raw());
        self.channel_index.remove(&self.casemap.fold(&name));
        true
    }

    // ---- membership ---------------------------------------------------

    pub fn join_channel(&mut self, client_id: ClientId, channel_id: ChannelId) -> Result<(), Error> {
        if self.memberships.contains_key(&(client_id, channel_id)) {
            return Err(Error::AlreadyMember);
        }
        let client = self.clients.get_mut(client_id.raw()).ok_or(Error::NoSuchClient(client_id))?;
        client.channels.push(channel_id);
        let channel = self
            .channels
            .get_mut(channel_id.raw())
            .ok_or(Error::NoSuchChannel(channel_id))?;
        channel.members.push(client_id);
        self.memberships
            .insert((client_id, channel_id), Membership::new(client_id, channel_id));
        Ok(())
    }

    pub fn part_channel(&mut self, client_id: ClientId, channel_id: ChannelId) -> Result<Membership, Error> {
        let membership = self
            .memberships
            .remove(&(client_id, channel_id))
            .ok_or(Error::NotMember)?;
        if let Some(client) = self.clients.get_mut(client_id.raw()) {
            client.channels.retain(|&c| c != channel_id);
        }
        if let Some(channel) = self.channels.get_mut(channel_id.raw()) {
            channel.members.retain(|&c| c != client_id);
        }
        Ok(membership)
    }

    pub fn membership(&self, client_id: ClientId, channel_id: ChannelId) -> Option<&Membership> {
        self.memberships.get(&(client_id, channel_id))
    }

    pub fn membership_mut(&mut self, client_id: ClientId, channel_id: ChannelId) -> Option<&mut Membership> {
        self.memberships.get_mut(&(client_id, channel_id))
    }

    // ---- bans ----------------------------------------------------------

    /// Appends a ban, enforcing the per-channel ceiling.
    pub fn add_ban(&mut self, channel_id: ChannelId, ban: Ban) -> Result<(), Error> {
        let channel = self.channels.get_mut(channel_id.raw()).ok_or(Error::NoSuchChannel(channel_id))?;
        if channel.bans.len() >= MAX_BANS_PER_CHANNEL {
            return Err(Error::BanListFull(MAX_BANS_PER_CHANNEL));
        }
        channel.bans.push(ban);
        Ok(())
    }

    pub fn remove_ban(&mut self, channel_id: ChannelId, mask: &str) -> bool {
        let Some(channel) = self.channels.get_mut(channel_id.raw()) else {
            return false;
        };
        let before = channel.bans.len();
        channel.bans.retain(|b| b.mask() != mask);
        channel.bans.len() != before
    }

    /// Verifies the structural invariants hold; used by tests exercising
    /// multi-step scenarios end to end.
    pub fn check_invariants(&self) -> Result<(), String> {
        for (folded, &id) in &self.nick_index {
            let client = self.clients.get(id.raw()).ok_or_else(|| format!("nick index points at dead client {id:?}"))?;
            if self.casemap.fold(&client.nick) != *folded {
                return Err(format!("nick index key mismatch for {id:?}"));
            }
        }
        for ((client_id, channel_id), _m) in &self.memberships {
            let client = self
                .clients
                .get(client_id.raw())
                .ok_or_else(|| format!("membership references dead client {client_id:?}"))?;
            if !client.channels.contains(channel_id) {
                return Err(format!("{client_id:?} missing {channel_id:?} in its channel list"));
            }
            let channel = self
                .channels
                .get(channel_id.raw())
                .ok_or_else(|| format!("membership references dead channel {channel_id:?}"))?;
            if !channel.members.contains(client_id) {
                return Err(format!("{channel_id:?} missing {client_id:?} in its member list"));
            }
        }
        for (_, channel) in self.channels.iter() {
            if channel.bans.len() > MAX_BANS_PER_CHANNEL {
                return Err(format!("channel {} exceeds MAX_BANS_PER_CHANNEL", channel.name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casemap::Rfc1459;
    use std::net::Ipv4Addr;

    fn graph() -> StateGraph {
        StateGraph::new(Box::new(Rfc1459), "irc.example.net", "test server", 64)
    }

    fn localhost() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    #[test]
    fn nick_collision_is_case_folded() {
        let mut g = graph();
        let server = g.self_server();
        g.create_client("Nick", "u", "h", localhost(), "i", server, Ts(1), Ts(1)).unwrap();
        let err = g
            .create_client("NICK", "u2", "h2", localhost(), "i", server, Ts(2), Ts(2))
            .unwrap_err();
        assert_eq!(err, Error::NickInUse("NICK".to_string()));
    }

    #[test]
    fn join_and_part_maintain_both_sides_of_the_membership_invariant() {
        let mut g = graph();
        let server = g.self_server();
        let a = g.create_client("a", "u", "h", localhost(), "i", server, Ts(1), Ts(1)).unwrap();
        let chan = g.find_or_create_channel("#t", Ts(1000));

        g.join_channel(a, chan).unwrap();
        g.check_invariants().unwrap();
        assert_eq!(g.channel(chan).unwrap().members, vec![a]);
        assert_eq!(g.client(a).unwrap().channels, vec![chan]);

        g.part_channel(a, chan).unwrap();
        g.check_invariants().unwrap();
        assert!(g.channel(chan).unwrap().members.is_empty());
        assert!(g.destroy_channel_if_empty(chan));
        assert!(g.find_channel("#t").is_none());
    }

    #[test]
    fn removing_a_client_archives_it_to_whowas_and_clears_memberships() {
        let mut g = graph();
        let server = g.self_server();
        let a = g.create_client("a", "u", "h", localhost(), "i", server, Ts(1), Ts(1)).unwrap();
        let chan = g.find_or_create_channel("#t", Ts(1000));
        g.join_channel(a, chan).unwrap();

        g.remove_client(a, Ts(2000)).unwrap();
        assert!(g.channel(chan).unwrap().members.is_empty());
        assert!(g.find_client_by_nick("a").is_none());
        let found: Vec<_> = g.whowas().find_by_nick("a", &|x, y| g.case_eq(x, y)).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].signoff, Ts(2000));
    }

    #[test]
    fn ban_list_is_capped() {
        let mut g = graph();
        let chan = g.find_or_create_channel("#t", Ts(1));
        for i in 0..MAX_BANS_PER_CHANNEL {
            g.add_ban(
                chan,
                Ban {
                    nick: "*".into(),
                    user: "*".into(),
                    host: format!("h{i}"),
                    who: "op".into(),
                    when: Ts(1),
                    kind: crate::channel::BanKind::Ban,
                },
            )
            .unwrap();
        }
        let err = g
            .add_ban(
                chan,
                Ban {
                    nick: "*".into(),
                    user: "*".into(),
                    host: "overflow".into(),
                    who: "op".into(),
                    when: Ts(1),
                    kind: crate::channel::BanKind::Ban,
                },
            )
            .unwrap_err();
        assert_eq!(err, Error::BanListFull(MAX_BANS_PER_CHANNEL));
    }
}
