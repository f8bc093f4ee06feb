use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;

use relayd_dispatch::ReplyTable;
use relayd_hooks::EventBus;
use relayd_modes::register_core_access_hooks;
use relayd_proto::{encode, Framer, Message};
use relayd_peer::ConnState;
use relayd_reactor::Io;
use relayd_state::StateGraph;
use relayd_types::{ChannelId, ClientId, Numeric};

/// Everything a connection needs before and after it resolves to a
/// [`ClientId`]. `nick`/`user` hold the registration
/// handshake's two halves until both have arrived.
pub struct ConnMeta {
    pub framer: Framer,
    pub conn_state: ConnState,
    pub client: Option<ClientId>,
    pub pending_nick: Option<String>,
    pub pending_user: Option<(String, String, String)>,
    /// Set by `PASS`, read (and cleared) by `OPER` — the link password
    /// itself is accepted but never checked against anything; only
    /// `OPER`'s operator-block lookup actually gates on a password.
    pub pending_pass: Option<String>,
}

impl ConnMeta {
    pub fn new() -> Self {
        ConnMeta {
            framer: Framer::new(relayd_types::MAX_LINE_LEN),
            conn_state: ConnState::Accepted,
            client: None,
            pending_nick: None,
            pending_user: None,
            pending_pass: None,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.client.is_some()
    }
}

/// The generic `Ctx` the command table dispatches against. Kept
/// disjoint from the [`relayd_dispatch::CommandTable`] and
/// [`relayd_hooks::EventBus`] fields of `Daemon` itself, so dispatching
/// through both at once borrows three sibling fields rather than one
/// struct twice.
pub struct CmdState {
    pub graph: StateGraph,
    pub conns: HashMap<SocketAddr, ConnMeta>,
    pub client_addr: HashMap<ClientId, SocketAddr>,
    pub outputs: VecDeque<Io<SocketAddr>>,
    pub current: SocketAddr,
    pub server_name: String,
    pub reply_table: ReplyTable,
    /// Separate from the daemon's module-facing [`EventBus`] — this one only ever carries
    /// the six access-check events command handlers fire directly, so a handler can fire
    /// it without also borrowing the module host's bus.
    pub access_bus: EventBus,
    /// Configured `operator { }` blocks, checked by `OPER`.
    pub operators: Vec<crate::config::OperatorDef>,
}

impl CmdState {
    pub fn new(
        graph: StateGraph,
        server_name: impl Into<String>,
        operators: Vec<crate::config::OperatorDef>,
    ) -> Self {
        let mut access_bus = EventBus::new();
        register_core_access_hooks(&mut access_bus).expect("core access hooks register once, cleanly");
        CmdState {
            graph,
            conns: HashMap::new(),
            client_addr: HashMap::new(),
            outputs: VecDeque::new(),
            current: "0.0.0.0:0".parse().unwrap(),
            server_name: server_name.into(),
            reply_table: ReplyTable::new(),
            access_bus,
            operators,
        }
    }

    pub fn current_conn(&self) -> Option<&ConnMeta> {
        self.conns.get(&self.current)
    }

    pub fn current_conn_mut(&mut self) -> Option<&mut ConnMeta> {
        self.conns.get_mut(&self.current)
    }

    pub fn current_client(&self) -> Option<ClientId> {
        self.current_conn().and_then(|c| c.client)
    }

    pub fn queue(&mut self, addr: SocketAddr, msg: &Message) {
        self.outputs.push_back(Io::Write(addr, encode(msg)));
    }

    pub fn send_to_client(&mut self, client: ClientId, msg: &Message) {
        if let Some(&addr) = self.client_addr.get(&client) {
            self.queue(addr, msg);
        }
    }

    pub fn send_to_clients(&mut self, clients: &[ClientId], msg: &Message) {
        for &c in clients {
            self.send_to_client(c, msg);
        }
    }

    /// Replies to the currently dispatching connection with a server
    /// numeric, formatting `:server NNN target args...`.
    pub fn numeric(&mut self, code: Numeric, args: Vec<String>) {
        let target = self
            .current_client()
            .and_then(|id| self.graph.client(id))
            .map(|c| c.nick.clone())
            .unwrap_or_else(|| "*".to_string());
        let mut full_args = vec![target];
        full_args.extend(args);
        let msg = Message::new(format!("{:03}", code.code()), full_args).with_prefix(self.server_name.clone());
        let addr = self.current;
        self.queue(addr, &msg);
    }

    pub fn disconnect_current(&mut self, reason: impl Into<String>) {
        let addr = self.current;
        self.outputs.push_back(Io::Disconnect(addr, reason.into()));
    }

    /// Drops bookkeeping for a client that has left the graph (quit,
    /// killed, or its connection died) — the reverse of the index the
    /// graph itself doesn't need but the daemon does, to route replies.
    pub fn forget_client(&mut self, client: ClientId) {
        self.client_addr.remove(&client);
    }

    pub fn channel_name(&self, id: ChannelId) -> String {
        self.graph.channel(id).map(|c| c.name.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayd_state::Rfc1459;
    use relayd_types::Ts;

    fn new_state() -> CmdState {
        let graph = StateGraph::new(Box::new(Rfc1459), "irc.example.net", "test server", 64);
        CmdState::new(graph, "irc.example.net", Vec::new())
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn conn_meta_starts_unregistered() {
        let conn = ConnMeta::new();
        assert!(!conn.is_registered());
        assert!(conn.client.is_none());
    }

    #[test]
    fn current_conn_tracks_whichever_addr_is_set_as_current() {
        let mut state = new_state();
        let a = addr(1);
        state.conns.insert(a, ConnMeta::new());
        assert!(state.current_conn().is_none());
        state.current = a;
        assert!(state.current_conn().is_some());
        assert!(state.current_client().is_none());
    }

    #[test]
    fn numeric_targets_star_before_registration_and_the_nick_after() {
        let mut state = new_state();
        let a = addr(2);
        state.conns.insert(a, ConnMeta::new());
        state.current = a;

        state.numeric(Numeric::ErrNoNicknameGiven, Vec::new());
        let Some(Io::Write(_, bytes)) = state.outputs.pop_front() else { panic!("expected a write") };
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains(" * "), "expected target '*' before registration, got: {text:?}");

        let client = state
            .graph
            .create_client("Dan", "dan", "host.example", [127, 0, 0, 1].into(), "info", state.graph.self_server(), Ts(1), Ts(1))
            .unwrap();
        state.conns.get_mut(&a).unwrap().client = Some(client);
        state.client_addr.insert(client, a);

        state.numeric(Numeric::ErrNoNicknameGiven, Vec::new());
        let Some(Io::Write(_, bytes)) = state.outputs.pop_front() else { panic!("expected a write") };
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains(" Dan "), "expected target 'Dan' after registration, got: {text:?}");
    }

    #[test]
    fn send_to_clients_only_reaches_clients_with_a_known_address() {
        let mut state = new_state();
        let client = ClientId::from_raw(42);
        let msg = Message::new("PRIVMSG".to_string(), vec!["#t".into(), "hi".into()]);
        state.send_to_clients(&[client], &msg);
        assert!(state.outputs.is_empty());

        let a = addr(3);
        state.client_addr.insert(client, a);
        state.send_to_clients(&[client], &msg);
        assert!(matches!(state.outputs.pop_front(), Some(Io::Write(addr, _)) if addr == a));
    }

    #[test]
    fn disconnect_current_queues_a_disconnect_for_the_current_addr() {
        let mut state = new_state();
        state.current = addr(4);
        state.disconnect_current("bye");
        match state.outputs.pop_front() {
            Some(Io::Disconnect(a, reason)) => {
                assert_eq!(a, addr(4));
                assert_eq!(reason, "bye");
            }
            other => panic!("expected a queued disconnect, got {other:?}"),
        }
    }

    #[test]
    fn channel_name_is_empty_for_an_unknown_id() {
        let state = new_state();
        assert_eq!(state.channel_name(ChannelId::from_raw(999)), "");
    }
}
