//! The [`Daemon`]: wires the command table, module host, and IRC state
//! graph into a [`relayd_reactor::Service`].

mod commands;
mod peer;
mod state;

use std::net::SocketAddr;

use relayd_dispatch::{CommandTable, DispatchOutcome};
use relayd_hooks::EventBus;
use relayd_modules::ModuleHost;
use relayd_reactor::{Io, Link, Service};
use relayd_state::StateGraph;
use relayd_types::Numeric;
use tracing::{debug, info, warn};

pub use state::{CmdState, ConnMeta};

/// Commands the binary's `tokio::select!` loop sends the blocking reactor
/// task across the command channel.
pub enum DaemonCommand {
    ReloadConfig,
}

pub struct Daemon {
    commands: CommandTable<CmdState>,
    bus: EventBus,
    modules: ModuleHost,
    state: CmdState,
    pub reload_requested: bool,
}

impl Daemon {
    pub fn new(
        graph: StateGraph,
        server_name: impl Into<String>,
        baseline: relayd_modules::Version,
        operators: Vec<crate::config::OperatorDef>,
    ) -> Self {
        let mut commands = CommandTable::new();
        commands::register_builtins(&mut commands).expect("built-in commands register once, cleanly");

        let mut bus = EventBus::new();
        for name in ["after_poll", "read_conf"] {
            bus.register_event(name, relayd_hooks::ReturnMode::NoReturn, relayd_hooks::EventFlags::NONE)
                .ok();
        }

        Daemon {
            commands,
            bus,
            modules: ModuleHost::new(baseline),
            state: CmdState::new(graph, server_name, operators),
            reload_requested: false,
        }
    }

    fn dispatch_line(&mut self, addr: SocketAddr, line: &str) {
        let parsed = match relayd_proto::parse_line(line) {
            Ok(m) => m,
            Err(e) => {
                debug!(target: "daemon", "{addr}: malformed line: {e}");
                return;
            }
        };

        self.state.current = addr;
        let is_registered = self.state.conns.get(&addr).map(|c| c.is_registered()).unwrap_or(false);
        let is_operator = self
            .state
            .current_client()
            .and_then(|id| self.state.graph.client(id))
            .map(|c| c.modes.contains(relayd_state::UserModes::OPER))
            .unwrap_or(false);

        let outcome = self.commands.dispatch(
            &mut self.bus,
            &mut self.state,
            is_registered,
            is_operator,
            &parsed.command,
            &parsed.args,
        );

        match outcome {
            DispatchOutcome::Error(numeric) => self.state.numeric(numeric, Vec::new()),
            DispatchOutcome::Vetoed(code) => {
                if let Some(code) = code {
                    self.state.numeric(Numeric::Other(code as u16), Vec::new());
                }
            }
            DispatchOutcome::Handled(_weight) => {}
        }
    }
}

impl Service<SocketAddr> for Daemon {
    type Command = DaemonCommand;

    fn connected(&mut self, id: SocketAddr, _local_addr: SocketAddr, link: Link) {
        info!(target: "daemon", "{id}: connected ({link:?})");
        self.state.conns.insert(id, ConnMeta::new());
    }

    fn disconnected(&mut self, id: &SocketAddr, reason: &str) {
        debug!(target: "daemon", "{id}: disconnected: {reason}");
        if let Some(conn) = self.state.conns.remove(id) {
            if let Some(client_id) = conn.client {
                let now = commands::now_ts();
                if let Ok(client) = self.state.graph.remove_client(client_id, now) {
                    let _ = client;
                }
                self.state.forget_client(client_id);
            }
        }
    }

    fn message_received(&mut self, id: &SocketAddr, data: &[u8]) {
        let Some(conn) = self.state.conns.get_mut(id) else { return };
        let lines = conn.framer.feed(data);
        for line in lines {
            let Ok(text) = String::from_utf8(line) else { continue };
            self.dispatch_line(*id, &text);
        }
    }

    fn command_received(&mut self, cmd: DaemonCommand) {
        match cmd {
            DaemonCommand::ReloadConfig => self.reload_requested = true,
        }
    }

    fn timer_expired(&mut self, _id: relayd_reactor::TimerId) {}

    fn after_poll(&mut self) {
        if self.bus.get("after_poll").is_some() {
            let _ = self.bus.fire("after_poll", &());
        }
    }

    fn apply_pending_reloads(&mut self) {
        for (name, result) in self.modules.apply_pending_reloads(&mut self.bus) {
            if let Err(e) = result {
                warn!(target: "daemon", "module {name} failed to reload: {e}");
            }
        }
    }

    fn next(&mut self) -> Option<Io<SocketAddr>> {
        self.state.outputs.pop_front()
    }
}
