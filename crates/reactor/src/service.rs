use std::net::SocketAddr;
use std::time::Instant;

use crate::io::{Io, Link};
use crate::timer::TimerId;

/// The state machine the reactor drives: a single trait covering both
/// connection lifecycle and timer/command delivery. Here the driven state
/// machine is the IRC command dispatcher, not a peer wire protocol, so
/// there is no separate `Message` associated type — inbound bytes are
/// handed over raw and the dispatcher runs its own line codec on them.
pub trait Service<Id> {
    type Command: Send;

    /// Called once before the reactor's first tick.
    fn initialize(&mut self) {}

    /// Called once per tick with the current time, before readiness is
    /// dispatched, so the service can age out connections etc.
    fn tick(&mut self, _now: Instant) {}

    /// A connection attempt for `id` is underway (outbound only; inbound
    /// connections go straight to [`Service::connected`]).
    fn attempted(&mut self, _id: &Id) {}

    /// `id` is now connected, accepted or dialed.
    fn connected(&mut self, id: Id, local_addr: SocketAddr, link: Link);

    /// `id` was torn down, locally or remotely.
    fn disconnected(&mut self, id: &Id, reason: &str);

    /// Raw bytes arrived on `id`'s socket.
    fn message_received(&mut self, id: &Id, data: &[u8]);

    /// An external command arrived on the reactor's command channel.
    fn command_received(&mut self, cmd: Self::Command);

    /// The timer `id` has fired.
    fn timer_expired(&mut self, id: TimerId);

    /// Fires after every socket in this tick has had its readiness
    /// dispatched. Default no-op; the dispatcher wires this to firing the
    /// `hooks` crate's `after_poll` event.
    fn after_poll(&mut self) {}

    /// Applies any module reloads queued during this tick. Default no-op;
    /// the dispatcher wires this to
    /// `relayd_modules::ModuleHost::apply_pending_reloads`.
    fn apply_pending_reloads(&mut self) {}

    /// Drains the next queued instruction for the reactor to act on.
    /// Called in a loop until it returns `None`.
    fn next(&mut self) -> Option<Io<Id>>;
}
