use std::collections::HashMap;
use std::hash::Hash;
use std::io;
use std::net::{self, SocketAddr};
use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, trace};

use crate::error::Error;
use crate::io::{Io, Link};
use crate::service::Service;
use crate::socket::Socket;
use crate::timer::TimerWheel;

/// Upper bound on the poll timeout when no timer is pending, so the
/// reactor still wakes periodically to reap dead sockets and service
/// the waker.
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
enum Source<Id> {
    Peer(Id),
    Listener,
    Waker,
}

/// Wakes the reactor's `poll` from another thread, so that a command
/// queued on the command channel is processed promptly instead of
/// waiting for the next timer or socket event.
#[derive(Clone)]
pub struct Waker(Arc<popol::Waker>);

impl Waker {
    fn new<Id: Eq + Hash + Clone>(sources: &mut popol::Sources<Source<Id>>) -> io::Result<Self> {
        Ok(Waker(Arc::new(popol::Waker::new(sources, Source::Waker)?)))
    }

    pub fn wake(&self) -> io::Result<()> {
        self.0.wake()
    }
}

/// Single-threaded cooperative reactor, bound to `net::TcpStream` since
/// the accept/dial logic is inherently TCP-specific; the registration and
/// readiness bookkeeping below is written so a second `impl` over a
/// different stream type would only need to replace [`listen`]/[`dial`].
pub struct Reactor<Id: Eq + Hash + Clone> {
    sockets: HashMap<Id, Socket<net::TcpStream>>,
    sources: popol::Sources<Source<Id>>,
    listener: Option<net::TcpListener>,
    waker: Waker,
    timers: TimerWheel,
    dead: Vec<Id>,
    max_sockets: usize,
}

impl<Id: Eq + Hash + Clone + std::fmt::Debug + From<SocketAddr>> Reactor<Id> {
    pub fn new() -> Result<Self, Error> {
        let mut sources = popol::Sources::new();
        let waker = Waker::new(&mut sources)?;

        Ok(Reactor {
            sockets: HashMap::new(),
            sources,
            listener: None,
            waker,
            timers: TimerWheel::new(),
            dead: Vec::new(),
            max_sockets: relayd_types::DEFAULT_MAX_SOCKETS,
        })
    }

    pub fn waker(&self) -> Waker {
        self.waker.clone()
    }

    /// Caps the number of concurrently open peer sockets (the listener and
    /// waker descriptors are not counted). `accept()` past this cap still
    /// drains the backlog but closes the new socket immediately rather
    /// than registering it, per `maxsockets`.
    pub fn set_max_sockets(&mut self, max_sockets: usize) {
        self.max_sockets = max_sockets;
    }

    pub fn timers(&mut self) -> &mut TimerWheel {
        &mut self.timers
    }

    /// Binds and registers the listening socket. Call once at startup.
    pub fn listen(&mut self, addr: SocketAddr) -> Result<SocketAddr, Error> {
        let listener = listen(addr)?;
        let local_addr = listener.local_addr()?;
        self.sources.register(Source::Listener, &listener, popol::interest::READ);
        self.listener = Some(listener);
        debug!(target: "reactor", "listening on {local_addr}");
        Ok(local_addr)
    }

    fn register_peer(&mut self, id: Id, stream: net::TcpStream, addr: SocketAddr) {
        self.sources.register(Source::Peer(id.clone()), &stream, popol::interest::ALL);
        self.sockets.insert(id, Socket::new(stream, addr));
    }

    fn reap_peer(&mut self, id: &Id) {
        self.sockets.remove(id);
        self.sources.unregister(&Source::Peer(id.clone()));
    }

    /// Dials out to `addr`, registering the connection as `id` once the
    /// non-blocking connect has been initiated.
    pub fn connect<S>(&mut self, id: Id, addr: SocketAddr, service: &mut S)
    where
        S: Service<Id>,
    {
        match dial(&addr) {
            Ok(stream) => {
                trace!(target: "reactor", "{addr}: dialing");
                self.register_peer(id.clone(), stream, addr);
                service.attempted(&id);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                error!(target: "reactor", "{addr}: dial error: {e}");
                service.disconnected(&id, &e.to_string());
            }
        }
    }

    /// Runs exactly one tick of the six-step loop: poll, deliver
    /// readiness, reap dead sockets, run due timers, fire the after-poll
    /// hook, apply pending module reloads.
    pub fn tick<S>(
        &mut self,
        service: &mut S,
        commands: &mut tokio::sync::mpsc::UnboundedReceiver<S::Command>,
    ) -> Result<(), Error>
    where
        S: Service<Id>,
    {
        for socket in self.sockets.values_mut() {
            socket.flags.reset_transient();
        }

        let timeout = self
            .timers
            .next_delay(Instant::now())
            .unwrap_or(DEFAULT_POLL_TIMEOUT);

        let mut events = Vec::with_capacity(32);
        let result = self.sources.wait_timeout(&mut events, timeout);
        let now = Instant::now();
        service.tick(now);

        match result {
            Ok(_) => self.deliver_readiness(&mut events, service, commands)?,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
            Err(e) => return Err(e.into()),
        }

        // Step 3: reap sockets marked dead during readiness delivery.
        for id in self.dead.drain(..).collect::<Vec<_>>() {
            self.reap_peer(&id);
        }

        // Step 4: run due timers.
        for timer_id in self.timers.drain_due(now) {
            service.timer_expired(timer_id);
        }

        // Step 5: after-poll hook.
        service.after_poll();

        // Step 6: apply pending module reloads.
        service.apply_pending_reloads();

        self.process_outputs(service, now);

        Ok(())
    }

    fn deliver_readiness<S>(
        &mut self,
        events: &mut Vec<popol::Event<Source<Id>>>,
        service: &mut S,
        commands: &mut tokio::sync::mpsc::UnboundedReceiver<S::Command>,
    ) -> Result<(), Error>
    where
        S: Service<Id>,
    {
        for event in events.drain(..) {
            match &event.key {
                Source::Peer(id) => self.deliver_peer_event(id.clone(), &event, service),
                Source::Listener => self.accept_loop(service)?,
                Source::Waker => {
                    popol::Waker::reset(event.source).ok();
                    while let Ok(cmd) = commands.try_recv() {
                        service.command_received(cmd);
                    }
                }
            }
        }
        Ok(())
    }

    fn deliver_peer_event<S>(&mut self, id: Id, event: &popol::Event<Source<Id>>, service: &mut S)
    where
        S: Service<Id>,
    {
        let Some(socket) = self.sockets.get_mut(&id) else {
            return;
        };
        if socket.is_dead() {
            return;
        }

        if event.is_invalid() {
            error!(target: "reactor", "{:?}: socket invalid, marking dead", id);
            socket.mark_dead();
            self.dead.push(id.clone());
            return;
        }
        if event.is_error() || event.is_hangup() {
            socket.flags.error_pending = true;
        }
        if event.is_writable() {
            socket.flags.write_pending = true;
        }
        if event.is_readable() {
            socket.flags.read_pending = true;
        }

        if socket.flags.error_pending {
            socket.mark_dead();
            self.dead.push(id.clone());
            service.disconnected(&id, "socket error");
            return;
        }

        if socket.flags.write_pending {
            self.flush_peer(id.clone(), service);
        }
        // Writing above may have killed the socket; re-check before reading.
        if self.sockets.get(&id).map(|s| !s.is_dead()).unwrap_or(false)
            && self.sockets[&id].flags.read_pending
        {
            self.read_peer(id, service);
        }
    }

    fn flush_peer<S: Service<Id>>(&mut self, id: Id, service: &mut S) {
        let Some(socket) = self.sockets.get_mut(&id) else {
            return;
        };
        match socket.flush() {
            Ok(true) => {
                if let Some(source) = self.sources.get_mut(&Source::Peer(id)) {
                    source.unset(popol::interest::WRITE);
                }
            }
            Ok(false) => {
                if let Some(source) = self.sources.get_mut(&Source::Peer(id)) {
                    source.set(popol::interest::WRITE);
                }
            }
            Err(e) => {
                error!(target: "reactor", "{:?}: write error: {e}", id);
                socket.mark_dead();
                self.dead.push(id.clone());
                service.disconnected(&id, &e.to_string());
            }
        }
    }

    fn read_peer<S: Service<Id>>(&mut self, id: Id, service: &mut S) {
        const READ_BUFFER_SIZE: usize = 8192;
        let mut buf = [0u8; READ_BUFFER_SIZE];

        let Some(socket) = self.sockets.get_mut(&id) else {
            return;
        };
        match socket.read(&mut buf) {
            Ok(0) => {
                socket.mark_dead();
                self.dead.push(id.clone());
                service.disconnected(&id, "connection closed");
            }
            Ok(n) => service.message_received(&id, &buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => {
                trace!(target: "reactor", "{:?}: read error: {e}", id);
                socket.mark_dead();
                self.dead.push(id.clone());
                service.disconnected(&id, &e.to_string());
            }
        }
    }

    fn accept_loop<S: Service<Id>>(&mut self, service: &mut S) -> Result<(), Error> {
        while let Some(listener) = &self.listener {
            let (conn, addr) = match listener.accept() {
                Ok(pair) => pair,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    error!(target: "reactor", "accept error: {e}");
                    break;
                }
            };
            if self.sockets.len() >= self.max_sockets {
                trace!(target: "reactor", "at maxsockets ({}): closing {addr} immediately", self.max_sockets);
                drop(conn);
                continue;
            }

            conn.set_nonblocking(true)?;
            let local_addr = conn.local_addr()?;
            let id = Id::from(addr);

            self.register_peer(id.clone(), conn, addr);
            service.connected(id, local_addr, Link::Inbound);
        }
        Ok(())
    }

    /// Drains every [`Io`] instruction the service has queued and applies
    /// it to the reactor's bookkeeping.
    fn process_outputs<S: Service<Id>>(&mut self, service: &mut S, now: Instant) {
        while let Some(out) = service.next() {
            match out {
                Io::Write(id, bytes) => {
                    if let Some(socket) = self.sockets.get_mut(&id) {
                        socket.push(&bytes);
                        if let Some(source) = self.sources.get_mut(&Source::Peer(id)) {
                            source.set(popol::interest::WRITE);
                        }
                    }
                }
                Io::Connect(id) => {
                    debug!(target: "reactor", "{:?}: connect requested but no address given to generic reactor", id);
                }
                Io::Disconnect(id, reason) => {
                    if let Some(socket) = self.sockets.get_mut(&id) {
                        socket.mark_dead();
                    }
                    self.dead.push(id.clone());
                    service.disconnected(&id, &reason);
                }
                Io::SetTimer(after) => {
                    self.timers.set(now, after);
                }
                Io::Event(event) => trace!(target: "reactor", "event: {event}"),
            }
        }
    }

    /// Runs [`Reactor::tick`] until `should_stop` returns true, e.g. driven
    /// by a `CancellationToken` checked between ticks at the binary's
    /// `tokio::select!` level.
    pub fn run<S>(
        &mut self,
        service: &mut S,
        commands: &mut tokio::sync::mpsc::UnboundedReceiver<S::Command>,
        mut should_stop: impl FnMut() -> bool,
    ) -> Result<(), Error>
    where
        S: Service<Id>,
    {
        service.initialize();
        while !should_stop() {
            self.tick(service, commands)?;
        }
        Ok(())
    }

    pub fn is_registered(&self, id: &Id) -> bool {
        self.sockets.contains_key(id)
    }

    pub fn socket_count(&self) -> usize {
        self.sockets.len()
    }
}

/// Connect to a peer given a remote address (teacher's `net::reactor::dial`).
fn dial(addr: &SocketAddr) -> io::Result<net::TcpStream> {
    use socket2::{Domain, Socket as Socket2, Type};

    let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
    let sock = Socket2::new(domain, Type::STREAM, None)?;
    sock.set_nonblocking(true)?;

    match sock.connect(&(*addr).into()) {
        Ok(()) => {}
        Err(e) if e.raw_os_error() == Some(libc::EINPROGRESS) => {}
        Err(e) if e.raw_os_error() == Some(libc::EALREADY) => {
            return Err(io::Error::from(io::ErrorKind::AlreadyExists))
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
        Err(e) => return Err(e),
    }
    Ok(sock.into())
}

fn listen(addr: SocketAddr) -> io::Result<net::TcpListener> {
    let sock = net::TcpListener::bind(addr)?;
    sock.set_nonblocking(true)?;
    Ok(sock)
}

#[allow(dead_code)]
fn assert_raw_fd<T: AsRawFd>() {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::{Read, Write};
    use tokio::sync::mpsc;

    struct Recorder {
        log: Vec<String>,
        connected: Vec<SocketAddr>,
        out: VecDeque<Io<SocketAddr>>,
    }

    impl Service<SocketAddr> for Recorder {
        type Command = ();

        fn connected(&mut self, id: SocketAddr, _local_addr: SocketAddr, _link: Link) {
            self.connected.push(id);
        }

        fn disconnected(&mut self, id: &SocketAddr, reason: &str) {
            self.log.push(format!("disconnected {id}: {reason}"));
        }

        fn message_received(&mut self, id: &SocketAddr, data: &[u8]) {
            self.log.push(format!("recv {id}: {}", String::from_utf8_lossy(data)));
            self.out.push_back(Io::Write(*id, b"ack".to_vec()));
        }

        fn command_received(&mut self, _cmd: ()) {}

        fn timer_expired(&mut self, _id: TimerId) {}

        fn next(&mut self) -> Option<Io<SocketAddr>> {
            self.out.pop_front()
        }
    }

    #[test]
    fn accepts_reads_and_writes_back_over_loopback() {
        let mut reactor: Reactor<SocketAddr> = Reactor::new().unwrap();
        let local_addr = reactor.listen("127.0.0.1:0".parse().unwrap()).unwrap();

        let client = std::thread::spawn(move || {
            let mut stream = net::TcpStream::connect(local_addr).unwrap();
            stream.write_all(b"hello").unwrap();
            stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
            let mut buf = [0u8; 16];
            let n = stream.read(&mut buf).unwrap();
            buf[..n].to_vec()
        });

        let mut service = Recorder {
            log: Vec::new(),
            connected: Vec::new(),
            out: VecDeque::new(),
        };
        let (_tx, mut rx) = mpsc::unbounded_channel::<()>();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !service.log.iter().any(|l| l.starts_with("recv")) && Instant::now() < deadline {
            reactor.tick(&mut service, &mut rx).unwrap();
        }
        // One more tick to flush the queued ack reply.
        reactor.tick(&mut service, &mut rx).unwrap();

        let echoed = client.join().unwrap();
        assert_eq!(echoed, b"ack");
        assert_eq!(service.connected.len(), 1);
        assert!(service.log.iter().any(|l| l.contains("hello")));
    }

    #[test]
    fn disconnect_instruction_marks_the_socket_dead_for_the_next_reap() {
        let mut reactor: Reactor<SocketAddr> = Reactor::new().unwrap();
        let local_addr = reactor.listen("127.0.0.1:0".parse().unwrap()).unwrap();

        let _client = std::thread::spawn(move || {
            let _stream = net::TcpStream::connect(local_addr).unwrap();
            std::thread::sleep(Duration::from_millis(500));
        });

        struct Disconnector {
            seen_connect: bool,
        }
        impl Service<SocketAddr> for Disconnector {
            type Command = ();
            fn connected(&mut self, _id: SocketAddr, _local_addr: SocketAddr, _link: Link) {
                self.seen_connect = true;
            }
            fn disconnected(&mut self, _id: &SocketAddr, _reason: &str) {}
            fn message_received(&mut self, _id: &SocketAddr, _data: &[u8]) {}
            fn command_received(&mut self, _cmd: ()) {}
            fn timer_expired(&mut self, _id: TimerId) {}
            fn next(&mut self) -> Option<Io<SocketAddr>> {
                None
            }
        }

        let mut service = Disconnector { seen_connect: false };
        let (_tx, mut rx) = mpsc::unbounded_channel::<()>();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !service.seen_connect && Instant::now() < deadline {
            reactor.tick(&mut service, &mut rx).unwrap();
        }
        assert_eq!(reactor.socket_count(), 1);
    }

    #[test]
    fn accept_past_max_sockets_closes_the_new_socket_without_registering_it() {
        let mut reactor: Reactor<SocketAddr> = Reactor::new().unwrap();
        reactor.set_max_sockets(0);
        let local_addr = reactor.listen("127.0.0.1:0".parse().unwrap()).unwrap();

        let _client = std::thread::spawn(move || {
            let stream = net::TcpStream::connect(local_addr).unwrap();
            std::thread::sleep(Duration::from_millis(300));
            drop(stream);
        });

        let mut service = Recorder { log: Vec::new(), connected: Vec::new(), out: VecDeque::new() };
        let (_tx, mut rx) = mpsc::unbounded_channel::<()>();

        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            reactor.tick(&mut service, &mut rx).unwrap();
            std::thread::sleep(Duration::from_millis(10));
        }

        assert!(service.connected.is_empty(), "a socket at the cap must never reach Service::connected");
        assert_eq!(reactor.socket_count(), 0);
    }
}
