use tokio::signal::unix::{self, SignalKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{level_filters::LevelFilter, Event, Level, Subscriber};
use tracing_subscriber::{
    filter::Targets,
    fmt::format::{DefaultVisitor, Writer},
    layer::Layer,
    prelude::*,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::cli::arguments;
use crate::config::ProcessConfig;
use crate::daemon::{Daemon, DaemonCommand};

/// Entry point for the `Run` subcommand: loads the
/// config, starts the reactor on a blocking thread, and waits for either
/// the daemon to stop itself or a termination signal.
pub async fn run(args: arguments::Run) -> eyre::Result<()> {
    let config = ProcessConfig::load(&args.config, args.path.as_deref())?;

    if args.check_config {
        println!("config ok: {} listeners, {} modules", config.listen.len(), config.module_names.len());
        return Ok(());
    }

    let level_filter = bump_level(config.log_level, args.debug);

    let filter = Targets::new()
        .with_target("relayd_reactor", level_filter)
        .with_target("relayd_dispatch", level_filter)
        .with_target("relayd_modules", level_filter)
        .with_target("relayd_peer", level_filter)
        .with_target("relayd_hooks", level_filter)
        .with_target("daemon", level_filter)
        .with_default(level_filter);

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;

    tracing_subscriber::registry()
        .with(RelaydTracer.with_filter(filter))
        .with(env_filter)
        .try_init()?;

    let listen_addr = config
        .listen
        .first()
        .copied()
        .ok_or_else(|| eyre::eyre!("config has no `listen { ... };` addresses"))?;

    let mut reactor: relayd_reactor::Reactor<std::net::SocketAddr> = relayd_reactor::Reactor::new()?;
    reactor.set_max_sockets(config.max_sockets);
    reactor.listen(listen_addr)?;
    let waker = reactor.waker();

    let graph = relayd_state::StateGraph::new(
        case_map_from_config(&config),
        config.server_name.clone(),
        config.server_info.clone(),
        relayd_types::DEFAULT_WHOWAS_CAPACITY,
    );
    let mut daemon = Daemon::new(
        graph,
        config.server_name.clone(),
        relayd_modules::Version::new(1, 0, 0),
        config.operators.clone(),
    );

    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<DaemonCommand>();
    let stop = CancellationToken::new();
    let stop_for_reactor = stop.clone();

    let reactor_task = tokio::task::spawn_blocking(move || {
        reactor.run(&mut daemon, &mut cmd_rx, || stop_for_reactor.is_cancelled())
    });

    let mut sigterm = unix::signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = unix::signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sighup = unix::signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                tracing::info!("received SIGINT, shutting down");
                break;
            }
            _ = sighup.recv() => {
                tracing::info!("received SIGHUP, reloading config");
                let _ = cmd_tx.send(DaemonCommand::ReloadConfig);
                waker.wake().ok();
            }
        }
    }

    stop.cancel();
    waker.wake().ok();

    match reactor_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("reactor stopped with an error: {e}"),
        Err(e) => tracing::error!("reactor task panicked: {e}"),
    }

    Ok(())
}

/// `casemapping "ascii";` in the top-level config opts out of the
/// default rfc1459 fold. Anything else, including an absent key, keeps rfc1459.
fn case_map_from_config(config: &ProcessConfig) -> Box<dyn relayd_state::CaseMap> {
    let casemapping = relayd_config::find_first(config.tree.roots(), "casemapping").and_then(relayd_config::Entry::value);
    match casemapping {
        Some(v) if v.eq_ignore_ascii_case("ascii") => Box::new(relayd_state::Ascii),
        _ => Box::new(relayd_state::Rfc1459),
    }
}

/// `-d`/`-dd`/`-ddd` steps the configured level down towards `TRACE`,
/// never up past it.
fn bump_level(base: LevelFilter, extra: u8) -> LevelFilter {
    let steps = [LevelFilter::ERROR, LevelFilter::WARN, LevelFilter::INFO, LevelFilter::DEBUG, LevelFilter::TRACE];
    let current = steps.iter().position(|l| *l == base).unwrap_or(2);
    let bumped = (current + extra as usize).min(steps.len() - 1);
    steps[bumped]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessConfig;
    use relayd_config::parse_str;

    fn base_process_config(tree: relayd_config::ConfigTree) -> ProcessConfig {
        ProcessConfig {
            tree,
            server_name: "irc.example.net".into(),
            server_info: "test server".into(),
            directory: ".".into(),
            max_sockets: 1024,
            listen: Vec::new(),
            log_level: LevelFilter::INFO,
            module_names: Vec::new(),
            operators: Vec::new(),
        }
    }

    #[test]
    fn bump_level_steps_down_towards_trace_and_clamps() {
        assert_eq!(bump_level(LevelFilter::INFO, 0), LevelFilter::INFO);
        assert_eq!(bump_level(LevelFilter::INFO, 1), LevelFilter::DEBUG);
        assert_eq!(bump_level(LevelFilter::INFO, 2), LevelFilter::TRACE);
        assert_eq!(bump_level(LevelFilter::INFO, 99), LevelFilter::TRACE);
        assert_eq!(bump_level(LevelFilter::ERROR, 1), LevelFilter::WARN);
    }

    #[test]
    fn case_map_from_config_defaults_to_rfc1459() {
        let tree = parse_str("server { name \"irc.example.net\"; };").unwrap();
        let config = base_process_config(tree);
        let cm = case_map_from_config(&config);
        assert!(cm.eq("Nick{home}", "NICK[HOME]"));
    }

    #[test]
    fn case_map_from_config_honors_ascii_opt_out() {
        let tree = parse_str("server { name \"irc.example.net\"; }; casemapping \"ascii\";").unwrap();
        let config = base_process_config(tree);
        let cm = case_map_from_config(&config);
        assert!(!cm.eq("nick{}", "nick[]"));
    }
}

struct RelaydTracer;

impl<S> Layer<S> for RelaydTracer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let target = match event.metadata().level() {
            &Level::INFO | &Level::WARN | &Level::ERROR => event.metadata().target().split("::").last().unwrap_or_default(),
            _ => event.metadata().target(),
        };

        print!(
            "[{}] {} {}: ",
            chrono::offset::Local::now().format("%Y-%m-%d %H:%M:%S"),
            event.metadata().level(),
            target,
        );

        let mut message = String::new();
        event.record(&mut DefaultVisitor::new(Writer::new(&mut message), true));
        println!("{}", message);
    }
}

