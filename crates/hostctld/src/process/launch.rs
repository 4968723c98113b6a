//! Supervises daemon launch sequencing and transport lifetimes.

use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread;

use tracing::{info, warn};

use crate::bootstrap::{ConfigLoader, Daemon, SystemConfigLoader, bootstrap_with};
use crate::channel::{ChannelOutcome, ChannelSettings};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::http::HttpServer;
use crate::session::{ActionExecutor, PlaceholderSession, StatusProvider};
use crate::transport::{
    AcceptMode, ChannelConnectionHandler, AcceptorHandle, ControlListener, spawn_stdio_channel,
};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

/// Why the daemon stopped serving.
#[derive(Debug)]
pub(crate) enum ExitReason {
    /// The standard I/O channel ended.
    StdioClosed(ChannelOutcome),
    /// A once-mode control socket served its connection.
    SocketServed,
    /// The REST server stopped on its own.
    HttpStopped,
    /// A termination signal arrived.
    Signal,
    /// Signal handlers could not be installed.
    SignalFailed(ShutdownError),
    /// Every transport and watcher went away without reporting.
    Abandoned,
}

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, S, E> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) shutdown: S,
    pub(crate) session: Arc<E>,
}

/// Runs the daemon using the production collaborators.
///
/// Returns once standard input ends, a once-mode control socket has served
/// its connection, or a termination signal arrives.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap or a transport fails.
pub fn run_daemon() -> Result<(), LaunchError> {
    let plan = LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        shutdown: SystemShutdownSignal::new(),
        session: Arc::new(PlaceholderSession::new()),
    };
    let reason = run_daemon_with(plan)?;
    info!(
        target: PROCESS_TARGET,
        ?reason,
        "shutdown sequence completed"
    );
    Ok(())
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, S, E>(
    plan: LaunchPlan<L, S, E>,
) -> Result<ExitReason, LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal + 'static,
    E: ActionExecutor + StatusProvider + 'static,
{
    let LaunchPlan {
        loader,
        reporter,
        shutdown,
        session,
    } = plan;
    let daemon = bootstrap_with(&loader, reporter, session)?;
    let (exits, exit_requested) = mpsc::channel();
    let transports = Transports::start(&daemon, &exits)?;
    watch_signals(shutdown, exits);

    let reason = exit_requested.recv().unwrap_or(ExitReason::Abandoned);
    if let ExitReason::StdioClosed(outcome) = &reason {
        info!(target: PROCESS_TARGET, %outcome, "standard I/O channel ended");
    }
    info!(
        target: PROCESS_TARGET,
        ?reason,
        "stopping transports"
    );
    transports.stop(daemon.reporter().as_ref())?;
    match reason {
        ExitReason::SignalFailed(source) => Err(LaunchError::Shutdown { source }),
        other => Ok(other),
    }
}

struct Transports {
    socket: Option<(AcceptorHandle, AcceptMode)>,
    http: Option<HttpServer>,
    stdio: bool,
}

impl Transports {
    fn start(daemon: &Daemon, exits: &Sender<ExitReason>) -> Result<Self, LaunchError> {
        let config = daemon.config();
        let reporter = daemon.reporter();
        if !config.stdio_enabled()
            && config.script_socket().is_none()
            && config.http_listen().is_none()
        {
            return Err(LaunchError::NoTransport);
        }
        let mut transports = Self {
            socket: None,
            http: None,
            stdio: false,
        };

        if let Some(endpoint) = config.script_socket() {
            let listener = ControlListener::bind(endpoint)?;
            let address = listener.address();
            let mode = if config.script_socket_once() {
                AcceptMode::Once
            } else {
                AcceptMode::Continuous
            };
            let handler = Arc::new(ChannelConnectionHandler::new(
                daemon.channel_context(),
                ChannelSettings::new(config.dialect(), config.socket_reply_order()),
            ));
            let exit = exits.clone();
            let handle = listener.start(handler, mode, move || {
                if mode == AcceptMode::Once {
                    let _sent = exit.send(ExitReason::SocketServed);
                }
            })?;
            reporter.transport_started("socket", &address);
            transports.socket = Some((handle, mode));
        }

        if let Some(listen) = config.http_listen() {
            let exit = exits.clone();
            let server = HttpServer::start(
                listen,
                config.http_namespace(),
                daemon.channel_context(),
                move || {
                    let _sent = exit.send(ExitReason::HttpStopped);
                },
            )?;
            reporter.transport_started("http", &format!("http://{}", server.address()));
            transports.http = Some(server);
        }

        if config.stdio_enabled() {
            let exit = exits.clone();
            spawn_stdio_channel(
                daemon.channel_context(),
                ChannelSettings::new(config.dialect(), config.stdio_reply_order()),
                move |outcome| {
                    let _sent = exit.send(ExitReason::StdioClosed(outcome.clone()));
                },
            )
            .map_err(|source| LaunchError::Stdio { source })?;
            reporter.transport_started("stdio", "stdin/stdout");
            transports.stdio = true;
        }

        Ok(transports)
    }

    fn stop(self, reporter: &dyn HealthReporter) -> Result<(), LaunchError> {
        if let Some((handle, mode)) = self.socket {
            handle.shutdown();
            // A once-mode listener still serving its connection is left to the
            // process exit.
            if mode == AcceptMode::Continuous || handle.is_finished() {
                handle.join()?;
            }
            reporter.transport_stopped("socket");
        }
        if let Some(server) = self.http {
            server.stop()?;
            reporter.transport_stopped("http");
        }
        if self.stdio {
            reporter.transport_stopped("stdio");
        }
        Ok(())
    }
}

fn watch_signals<S>(shutdown: S, exits: Sender<ExitReason>)
where
    S: ShutdownSignal + 'static,
{
    let spawned = thread::Builder::new()
        .name("hostctl-signals".to_owned())
        .spawn(move || {
            let reason = match shutdown.wait() {
                Ok(()) => ExitReason::Signal,
                Err(error) => ExitReason::SignalFailed(error),
            };
            let _sent = exits.send(reason);
        });
    if let Err(error) = spawned {
        warn!(
            target: PROCESS_TARGET,
            error = %error,
            "failed to spawn signal watcher"
        );
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use hostctl_config::{Config, SocketEndpoint, Switch};

    use super::*;
    use crate::bootstrap::StaticConfigLoader;

    struct TriggeredSignal(Mutex<mpsc::Receiver<()>>);

    impl ShutdownSignal for TriggeredSignal {
        fn wait(&self) -> Result<(), ShutdownError> {
            if let Ok(receiver) = self.0.lock() {
                let _fired = receiver.recv();
            }
            Ok(())
        }
    }

    fn plan(
        config: Config,
        signal: TriggeredSignal,
    ) -> LaunchPlan<StaticConfigLoader, TriggeredSignal, PlaceholderSession> {
        LaunchPlan {
            loader: StaticConfigLoader::new(config),
            reporter: Arc::new(StructuredHealthReporter::new()),
            shutdown: signal,
            session: Arc::new(PlaceholderSession::new()),
        }
    }

    fn quiet_config() -> Config {
        Config {
            stdio: Switch::Off,
            ..Config::default()
        }
    }

    #[test]
    fn refuses_to_start_without_transports() {
        let (_trigger, receiver) = mpsc::channel();
        let signal = TriggeredSignal(Mutex::new(receiver));
        let error = run_daemon_with(plan(quiet_config(), signal)).expect_err("no transports");
        assert!(matches!(error, LaunchError::NoTransport));
    }

    #[test]
    fn signal_stops_a_continuous_socket() {
        let (trigger, receiver) = mpsc::channel();
        let signal = TriggeredSignal(Mutex::new(receiver));
        let config = Config {
            script_socket_enabled: Switch::On,
            script_socket: SocketEndpoint::tcp("127.0.0.1", 0),
            ..quiet_config()
        };
        let daemon = thread::spawn(move || run_daemon_with(plan(config, signal)));
        trigger.send(()).expect("fire signal");
        let reason = daemon
            .join()
            .expect("daemon thread")
            .expect("daemon stops cleanly");
        assert!(matches!(reason, ExitReason::Signal));
    }

    #[test]
    fn once_socket_ends_the_daemon_after_one_connection() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("run").join("hostctl.sock");
        let (_trigger, receiver) = mpsc::channel();
        let signal = TriggeredSignal(Mutex::new(receiver));
        let config = Config {
            script_socket_enabled: Switch::On,
            script_socket: SocketEndpoint::unix(path.to_str().expect("utf8 path")),
            script_socket_once: Switch::On,
            ..quiet_config()
        };
        let daemon = thread::spawn(move || run_daemon_with(plan(config, signal)));

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut client = loop {
            match UnixStream::connect(&path) {
                Ok(stream) => break stream,
                Err(error) if Instant::now() < deadline => {
                    drop(error);
                    thread::sleep(Duration::from_millis(20));
                }
                Err(error) => panic!("socket never appeared: {error}"),
            }
        };
        client.write_all(b"Echo(once)\n").expect("send request");
        client
            .shutdown(std::net::Shutdown::Write)
            .expect("half-close");
        let mut replies = String::new();
        client.read_to_string(&mut replies).expect("read replies");
        assert!(replies.starts_with("data: once\n"));

        let reason = daemon
            .join()
            .expect("daemon thread")
            .expect("daemon stops cleanly");
        assert!(matches!(reason, ExitReason::SocketServed));
    }
}
