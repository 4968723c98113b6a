//! The scripting control socket.
//!
//! Scripts connect over TCP or a Unix-domain path. The acceptor polls on its
//! own thread and hands every connection a thread of its own; in once mode it
//! serves the first script itself and then gives up the endpoint.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use hostctl_config::SocketEndpoint;

use super::{ConnectionHandler, ConnectionStream, ControlSocketError, TRANSPORT_TARGET};

#[cfg(unix)]
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::FileTypeExt;
#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};
#[cfg(unix)]
use std::path::Path;

/// Pause between polls when no script is waiting.
const IDLE_POLL: Duration = Duration::from_millis(25);
/// Pause after a failed accept.
const FAILED_ACCEPT_PAUSE: Duration = Duration::from_millis(150);

/// How many scripts the control socket serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AcceptMode {
    /// Any number, until the daemon stops.
    Continuous,
    /// The first script only.
    Once,
}

/// A bound control socket that has not started accepting yet.
#[derive(Debug)]
pub(crate) struct ControlListener {
    endpoint: SocketEndpoint,
    acceptor: Acceptor,
}

#[derive(Debug)]
enum Acceptor {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl Acceptor {
    fn poll_for_connections(&self) -> io::Result<()> {
        match self {
            Self::Tcp(listener) => listener.set_nonblocking(true),
            #[cfg(unix)]
            Self::Unix(listener) => listener.set_nonblocking(true),
        }
    }

    /// Takes the next waiting script, if any, as a blocking stream.
    fn next_script(&self) -> io::Result<Option<ConnectionStream>> {
        let accepted = match self {
            Self::Tcp(listener) => listener.accept().and_then(|(stream, _)| {
                stream.set_nonblocking(false)?;
                Ok(ConnectionStream::Tcp(stream))
            }),
            #[cfg(unix)]
            Self::Unix(listener) => listener.accept().and_then(|(stream, _)| {
                stream.set_nonblocking(false)?;
                Ok(ConnectionStream::Unix(stream))
            }),
        };
        match accepted {
            Ok(stream) => Ok(Some(stream)),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }
}

impl ControlListener {
    pub(crate) fn bind(endpoint: &SocketEndpoint) -> Result<Self, ControlSocketError> {
        let acceptor = match endpoint {
            SocketEndpoint::Tcp { host, port } => Acceptor::Tcp(bind_tcp(host, *port)?),
            #[cfg(unix)]
            SocketEndpoint::Unix { path } => Acceptor::Unix(bind_unix(path.as_std_path())?),
            #[cfg(not(unix))]
            SocketEndpoint::Unix { .. } => {
                return Err(ControlSocketError::UnixUnavailable {
                    endpoint: endpoint.to_string(),
                });
            }
        };
        Ok(Self {
            endpoint: endpoint.clone(),
            acceptor,
        })
    }

    /// Where scripts should connect; a TCP port of 0 is replaced by the one
    /// the OS assigned.
    pub(crate) fn address(&self) -> String {
        match self.local_addr() {
            Some(addr) => format!("tcp://{addr}"),
            None => self.endpoint.to_string(),
        }
    }

    pub(crate) fn local_addr(&self) -> Option<SocketAddr> {
        match &self.acceptor {
            Acceptor::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            Acceptor::Unix(_) => None,
        }
    }

    /// Moves the socket onto its acceptor thread.
    ///
    /// `on_exit` runs on that thread after the last accept.
    pub(crate) fn start<F>(
        self,
        handler: Arc<dyn ConnectionHandler>,
        mode: AcceptMode,
        on_exit: F,
    ) -> Result<AcceptorHandle, ControlSocketError>
    where
        F: FnOnce() + Send + 'static,
    {
        if let Err(source) = self.acceptor.poll_for_connections() {
            release_endpoint(&self.endpoint);
            return Err(ControlSocketError::PollingMode { source });
        }
        let stop = Arc::new(AtomicBool::new(false));
        let serving = AcceptLoop {
            listener: self,
            stop: Arc::clone(&stop),
            handler,
            mode,
        };
        let thread = thread::Builder::new()
            .name("hostctl-acceptor".to_owned())
            .spawn(move || {
                serving.run();
                on_exit();
            })
            .map_err(|source| ControlSocketError::AcceptorSpawn { source })?;
        Ok(AcceptorHandle {
            stop,
            thread: Some(thread),
        })
    }
}

/// Controls a running acceptor thread.
pub(crate) struct AcceptorHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl AcceptorHandle {
    /// Asks the acceptor to stop at its next poll.
    pub(crate) fn shutdown(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Whether the acceptor has already returned.
    pub(crate) fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    pub(crate) fn join(mut self) -> Result<(), ControlSocketError> {
        self.thread.take().map_or(Ok(()), |thread| {
            thread
                .join()
                .map_err(|_| ControlSocketError::AcceptorPanicked)
        })
    }
}

impl Drop for AcceptorHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct AcceptLoop {
    listener: ControlListener,
    stop: Arc<AtomicBool>,
    handler: Arc<dyn ConnectionHandler>,
    mode: AcceptMode,
}

impl AcceptLoop {
    fn run(&self) {
        let endpoint = &self.listener.endpoint;
        info!(
            target: TRANSPORT_TARGET,
            endpoint = %endpoint,
            once = self.mode == AcceptMode::Once,
            "accepting scripts"
        );
        let mut reported = None::<io::ErrorKind>;
        while !self.stop.load(Ordering::SeqCst) {
            match self.listener.acceptor.next_script() {
                Ok(Some(stream)) => {
                    reported = None;
                    if self.mode == AcceptMode::Once {
                        // Nobody else may connect while the one script runs.
                        release_endpoint(endpoint);
                        self.handler.handle(stream);
                        info!(
                            target: TRANSPORT_TARGET,
                            endpoint = %endpoint,
                            "script finished; no further scripts accepted"
                        );
                        return;
                    }
                    serve_script(Arc::clone(&self.handler), stream);
                }
                Ok(None) => thread::sleep(IDLE_POLL),
                Err(error) => {
                    // Repeats of the same failure are only logged once.
                    if reported.replace(error.kind()) != Some(error.kind()) {
                        warn!(
                            target: TRANSPORT_TARGET,
                            error = %error,
                            "could not accept a script connection"
                        );
                    }
                    thread::sleep(FAILED_ACCEPT_PAUSE);
                }
            }
        }
        debug!(target: TRANSPORT_TARGET, endpoint = %endpoint, "acceptor stopped");
        release_endpoint(endpoint);
    }
}

fn serve_script(handler: Arc<dyn ConnectionHandler>, stream: ConnectionStream) {
    if let Err(error) = thread::Builder::new()
        .name("hostctl-script".to_owned())
        .spawn(move || handler.handle(stream))
    {
        warn!(
            target: TRANSPORT_TARGET,
            error = %error,
            "script connection dropped; no thread to serve it"
        );
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ControlSocketError> {
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|source| ControlSocketError::AddressLookup {
            host: host.to_owned(),
            port,
            source,
        })?
        .next()
        .ok_or_else(|| ControlSocketError::NoAddress {
            host: host.to_owned(),
            port,
        })?;
    TcpListener::bind(addr).map_err(|source| ControlSocketError::TcpBind { addr, source })
}

#[cfg(unix)]
fn bind_unix(path: &Path) -> Result<UnixListener, ControlSocketError> {
    clear_stale_socket(path)?;
    UnixListener::bind(path).map_err(|source| ControlSocketError::UnixBind {
        path: path.display().to_string(),
        source,
    })
}

/// Removes a socket file left by an emulator that is no longer running.
///
/// A path that still answers belongs to a live emulator and is refused, as is
/// one that is not a socket at all.
#[cfg(unix)]
fn clear_stale_socket(path: &Path) -> Result<(), ControlSocketError> {
    let shown = || path.display().to_string();
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(ControlSocketError::SocketInspect {
                path: shown(),
                source,
            });
        }
    };
    if !metadata.file_type().is_socket() {
        return Err(ControlSocketError::NotASocket { path: shown() });
    }
    match UnixStream::connect(path) {
        Ok(_live) => Err(ControlSocketError::SocketBusy { path: shown() }),
        Err(error)
            if matches!(
                error.kind(),
                io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
            ) =>
        {
            fs::remove_file(path).map_err(|source| ControlSocketError::StaleRemoval {
                path: shown(),
                source,
            })
        }
        Err(source) => Err(ControlSocketError::StaleCheck {
            path: shown(),
            source,
        }),
    }
}

/// Deletes the socket file of a Unix endpoint so the path can be reused.
#[cfg(unix)]
fn release_endpoint(endpoint: &SocketEndpoint) {
    let SocketEndpoint::Unix { path } = endpoint else {
        return;
    };
    if let Err(error) = fs::remove_file(path.as_std_path())
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(
            target: TRANSPORT_TARGET,
            error = %error,
            path = %path,
            "control socket file left behind"
        );
    }
}

#[cfg(not(unix))]
const fn release_endpoint(_endpoint: &SocketEndpoint) {}
