//! Failures of the scripting control socket.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Why the control socket could not be opened or stopped cleanly.
#[derive(Debug, Error)]
pub enum ControlSocketError {
    /// The configured host name did not resolve.
    #[error("control socket host {host}:{port} did not resolve: {source}")]
    AddressLookup {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Resolver error.
        #[source]
        source: io::Error,
    },
    /// The host resolved to nothing usable.
    #[error("control socket host {host}:{port} has no addresses")]
    NoAddress {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
    },
    /// Another listener owns the TCP address, or it is not local.
    #[error("cannot listen for scripts on {addr}: {source}")]
    TcpBind {
        /// Resolved address.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Polled accepts could not be enabled.
    #[error("control socket cannot poll for connections: {source}")]
    PollingMode {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The acceptor thread did not start.
    #[error("control socket acceptor did not start: {source}")]
    AcceptorSpawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Unix endpoints are unavailable on this platform.
    #[cfg(not(unix))]
    #[error("control socket {endpoint} needs unix-domain sockets")]
    UnixUnavailable {
        /// Configured endpoint.
        endpoint: String,
    },
    /// The socket file could not be created.
    #[cfg(unix)]
    #[error("cannot listen for scripts on {path}: {source}")]
    UnixBind {
        /// Socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A live emulator already answers on the path.
    #[cfg(unix)]
    #[error("control socket {path} is served by another emulator")]
    SocketBusy {
        /// Socket path.
        path: String,
    },
    /// A regular file or directory occupies the path.
    #[cfg(unix)]
    #[error("control socket path {path} holds something other than a socket")]
    NotASocket {
        /// Socket path.
        path: String,
    },
    /// The path could not be inspected.
    #[cfg(unix)]
    #[error("cannot inspect control socket path {path}: {source}")]
    SocketInspect {
        /// Socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Connecting to a leftover socket failed for a reason other than refusal.
    #[cfg(unix)]
    #[error("cannot tell whether {path} is stale: {source}")]
    StaleCheck {
        /// Socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A leftover socket file could not be removed.
    #[cfg(unix)]
    #[error("cannot remove leftover control socket {path}: {source}")]
    StaleRemoval {
        /// Socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The acceptor thread panicked.
    #[error("control socket acceptor panicked")]
    AcceptorPanicked,
}
