//! Defines the unified error surface for daemon launch and supervision.

use std::io;

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::http::HttpError;
use crate::transport::ControlSocketError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching or supervising the daemon process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrapping the daemon failed.
    #[error("daemon bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[source]
        source: BootstrapError,
    },
    /// The configuration enables no transport.
    #[error("no transport enabled; enable stdio, the control socket or HTTP")]
    NoTransport,
    /// The scripting control socket failed.
    #[error("{source}")]
    ControlSocket {
        /// Underlying socket error.
        #[source]
        source: ControlSocketError,
    },
    /// The REST server failed.
    #[error("HTTP server failed: {source}")]
    Http {
        /// Underlying server error.
        #[source]
        source: HttpError,
    },
    /// The standard I/O channel could not be started.
    #[error("failed to start the standard I/O channel: {source}")]
    Stdio {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Waiting for shutdown failed.
    #[error("failed to await shutdown signal: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[source]
        source: ShutdownError,
    },
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<ControlSocketError> for LaunchError {
    fn from(source: ControlSocketError) -> Self {
        Self::ControlSocket { source }
    }
}

impl From<HttpError> for LaunchError {
    fn from(source: HttpError) -> Self {
        Self::Http { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}
