//! Errors raised by the REST surface.

use std::io;
use std::net::SocketAddr;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::protocol::flat_reply;

/// Errors raised while starting or running the REST server.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The listen address could not be parsed or bound.
    #[error("failed to bind HTTP listener at {address}: {source}")]
    Bind {
        /// Configured listen address.
        address: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The bound listener could not be prepared for async use.
    #[error("failed to prepare HTTP listener at {address}: {source}")]
    Listener {
        /// Bound address.
        address: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The async runtime could not be built.
    #[error("failed to build HTTP runtime: {source}")]
    Runtime {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The server thread could not be spawned.
    #[error("failed to spawn HTTP server thread: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Serving stopped with an error.
    #[error("HTTP server failed: {source}")]
    Serve {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The server thread panicked.
    #[error("HTTP server thread panicked")]
    ThreadPanic,
}

/// Failure of one REST request, rendered as a flat reply.
#[derive(Debug, Error)]
pub(crate) enum RequestError {
    #[error("{message}")]
    Rejected { message: String, status: String },
    #[error("no route for {path}")]
    NotFound { path: String, status: String },
    #[error("action execution failed: {message}")]
    Execution { message: String, status: String },
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let code = match &self {
            Self::Rejected { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Execution { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let text = self.to_string();
        let (Self::Rejected { status, .. }
        | Self::NotFound { status, .. }
        | Self::Execution { status, .. }) = self;
        (code, Json(flat_reply(vec![text], false, status))).into_response()
    }
}
