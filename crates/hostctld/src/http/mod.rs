//! HTTP REST binding of the action-control channel.
//!
//! Each request carries one action chain, either in the path (legacy syntax)
//! or in a POST body (any channel syntax). Replies are flat JSON or plain
//! text. The server runs on its own Tokio runtime thread so the rest of the
//! daemon stays synchronous.

mod error;
mod routes;

use std::net::{SocketAddr, TcpListener};
use std::thread;

use tokio::sync::oneshot;
use tracing::info;

pub use self::error::HttpError;
use crate::channel::ChannelContext;

const HTTP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::http");

/// A running REST server.
pub(crate) struct HttpServer {
    address: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<thread::JoinHandle<Result<(), HttpError>>>,
}

impl HttpServer {
    /// Binds `listen` and starts serving on a background thread.
    ///
    /// `on_exit` runs on that thread after serving stops.
    pub(crate) fn start<F>(
        listen: &str,
        namespace: &str,
        context: ChannelContext,
        on_exit: F,
    ) -> Result<Self, HttpError>
    where
        F: FnOnce() + Send + 'static,
    {
        let bind_error = |source| HttpError::Bind {
            address: listen.to_owned(),
            source,
        };
        let listener = TcpListener::bind(listen).map_err(bind_error)?;
        let address = listener.local_addr().map_err(bind_error)?;
        listener
            .set_nonblocking(true)
            .map_err(|source| HttpError::Listener { address, source })?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("hostctl-http-worker")
            .build()
            .map_err(|source| HttpError::Runtime { source })?;
        let router = routes::rest_router(namespace, context);
        let (shutdown, shutdown_requested) = oneshot::channel::<()>();

        let handle = thread::Builder::new()
            .name("hostctl-http".to_owned())
            .spawn(move || {
                let served = runtime.block_on(async move {
                    let acceptor = tokio::net::TcpListener::from_std(listener)
                        .map_err(|source| HttpError::Listener { address, source })?;
                    info!(target: HTTP_TARGET, %address, "REST server listening");
                    axum::serve(acceptor, router)
                        .with_graceful_shutdown(async {
                            let _closed = shutdown_requested.await;
                        })
                        .await
                        .map_err(|source| HttpError::Serve { source })
                });
                on_exit();
                served
            })
            .map_err(|source| HttpError::Spawn { source })?;

        Ok(Self {
            address,
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    /// Bound address, including the port picked by the OS.
    pub(crate) const fn address(&self) -> SocketAddr {
        self.address
    }

    /// Stops accepting requests and waits for in-flight ones to finish.
    pub(crate) fn stop(mut self) -> Result<(), HttpError> {
        if let Some(shutdown) = self.shutdown.take() {
            let _already_stopped = shutdown.send(());
        }
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| HttpError::ThreadPanic)?,
            None => Ok(()),
        }
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _already_stopped = shutdown.send(());
        }
    }
}
