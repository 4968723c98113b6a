//! Connection handling for the control socket.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

use tracing::{debug, warn};

use super::TRANSPORT_TARGET;
use crate::channel::{ChannelContext, ChannelSettings, run_channel};

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// Stream types accepted by the control-socket listener.
#[derive(Debug)]
pub(crate) enum ConnectionStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl ConnectionStream {
    /// Describes the remote end for logs.
    pub(crate) fn peer(&self) -> String {
        match self {
            Self::Tcp(stream) => stream
                .peer_addr()
                .map_or_else(|_| "tcp".to_owned(), |addr| format!("tcp://{addr}")),
            #[cfg(unix)]
            Self::Unix(_) => "unix".to_owned(),
        }
    }

    pub(crate) fn try_clone(&self) -> io::Result<Self> {
        match self {
            Self::Tcp(stream) => stream.try_clone().map(Self::Tcp),
            #[cfg(unix)]
            Self::Unix(stream) => stream.try_clone().map(Self::Unix),
        }
    }

    /// Shuts both directions down, waking any blocked reader.
    pub(crate) fn shutdown(&self) {
        let result = match self {
            Self::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            Self::Unix(stream) => stream.shutdown(Shutdown::Both),
        };
        if let Err(error) = result
            && error.kind() != io::ErrorKind::NotConnected
        {
            debug!(
                target: TRANSPORT_TARGET,
                error = %error,
                "connection shutdown failed"
            );
        }
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

/// Serves scripts arriving on the control socket.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Serves one script until it disconnects.
    fn handle(&self, stream: ConnectionStream);
}

/// Serves each connection as an independent action-control channel.
pub(crate) struct ChannelConnectionHandler {
    context: ChannelContext,
    settings: ChannelSettings,
}

impl ChannelConnectionHandler {
    pub(crate) const fn new(context: ChannelContext, settings: ChannelSettings) -> Self {
        Self { context, settings }
    }
}

impl ConnectionHandler for ChannelConnectionHandler {
    fn handle(&self, stream: ConnectionStream) {
        let peer = stream.peer();
        let (input, closer) = match (stream.try_clone(), stream.try_clone()) {
            (Ok(input), Ok(closer)) => (input, closer),
            (Err(error), _) | (_, Err(error)) => {
                warn!(
                    target: TRANSPORT_TARGET,
                    peer = %peer,
                    error = %error,
                    "failed to clone connection"
                );
                stream.shutdown();
                return;
            }
        };
        run_channel(
            &self.context,
            self.settings,
            &peer,
            input,
            stream,
            move || closer.shutdown(),
        );
    }
}
