//! Stream transports for the action-control channel.
//!
//! The control socket binds a configured endpoint and serves every accepted
//! connection as its own channel. The standard I/O binding serves a single
//! channel over the process's stdin and stdout.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod listener_tests;
mod stdio;
#[cfg(test)]
mod test_utils;

pub use self::errors::ControlSocketError;
pub(crate) use self::handler::{ChannelConnectionHandler, ConnectionHandler, ConnectionStream};
pub(crate) use self::listener::{AcceptMode, AcceptorHandle, ControlListener};
pub(crate) use self::stdio::spawn_stdio_channel;
#[cfg(test)]
pub(crate) use self::test_utils::CountingHandler;

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
