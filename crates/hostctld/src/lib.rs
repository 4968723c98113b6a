//! The hostctl daemon: an action-control channel for a terminal emulator
//! session.
//!
//! Controllers drive the session by sending actions (`Connect(host)`,
//! `Wait(InputField)`, `Query(Cursor)` and so on) and reading one reply per
//! request. The same channel is offered over several transports:
//!
//! - the process's standard input and output;
//! - a control socket, TCP or Unix domain, one channel per connection;
//! - an HTTP REST surface, one action chain per request.
//!
//! Stream transports accept three request syntaxes on the same connection:
//! the legacy `Action(arg, …)` text form, JSON `run` objects, and flat JSON
//! action objects or arrays. Every request is replied to in the syntax it
//! arrived in. Independent requests run concurrently, so a quick `Query` is
//! answered while an earlier `Wait` is still blocked; the reply order is
//! configurable per transport.
//!
//! The crate is layered bottom-up:
//!
//! - [`protocol`] frames input units, detects their syntax, parses them into
//!   requests and encodes replies;
//! - [`channel`] schedules requests, sequences replies and tracks whether a
//!   channel still accepts input;
//! - [`session`] is the seam to the emulator, with a placeholder session so
//!   the daemon runs on its own;
//! - the transports, bootstrap and process supervision wire those pieces to
//!   configuration from [`hostctl_config`] and structured logs via `tracing`.

mod bootstrap;
pub mod channel;
mod health;
mod http;
mod process;
pub mod protocol;
pub mod session;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use http::HttpError;
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ControlSocketError;

#[cfg(test)]
mod tests;
