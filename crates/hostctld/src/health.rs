//! Lifecycle events of the daemon, its transports and their channels.

use std::sync::Arc;

use hostctl_config::Config;

use crate::bootstrap::BootstrapError;
use crate::channel::ChannelOutcome;
use crate::protocol::ChannelError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Receives every lifecycle event the daemon emits.
pub trait HealthReporter: Send + Sync {
    /// Startup has begun; nothing is loaded yet.
    fn bootstrap_starting(&self);

    /// Startup finished with `config` in effect.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Startup gave up with `error`.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once a transport is accepting controllers.
    fn transport_started(&self, transport: &str, address: &str);

    /// Invoked after a transport stops.
    fn transport_stopped(&self, transport: &str);

    /// Invoked when a channel starts reading input.
    fn channel_opened(&self, peer: &str);

    /// Invoked when a channel stopped reading because of a fatal error.
    fn channel_failed(&self, peer: &str, error: &ChannelError);

    /// Invoked after a channel's output side closes.
    fn channel_closed(&self, peer: &str, outcome: &ChannelOutcome);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn transport_started(&self, transport: &str, address: &str) {
        (**self).transport_started(transport, address);
    }

    fn transport_stopped(&self, transport: &str) {
        (**self).transport_stopped(transport);
    }

    fn channel_opened(&self, peer: &str) {
        (**self).channel_opened(peer);
    }

    fn channel_failed(&self, peer: &str, error: &ChannelError) {
        (**self).channel_failed(peer, error);
    }

    fn channel_closed(&self, peer: &str, outcome: &ChannelOutcome) {
        (**self).channel_closed(peer, outcome);
    }
}

/// Writes each lifecycle event to the log as structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// The log-backed reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "emulator control daemon starting"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            stdio = config.stdio_enabled(),
            script_socket = ?config.script_socket().map(ToString::to_string),
            http_listen = ?config.http_listen(),
            dialect = %config.dialect(),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "emulator control daemon ready"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "emulator control daemon could not start"
        );
    }

    fn transport_started(&self, transport: &str, address: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "transport_started",
            transport,
            address,
            "transport accepting controllers"
        );
    }

    fn transport_stopped(&self, transport: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "transport_stopped",
            transport,
            "transport stopped"
        );
    }

    fn channel_opened(&self, peer: &str) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "channel_opened",
            peer,
            "channel opened"
        );
    }

    fn channel_failed(&self, peer: &str, error: &ChannelError) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "channel_failed",
            peer,
            error = %error,
            location = ?error.location(),
            "channel stopped reading after a fatal error"
        );
    }

    fn channel_closed(&self, peer: &str, outcome: &ChannelOutcome) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "channel_closed",
            peer,
            outcome = %outcome,
            "channel closed"
        );
    }
}
