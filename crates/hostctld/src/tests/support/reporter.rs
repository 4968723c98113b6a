//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::sync::Mutex;

use hostctl_config::Config;

use crate::bootstrap::BootstrapError;
use crate::channel::ChannelOutcome;
use crate::health::HealthReporter;
use crate::protocol::ChannelError;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// A transport started.
    TransportStarted(String),
    /// A transport stopped.
    TransportStopped(String),
    /// A channel opened for a peer.
    ChannelOpened,
    /// A channel stopped reading after a fatal error.
    ChannelFailed(String),
    /// A channel closed with the rendered outcome.
    ChannelClosed(String),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn transport_started(&self, transport: &str, _address: &str) {
        self.record(HealthEvent::TransportStarted(transport.to_owned()));
    }

    fn transport_stopped(&self, transport: &str) {
        self.record(HealthEvent::TransportStopped(transport.to_owned()));
    }

    fn channel_opened(&self, _peer: &str) {
        self.record(HealthEvent::ChannelOpened);
    }

    fn channel_failed(&self, _peer: &str, error: &ChannelError) {
        self.record(HealthEvent::ChannelFailed(error.to_string()));
    }

    fn channel_closed(&self, _peer: &str, outcome: &ChannelOutcome) {
        self.record(HealthEvent::ChannelClosed(outcome.to_string()));
    }
}
