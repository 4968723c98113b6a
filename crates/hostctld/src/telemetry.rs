//! Daemon logging.
//!
//! stdout belongs to the standard I/O channel, so every log line goes to
//! stderr. Colour is used only when stderr is a terminal.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::fmt::{self, time::UtcTime};
use tracing_subscriber::EnvFilter;

use hostctl_config::{Config, LogFormat};

static INSTALLED: OnceCell<LogFormat> = OnceCell::new();

/// Proof that daemon logging is set up, with the format in effect.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Format of the installed log output.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        self.format
    }
}

/// Why daemon logging could not be set up.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// `log_filter` is not a valid filter directive.
    #[error("log filter '{filter}' is invalid: {reason}")]
    Filter {
        /// The configured directive.
        filter: String,
        /// Parser message.
        reason: String,
    },
    /// Some other logger already owns the process.
    #[error("another logger is already installed: {0}")]
    AlreadyInstalled(SetGlobalDefaultError),
}

/// Sets up daemon logging from `config`.
///
/// Only the first call installs anything; later calls report the format
/// chosen then, whatever `config` now says.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter does not parse or a logger from
/// elsewhere is already in place.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED
        .get_or_try_init(|| install(config).map(|()| config.log_format()))
        .map(|&format| TelemetryHandle { format })
}

fn install(config: &Config) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_new(config.log_filter()).map_err(|error| TelemetryError::Filter {
            filter: config.log_filter().to_owned(),
            reason: error.to_string(),
        })?;
    let stderr = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(stderr.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(stderr.compact().finish()),
    };
    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::AlreadyInstalled)
}
