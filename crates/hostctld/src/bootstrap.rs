//! Bringing the daemon up before any transport starts.

use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use hostctl_config::{Config, SocketDirError};

use crate::channel::ChannelContext;
use crate::health::HealthReporter;
use crate::session::{ActionExecutor, StatusProvider};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Source of the daemon's resolved configuration.
pub trait ConfigLoader: Send + Sync {
    /// Resolves defaults, file, environment and command line into one value.
    ///
    /// # Errors
    ///
    /// Returns the loader error when a configuration source fails to parse.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Reads the real process arguments, environment and configuration file.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Hands back a configuration that was resolved up front.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Serves `config` on every load.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Why the daemon could not come up.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// A configuration layer was unreadable or invalid.
    #[error("configuration rejected: {0}")]
    Config(#[from] Arc<OrthoError>),
    /// Logging could not be set up.
    #[error(transparent)]
    Logging(#[from] TelemetryError),
    /// The control socket's directory is unusable.
    #[error(transparent)]
    SocketDir(#[from] SocketDirError),
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    executor: Arc<dyn ActionExecutor>,
    status: Arc<dyn StatusProvider>,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Lifecycle reporter shared with transports.
    #[must_use]
    pub fn reporter(&self) -> Arc<dyn HealthReporter> {
        Arc::clone(&self.reporter)
    }

    /// Builds the context every channel of this daemon shares.
    #[must_use]
    pub fn channel_context(&self) -> ChannelContext {
        ChannelContext::new(
            Arc::clone(&self.executor),
            Arc::clone(&self.status),
            Arc::clone(&self.reporter),
        )
    }
}

/// Brings the daemon up around `session`, which executes every action.
///
/// Configuration is loaded, logging installed and the control socket's
/// directory made ready, in that order. `reporter` hears about the attempt
/// and its outcome.
///
/// # Errors
///
/// Returns the first [`BootstrapError`] met.
pub fn bootstrap_with<S>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    session: Arc<S>,
) -> Result<Daemon, BootstrapError>
where
    S: ActionExecutor + StatusProvider + 'static,
{
    reporter.bootstrap_starting();
    let (config, telemetry) = match ready_environment(loader) {
        Ok(ready) => ready,
        Err(error) => {
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };
    reporter.bootstrap_succeeded(&config);
    let executor: Arc<dyn ActionExecutor> = session.clone();
    Ok(Daemon {
        config,
        executor,
        status: session,
        telemetry,
        reporter,
    })
}

fn ready_environment(
    loader: &dyn ConfigLoader,
) -> Result<(Config, TelemetryHandle), BootstrapError> {
    let config = loader.load()?;
    let telemetry = telemetry::initialise(&config)?;
    if let Some(endpoint) = config.script_socket() {
        endpoint.ensure_socket_dir()?;
    }
    Ok((config, telemetry))
}
