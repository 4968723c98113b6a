//! State carried through the startup scenarios.

use std::cell::RefCell;
use std::sync::Arc;

use crate::bootstrap::{BootstrapError, ConfigLoader, Daemon, bootstrap_with};
use crate::session::PlaceholderSession;

use super::config_loader::{BadEndpointLoader, TestConfigLoader};
use super::reporter::{HealthEvent, RecordingHealthReporter};

/// One daemon startup attempt and what it left behind.
pub struct StartupWorld {
    loader: Box<dyn ConfigLoader>,
    /// Set when the configuration puts the control socket in a scratch dir.
    scratch: Option<TestConfigLoader>,
    reporter: Arc<RecordingHealthReporter>,
    outcome: Option<Result<Daemon, BootstrapError>>,
}

impl StartupWorld {
    fn with_scratch_socket() -> Self {
        let scratch = TestConfigLoader::new();
        Self {
            loader: Box::new(scratch.clone()),
            scratch: Some(scratch),
            reporter: Arc::new(RecordingHealthReporter::default()),
            outcome: None,
        }
    }

    /// Configuration that names an unsupported control socket scheme.
    pub fn use_bad_endpoint(&mut self) {
        self.loader = Box::new(BadEndpointLoader);
        self.scratch = None;
    }

    /// Puts a plain file where the control socket's directory should go.
    pub fn block_socket_dir(&self) {
        let scratch = self.scratch.as_ref().expect("scratch socket configured");
        std::fs::write(scratch.socket_dir(), b"").expect("write blocking file");
    }

    /// Starts the daemon unless this world already tried.
    pub fn start(&mut self) {
        if self.outcome.is_none() {
            let session = Arc::new(PlaceholderSession::new());
            self.outcome = Some(bootstrap_with(&*self.loader, self.reporter.clone(), session));
        }
    }

    /// The running daemon, if startup worked.
    #[must_use]
    pub fn daemon(&self) -> Option<&Daemon> {
        self.outcome.as_ref().and_then(|outcome| outcome.as_ref().ok())
    }

    /// The startup failure, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&BootstrapError> {
        self.outcome.as_ref().and_then(|outcome| outcome.as_ref().err())
    }

    /// Whether the control socket's directory is a real directory now.
    #[must_use]
    pub fn socket_dir_ready(&self) -> bool {
        self.scratch
            .as_ref()
            .is_some_and(|scratch| scratch.socket_dir().is_dir())
    }

    /// Lifecycle events heard so far.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.reporter.events()
    }
}

/// A world whose configuration is valid, with the socket in a scratch dir.
#[must_use]
pub fn world() -> RefCell<StartupWorld> {
    RefCell::new(StartupWorld::with_scratch_socket())
}
