//! Configuration loaders used by the startup tests.

use std::ffi::OsString;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::OrthoError;
use tempfile::TempDir;

use hostctl_config::{Config, SocketEndpoint, Switch};

use crate::bootstrap::ConfigLoader;

/// Loader that places a Unix control socket under a temporary directory.
#[derive(Clone)]
pub struct TestConfigLoader {
    socket_dir: Arc<TempDir>,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory for socket");
        Self {
            socket_dir: Arc::new(dir),
        }
    }

    /// Directory the control socket lives in; startup creates it.
    #[must_use]
    pub fn socket_dir(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.socket_dir.path().join("run"))
            .expect("temporary socket path was not valid UTF-8")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            stdio: Switch::Off,
            script_socket_enabled: Switch::On,
            script_socket: SocketEndpoint::unix(self.socket_dir().join("hostctl.sock")),
            ..Config::default()
        })
    }
}

/// Loader whose command line names a control socket scheme nobody serves.
pub struct BadEndpointLoader;

impl ConfigLoader for BadEndpointLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("hostctld"),
            OsString::from("--script-socket"),
            OsString::from("invalid://socket"),
        ];
        Config::load_from_iter(args)
    }
}
