//! Layered configuration shared by the `hostctld` daemon and its clients.
//!
//! Values are merged by [`ortho_config`] from, in increasing precedence, the
//! built-in defaults, a TOML file named by `--config-path` (or
//! `HOSTCTL_CONFIG_PATH`), `HOSTCTL_*` environment variables, and command-line
//! flags. The configuration decides which transports carry the action-control
//! channel, how replies are ordered on stream transports, which JSON reply
//! dialect is spoken, and how the daemon logs.

mod channel;
mod defaults;
mod logging;
mod socket;
mod switch;

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use channel::{Dialect, DialectParseError, ReplyOrder, ReplyOrderParseError};
pub use defaults::{
    DEFAULT_HTTP_LISTEN, DEFAULT_HTTP_NAMESPACE, DEFAULT_LOG_FILTER, DEFAULT_SCRIPT_PORT,
    default_http_listen, default_http_namespace, default_log_filter, default_log_format,
    default_script_socket, default_stdio,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{EndpointParseError, SocketDirError, SocketEndpoint};
pub use switch::{Switch, SwitchParseError};

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "HOSTCTL")]
pub struct Config {
    /// Serve a channel over the process's standard input and output.
    #[serde(default = "defaults::default_stdio")]
    pub stdio: Switch,
    /// Listen for controllers on [`Config::script_socket`].
    #[serde(default)]
    pub script_socket_enabled: Switch,
    /// Endpoint of the control socket.
    #[serde(default = "defaults::default_script_socket")]
    pub script_socket: SocketEndpoint,
    /// Stop accepting control connections after the first one is served.
    #[serde(default)]
    pub script_socket_once: Switch,
    /// Serve the HTTP REST surface on [`Config::http_listen`].
    #[serde(default)]
    pub http_enabled: Switch,
    /// Address the REST surface binds to, as `host:port`.
    #[serde(default = "defaults::default_http_listen_string")]
    pub http_listen: String,
    /// First path segment of every REST route.
    #[serde(default = "defaults::default_http_namespace_string")]
    pub http_namespace: String,
    /// JSON reply convention used on stream transports.
    #[serde(default)]
    pub dialect: Dialect,
    /// Reply ordering on the standard I/O channel.
    #[serde(default = "channel::default_stdio_reply_order")]
    pub stdio_reply_order: ReplyOrder,
    /// Reply ordering on control-socket channels.
    #[serde(default = "channel::default_socket_reply_order")]
    pub socket_reply_order: ReplyOrder,
    /// `tracing` filter expression.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stdio: defaults::default_stdio(),
            script_socket_enabled: Switch::Off,
            script_socket: default_script_socket(),
            script_socket_once: Switch::Off,
            http_enabled: Switch::Off,
            http_listen: default_http_listen().to_owned(),
            http_namespace: default_http_namespace().to_owned(),
            dialect: Dialect::default(),
            stdio_reply_order: channel::default_stdio_reply_order(),
            socket_reply_order: channel::default_socket_reply_order(),
            log_filter: default_log_filter().to_owned(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns the aggregated loader error when a source fails to parse.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load()
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// The first item is treated as the program name.
    ///
    /// # Errors
    ///
    /// Returns the aggregated loader error when a source fails to parse.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Whether the standard I/O channel is active.
    #[must_use]
    pub const fn stdio_enabled(&self) -> bool {
        self.stdio.is_on()
    }

    /// The control socket endpoint when the socket transport is enabled.
    #[must_use]
    pub const fn script_socket(&self) -> Option<&SocketEndpoint> {
        if self.script_socket_enabled.is_on() {
            Some(&self.script_socket)
        } else {
            None
        }
    }

    /// Whether the control socket serves a single connection.
    #[must_use]
    pub const fn script_socket_once(&self) -> bool {
        self.script_socket_once.is_on()
    }

    /// The REST listen address when the HTTP transport is enabled.
    #[must_use]
    pub fn http_listen(&self) -> Option<&str> {
        self.http_enabled
            .is_on()
            .then_some(self.http_listen.as_str())
    }

    /// Namespace segment prefixed to REST routes, without slashes.
    #[must_use]
    pub fn http_namespace(&self) -> &str {
        self.http_namespace.trim_matches('/')
    }

    /// JSON reply dialect for stream transports.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Reply ordering for the standard I/O channel.
    #[must_use]
    pub const fn stdio_reply_order(&self) -> ReplyOrder {
        self.stdio_reply_order
    }

    /// Reply ordering for control-socket channels.
    #[must_use]
    pub const fn socket_reply_order(&self) -> ReplyOrder {
        self.socket_reply_order
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
