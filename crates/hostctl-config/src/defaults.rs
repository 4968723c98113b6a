//! Built-in values used when no configuration source provides one.

use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;
use crate::switch::Switch;

/// Default TCP port of the control socket.
pub const DEFAULT_SCRIPT_PORT: u16 = 9981;

/// Default bind address of the REST surface.
pub const DEFAULT_HTTP_LISTEN: &str = "127.0.0.1:4080";

/// Default first path segment of REST routes.
pub const DEFAULT_HTTP_NAMESPACE: &str = "3270";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

pub(crate) fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
///
/// Standard output may carry the control channel, so logs default to the
/// compact human format on standard error.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Standard I/O carries a channel unless configured otherwise.
#[must_use]
pub const fn default_stdio() -> Switch {
    Switch::On
}

/// Default control socket endpoint, bound to loopback only.
#[must_use]
pub fn default_script_socket() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", DEFAULT_SCRIPT_PORT)
}

/// Default REST bind address.
#[must_use]
pub const fn default_http_listen() -> &'static str {
    DEFAULT_HTTP_LISTEN
}

pub(crate) fn default_http_listen_string() -> String {
    DEFAULT_HTTP_LISTEN.to_owned()
}

/// Default REST namespace.
#[must_use]
pub const fn default_http_namespace() -> &'static str {
    DEFAULT_HTTP_NAMESPACE
}

pub(crate) fn default_http_namespace_string() -> String {
    DEFAULT_HTTP_NAMESPACE.to_owned()
}
