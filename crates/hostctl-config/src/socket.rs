//! Where scripts reach the control socket.
//!
//! On the command line and in the environment an endpoint is a URL,
//! `tcp://host:port` or `unix:///path`. Configuration files may also spell it
//! as a table tagged by `transport`.

use std::fmt;
use std::fs::DirBuilder;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;
use url::Url;

/// Address of the scripting control socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEndpoint {
    /// A Unix-domain socket file.
    Unix {
        /// Socket file; its directory is created on startup.
        path: Utf8PathBuf,
    },
    /// A TCP port.
    Tcp {
        /// Interface to listen on.
        host: String,
        /// Port; `0` lets the OS choose.
        port: u16,
    },
}

impl SocketEndpoint {
    /// A socket file at `path`.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// A TCP port on `host`.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// The socket file, for Unix endpoints.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Unix { path } => Some(path.as_path()),
            Self::Tcp { .. } => None,
        }
    }

    /// Makes sure the directory that will hold a Unix socket exists.
    ///
    /// A missing directory is created readable by the owner only. An existing
    /// one is used as it is.
    ///
    /// # Errors
    ///
    /// Returns [`SocketDirError`] when the path names no directory or the
    /// directory cannot be created.
    pub fn ensure_socket_dir(&self) -> Result<(), SocketDirError> {
        let Some(path) = self.unix_path() else {
            return Ok(());
        };
        let dir = match path.parent() {
            Some(dir) if !dir.as_str().is_empty() => dir,
            _ => {
                return Err(SocketDirError::NoParent {
                    socket: path.to_path_buf(),
                });
            }
        };

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        std::os::unix::fs::DirBuilderExt::mode(&mut builder, 0o700);

        builder.create(dir).or_else(|source| {
            if dir.is_dir() {
                Ok(())
            } else {
                Err(SocketDirError::Create {
                    dir: dir.to_path_buf(),
                    source,
                })
            }
        })
    }
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix { path } => write!(formatter, "unix://{path}"),
            Self::Tcp { host, port } => write!(formatter, "tcp://{host}:{port}"),
        }
    }
}

impl FromStr for SocketEndpoint {
    type Err = EndpointParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(text)?;
        let missing = |part: &'static str| EndpointParseError::Missing {
            part,
            endpoint: text.to_owned(),
        };
        match url.scheme() {
            "tcp" => {
                let host = url.host_str().ok_or_else(|| missing("host"))?;
                let port = url.port().ok_or_else(|| missing("port"))?;
                Ok(Self::tcp(host, port))
            }
            "unix" if url.path().is_empty() => Err(missing("socket path")),
            "unix" => Ok(Self::unix(url.path())),
            scheme => Err(EndpointParseError::Scheme(scheme.to_owned())),
        }
    }
}

impl Serialize for SocketEndpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EndpointRepr {
    Url(String),
    Table(EndpointTable),
}

#[derive(Deserialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
enum EndpointTable {
    Unix { path: Utf8PathBuf },
    Tcp { host: String, port: u16 },
}

impl<'de> Deserialize<'de> for SocketEndpoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match EndpointRepr::deserialize(deserializer)? {
            EndpointRepr::Url(text) => text.parse().map_err(de::Error::custom)?,
            EndpointRepr::Table(EndpointTable::Unix { path }) => Self::Unix { path },
            EndpointRepr::Table(EndpointTable::Tcp { host, port }) => Self::Tcp { host, port },
        })
    }
}

/// Why a control socket URL was refused.
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// Only `tcp` and `unix` are served.
    #[error("control socket scheme '{0}' is neither tcp nor unix")]
    Scheme(String),
    /// A required part of the URL is absent.
    #[error("control socket '{endpoint}' has no {part}")]
    Missing {
        /// Which part.
        part: &'static str,
        /// The URL as given.
        endpoint: String,
    },
    /// Not a URL at all.
    #[error("control socket is not a URL: {0}")]
    NotUrl(#[from] url::ParseError),
}

/// Why the control socket's directory is unusable.
#[derive(Debug, Error)]
pub enum SocketDirError {
    /// The socket path is a bare file name.
    #[error("control socket '{socket}' names no directory")]
    NoParent {
        /// Configured socket path.
        socket: Utf8PathBuf,
    },
    /// The directory could not be created.
    #[error("cannot create control socket directory '{dir}': {source}")]
    Create {
        /// Directory that could not be created.
        dir: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
