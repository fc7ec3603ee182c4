//! Socket endpoints shared by the server listener and the client.
//!
//! An endpoint is written as a URL: `tcp://host:port` or
//! `unix:///path/to/socket`.

use std::fmt;
use std::fs::DirBuilder;
use std::io;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use lockd_protocol::HostPort;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Where the server listens, or where a client connects.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SocketEndpoint {
    /// A TCP host and port. Port 0 asks the system for any free port when
    /// listening.
    Tcp {
        /// Host name or address.
        host: String,
        /// TCP port.
        port: u16,
    },
    /// A Unix domain socket path.
    Unix {
        /// Socket file path.
        path: Utf8PathBuf,
    },
}

impl SocketEndpoint {
    /// TCP endpoint for `host` and `port`.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Unix domain socket endpoint at `path`.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// TCP endpoint for a `[host:]port` pair; a bare port gets `default_host`.
    #[must_use]
    pub fn from_host_port(address: &HostPort, default_host: &str) -> Self {
        let host = address.host.as_deref().unwrap_or(default_host);
        Self::tcp(host, address.port)
    }

    /// Socket file path, for Unix endpoints.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Unix { path } => Some(path.as_path()),
            Self::Tcp { .. } => None,
        }
    }

    /// Creates the directory a Unix socket will live in, owner-only, when it
    /// does not exist yet. Does nothing for TCP endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`SocketPreparationError`] when the directory cannot be
    /// created.
    pub fn prepare_filesystem(&self) -> Result<(), SocketPreparationError> {
        let Some(directory) = self
            .unix_path()
            .and_then(Utf8Path::parent)
            .filter(|parent| !parent.as_str().is_empty())
        else {
            return Ok(());
        };
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        std::os::unix::fs::DirBuilderExt::mode(&mut builder, 0o700);
        match builder.create(directory) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(source) => Err(SocketPreparationError {
                directory: directory.to_owned(),
                source,
            }),
        }
    }
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { host, port } => write!(formatter, "tcp://{host}:{port}"),
            Self::Unix { path } => write!(formatter, "unix://{path}"),
        }
    }
}

impl FromStr for SocketEndpoint {
    type Err = SocketParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input)?;
        let missing = |part| SocketParseError::Missing {
            part,
            input: input.to_owned(),
        };
        match url.scheme() {
            "tcp" => {
                let host = url.host_str().ok_or_else(|| missing("host"))?;
                let port = url.port().ok_or_else(|| missing("port"))?;
                Ok(Self::tcp(host, port))
            }
            "unix" if url.path().is_empty() => Err(missing("path")),
            "unix" => Ok(Self::unix(url.path())),
            scheme => Err(SocketParseError::Scheme(scheme.to_owned())),
        }
    }
}

/// Errors raised while parsing a [`SocketEndpoint`] URL.
#[derive(Debug, Error)]
pub enum SocketParseError {
    /// Neither `tcp` nor `unix`.
    #[error("unsupported socket scheme '{0}'")]
    Scheme(String),
    /// A part the scheme needs was left out.
    #[error("missing {part} in '{input}'")]
    Missing {
        /// `host`, `port` or `path`.
        part: &'static str,
        /// The URL as given.
        input: String,
    },
    /// Not a URL at all.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// The directory for a Unix socket could not be created.
#[derive(Debug, Error)]
#[error("failed to create socket directory '{directory}': {source}")]
pub struct SocketPreparationError {
    /// Directory that was being created.
    pub directory: Utf8PathBuf,
    /// Underlying IO error.
    #[source]
    pub source: io::Error,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::tcp("tcp://127.0.0.1:9000", SocketEndpoint::tcp("127.0.0.1", 9000))]
    #[case::unix("unix:///run/lockd.sock", SocketEndpoint::unix("/run/lockd.sock"))]
    fn parses_endpoint_urls(#[case] input: &str, #[case] expected: SocketEndpoint) {
        let endpoint: SocketEndpoint = input.parse().expect("endpoint should parse");
        assert_eq!(endpoint.to_string(), input);
        assert_eq!(endpoint, expected);
    }

    #[rstest]
    #[case::scheme("http://localhost:80", "unsupported socket scheme 'http'")]
    #[case::port("tcp://localhost", "missing port in 'tcp://localhost'")]
    fn rejects_unusable_urls(#[case] input: &str, #[case] message: &str) {
        let error = input
            .parse::<SocketEndpoint>()
            .expect_err("url should be rejected");
        assert_eq!(error.to_string(), message);
    }

    #[test]
    fn fills_default_host_for_bare_ports() {
        let address = HostPort::parse("6767").expect("bare port");
        assert_eq!(
            SocketEndpoint::from_host_port(&address, "localhost"),
            SocketEndpoint::tcp("localhost", 6767)
        );
    }

    #[test]
    fn creates_missing_socket_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("run").join("lockd.sock");
        let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
        endpoint.prepare_filesystem().expect("prepare directory");
        endpoint.prepare_filesystem().expect("existing directory is fine");
        assert!(dir.path().join("run").is_dir());
        assert!(SocketEndpoint::tcp("localhost", 1).prepare_filesystem().is_ok());
    }
}
