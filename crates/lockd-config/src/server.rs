//! Command-line and environment configuration for the server binary.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use clap::Parser;
use lockd_protocol::HostPort;
use thiserror::Error;

use crate::defaults::{DEFAULT_LISTEN_HOST, DEFAULT_LOG_FILTER, DEFAULT_TCP_PORT};
use crate::{Features, LogFormat, SocketEndpoint};

/// Errors raised while loading the server configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Arguments or environment variables failed to parse. Help and version
    /// requests also surface here so the caller decides how to print them.
    #[error(transparent)]
    Cli(#[from] clap::Error),
}

/// Resolved server configuration.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "lockd",
    version,
    about = "Serve named exclusive and shared locks over a line protocol"
)]
pub struct ServerConfig {
    /// TCP [interface:]port to listen on. Defaults to 9999 when no other
    /// endpoint is given.
    #[arg(short = 't', long = "tcp", env = "LOCKD_TCP", value_name = "[HOST:]PORT")]
    tcp: Option<HostPort>,
    /// Unix domain socket path to listen on.
    #[arg(long = "unix", env = "LOCKD_UNIX", value_name = "PATH")]
    unix: Option<Utf8PathBuf>,
    /// Forbid clients from dumping holders of shared and exclusive locks.
    #[arg(long, env = "LOCKD_DISABLE_DUMP")]
    disable_dump: bool,
    /// Forbid clients from assigning themselves friendly names.
    #[arg(long, env = "LOCKD_DISABLE_REGISTRY")]
    disable_registry: bool,
    /// PID file; receives the process ID and the TCP port on two lines.
    #[arg(short = 'p', long, env = "LOCKD_PID_FILE", value_name = "PATH")]
    pid_file: Option<PathBuf>,
    /// Log filter expression (for example `info` or `lockd=debug`).
    #[arg(long, env = "LOCKD_LOG_FILTER", default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,
    /// Log output format.
    #[arg(long, env = "LOCKD_LOG_FORMAT", default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

impl ServerConfig {
    /// Parses configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Cli`] when an option fails to parse, or when
    /// help or version output was requested.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Parses configuration from an explicit argument list; the first item is
    /// the program name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Cli`] when an option fails to parse.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::try_parse_from(args)?)
    }

    /// Endpoints the server should listen on, in bind order.
    #[must_use]
    pub fn endpoints(&self) -> Vec<SocketEndpoint> {
        let mut endpoints = Vec::new();
        if let Some(address) = &self.tcp {
            endpoints.push(SocketEndpoint::from_host_port(address, DEFAULT_LISTEN_HOST));
        }
        if let Some(path) = &self.unix {
            endpoints.push(SocketEndpoint::unix(path.clone()));
        }
        if endpoints.is_empty() {
            endpoints.push(SocketEndpoint::tcp(DEFAULT_LISTEN_HOST, DEFAULT_TCP_PORT));
        }
        endpoints
    }

    /// Feature switches derived from the `--disable-*` flags.
    #[must_use]
    pub const fn features(&self) -> Features {
        Features {
            dump: !self.disable_dump,
            registry: !self.disable_registry,
        }
    }

    /// PID file location, when one was requested.
    #[must_use]
    pub fn pid_file(&self) -> Option<&Path> {
        self.pid_file.as_deref()
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

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tcp: None,
            unix: None,
            disable_dump: false,
            disable_registry: false,
            pid_file: None,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: LogFormat::default(),
        }
    }
}
