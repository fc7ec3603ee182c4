//! `[host:]port` address strings used on command lines.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A parsed `[host:]port` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPort {
    /// Host name or address; `None` when only a port was given.
    pub host: Option<String>,
    /// Non-zero TCP port.
    pub port: u16,
}

/// Errors raised while parsing a `[host:]port` string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostPortError {
    /// The text does not have the `[host:]port` shape.
    #[error("Invalid [host:]port string: {0}")]
    Invalid(String),
    /// Port zero was requested.
    #[error("Port 0 is not valid.")]
    ZeroPort,
}

impl HostPort {
    /// Parses `port` or `host:port`.
    ///
    /// Hosts may contain ASCII letters, digits, `_`, `.` and `-`.
    ///
    /// # Errors
    ///
    /// Returns [`HostPortError::Invalid`] for malformed input and
    /// [`HostPortError::ZeroPort`] when the port is zero.
    pub fn parse(input: &str) -> Result<Self, HostPortError> {
        let invalid = || HostPortError::Invalid(input.to_owned());
        let (host, port_text) = match input.rsplit_once(':') {
            Some((head, tail)) => (Some(head), tail),
            None => (None, input),
        };
        if host.is_some_and(|name| name.is_empty() || !name.chars().all(is_host_char)) {
            return Err(invalid());
        }
        if port_text.is_empty() || !port_text.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(invalid());
        }
        let port: u16 = port_text.parse().map_err(|_| invalid())?;
        if port == 0 {
            return Err(HostPortError::ZeroPort);
        }
        Ok(Self {
            host: host.map(str::to_owned),
            port,
        })
    }
}

const fn is_host_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-')
}

impl FromStr for HostPort {
    type Err = HostPortError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::parse(input)
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Some(host) => write!(formatter, "{host}:{}", self.port),
            None => write!(formatter, "{}", self.port),
        }
    }
}
