//! Connection settings for a client.

use std::time::Duration;

use lockd_config::defaults::DEFAULT_CONNECT_HOST;
use lockd_config::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT, SocketEndpoint, SocketParseError,
};
use lockd_protocol::{HostPort, HostPortError};

/// Where to connect and how long to wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Server endpoint.
    pub endpoint: SocketEndpoint,
    /// Upper bound on establishing the connection.
    pub connect_timeout: Duration,
    /// How long a response reader waits. Variable-length replies are only
    /// complete when this window closes.
    pub read_timeout: Duration,
}

impl ClientOptions {
    /// Options for `endpoint` with default timeouts.
    #[must_use]
    pub fn new(endpoint: SocketEndpoint) -> Self {
        Self {
            endpoint,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Options for a TCP server given as `[host:]port`; the host defaults to
    /// `localhost`.
    ///
    /// # Errors
    ///
    /// Returns [`HostPortError`] when the address does not parse.
    pub fn tcp(address: &str) -> Result<Self, HostPortError> {
        let address = HostPort::parse(address)?;
        Ok(Self::new(SocketEndpoint::from_host_port(
            &address,
            DEFAULT_CONNECT_HOST,
        )))
    }

    /// Options for an endpoint URL, `tcp://host:port` or
    /// `unix:///path/to/socket`.
    ///
    /// # Errors
    ///
    /// Returns [`SocketParseError`] for anything else.
    pub fn from_url(url: &str) -> Result<Self, SocketParseError> {
        Ok(Self::new(url.parse()?))
    }

    /// Replaces the read timeout.
    #[must_use]
    pub const fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Replaces the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::port_only("9999", "localhost", 9999)]
    #[case::host_and_port("lockd.internal:7000", "lockd.internal", 7000)]
    fn parses_tcp_addresses(#[case] input: &str, #[case] host: &str, #[case] port: u16) {
        let options = ClientOptions::tcp(input).expect("valid address");
        assert_eq!(options.endpoint, SocketEndpoint::tcp(host, port));
        assert_eq!(options.read_timeout, DEFAULT_READ_TIMEOUT);
    }

    #[test]
    fn accepts_unix_socket_urls() {
        let options = ClientOptions::from_url("unix:///run/lockd.sock").expect("valid url");
        assert_eq!(options.endpoint, SocketEndpoint::unix("/run/lockd.sock"));
        assert!(ClientOptions::from_url("9999").is_err());
    }

    #[rstest]
    #[case::zero_port("0")]
    #[case::garbage("not a port")]
    fn rejects_bad_addresses(#[case] input: &str) {
        assert!(ClientOptions::tcp(input).is_err());
    }
}
