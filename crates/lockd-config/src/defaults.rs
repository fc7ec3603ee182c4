//! Built-in defaults shared by the server and client.

use std::time::Duration;

/// Default TCP port the server listens on when no endpoint is configured.
pub const DEFAULT_TCP_PORT: u16 = 9999;

/// Interface the server binds when a bare port is given.
pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";

/// Host clients dial when a bare port is given.
pub const DEFAULT_CONNECT_HOST: &str = "localhost";

/// Default log filter expression used by the server.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// How long a client response reader waits before giving up.
///
/// Variable-length replies (stats, dumps) are only complete once this window
/// closes, so raising it trades latency for completeness on slow links.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// How long a client waits for the TCP handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
