//! Errors reported by client operations and connection events.

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Failure of a client operation, or of the connection itself.
///
/// Errors are cheap to clone so that one connection failure can be handed to
/// every request that was waiting on it.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The TCP host name could not be resolved.
    #[error("failed to resolve {endpoint}: {source}")]
    Resolve {
        /// Endpoint being dialled.
        endpoint: String,
        /// Resolver error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The connection could not be established.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        /// Endpoint being dialled.
        endpoint: String,
        /// Underlying IO error.
        #[source]
        source: Arc<io::Error>,
    },
    /// Unix sockets were requested on a platform without them.
    #[error("unix sockets are unsupported for endpoint {0}")]
    UnsupportedUnixTransport(String),
    /// Reading from or writing to the connection failed.
    #[error("connection error: {0}")]
    Io(#[source] Arc<io::Error>),
    /// The server answered a lock request with a `0` status.
    #[error("{0}")]
    Rejected(String),
    /// The server has the dump feature switched off.
    #[error("The dump feature of the lockd server is disabled.")]
    DumpDisabled,
    /// The server has the registry feature switched off.
    #[error("The registry feature of the lockd server is disabled.")]
    RegistryDisabled,
    /// Listing clients needs both the dump and registry features.
    #[error("The dump and/or registry features of the lockd server are disabled.")]
    ListingDisabled,
    /// A fixed-count read timed out before enough lines arrived.
    #[error("Expected {expected} {} but got {received}", line_noun(.expected))]
    LineCount {
        /// Lines the reader was waiting for.
        expected: usize,
        /// Lines that arrived before the timeout.
        received: usize,
    },
    /// A line arrived while no request was waiting for one.
    #[error("Unexpected data received from lockd server: {0}")]
    UnexpectedData(String),
    /// A reply line did not have the shape its command produces.
    #[error("Malformed reply from lockd server: {0}")]
    Malformed(String),
    /// The server closed the connection while a reply was outstanding.
    #[error("connection to lockd server lost")]
    ConnectionLost,
    /// The client was disconnected before the request could complete.
    #[error("client disconnected")]
    Disconnected,
    /// The worker thread that owns the connection panicked.
    #[error("client worker thread panicked")]
    WorkerPanic,
}

impl From<io::Error> for ClientError {
    fn from(error: io::Error) -> Self {
        Self::Io(Arc::new(error))
    }
}

fn line_noun(count: &usize) -> &'static str {
    if *count == 1 { "line" } else { "lines" }
}
