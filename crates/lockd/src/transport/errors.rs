//! Failures while binding or running a lock server listener.

use std::io;

use thiserror::Error;

/// Errors surfaced while binding or running a socket listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The TCP address did not resolve to anything usable.
    #[error("cannot resolve {address}: {source}")]
    Resolve {
        /// `host:port` as configured.
        address: String,
        /// Resolver error; `AddrNotAvailable` when nothing came back.
        #[source]
        source: io::Error,
    },
    /// The socket could not be bound. For TCP this is usually a port that is
    /// already taken.
    #[error("cannot listen on {endpoint}: {source}")]
    Bind {
        /// Endpoint as displayed in configuration.
        endpoint: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A bound socket could not be queried or configured.
    #[error("cannot configure listener on {endpoint}: {source}")]
    Configure {
        /// Endpoint as displayed in configuration.
        endpoint: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Another process is already serving on the socket path.
    #[error("socket {path} is already being served")]
    SocketBusy {
        /// Socket path.
        path: String,
    },
    /// Something other than a socket sits at the socket path.
    #[error("refusing to replace {path}: not a socket")]
    NotASocket {
        /// Socket path.
        path: String,
    },
    /// Inspecting or removing a leftover socket failed.
    #[error("cannot {action} leftover socket {path}: {source}")]
    StaleSocket {
        /// What was being attempted.
        action: &'static str,
        /// Socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Unix sockets were requested on a platform without them.
    #[error("unix sockets are unsupported for endpoint {endpoint}")]
    UnsupportedUnix {
        /// Endpoint as configured.
        endpoint: String,
    },
    /// A listener or connection thread could not be started.
    #[error("cannot start listener thread: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The accept loop panicked.
    #[error("listener thread panicked")]
    Panicked,
}
