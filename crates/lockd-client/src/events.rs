//! Connection-level notifications.

use std::net::SocketAddr;

use crate::ClientError;

/// Something that happened to the connection rather than to one request.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The connection is established and queued requests are being sent.
    Connected {
        /// Local address of a TCP connection; `None` for Unix sockets.
        local_addr: Option<SocketAddr>,
    },
    /// A connection failure, or a line the server sent unprompted.
    Error(ClientError),
    /// The server closed the connection. Not reported for a disconnect the
    /// client asked for.
    Closed,
}
