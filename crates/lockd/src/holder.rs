//! Connection identity used as the owner of every lock.

use std::fmt;
use std::net::SocketAddr;

use serde::Serialize;

/// Identifies one open connection for as long as it stays open.
///
/// TCP peers are identified by their remote `ip:port`; Unix-socket peers by a
/// listener-assigned sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct HolderId(String);

impl HolderId {
    /// Wraps an arbitrary identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity for the `sequence`-th Unix-socket connection.
    pub fn unix(sequence: u64) -> Self {
        Self(format!("unix:{sequence}"))
    }

    /// Borrows the identity text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<SocketAddr> for HolderId {
    fn from(address: SocketAddr) -> Self {
        Self(address.to_string())
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}
