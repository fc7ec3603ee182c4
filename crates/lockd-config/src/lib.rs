//! Shared configuration for the lockd server and client.
//!
//! The server reads a [`ServerConfig`] from its command line (every flag can
//! also be supplied through a `LOCKD_`-prefixed environment variable). Both
//! binaries agree on [`SocketEndpoint`] for describing where the server
//! listens and on the defaults in [`defaults`].

pub mod defaults;
mod features;
mod logging;
mod server;
mod socket;

pub use defaults::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_LOG_FILTER, DEFAULT_READ_TIMEOUT, DEFAULT_TCP_PORT,
};
pub use features::Features;
pub use logging::LogFormat;
pub use server::{ConfigError, ServerConfig};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};
