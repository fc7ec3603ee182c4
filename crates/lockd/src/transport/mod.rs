//! Socket listeners for the lock server.
//!
//! Each configured endpoint gets its own listener running an accept loop on a
//! background thread. Accepted connections are given a [`crate::HolderId`]
//! and handed to a [`ConnectionHandler`] on a thread of their own.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod listener_tests;
#[cfg(test)]
mod test_utils;
#[cfg(unix)]
mod unix_path;

pub use self::errors::ListenerError;
pub(crate) use self::handler::{ConnectionHandler, ConnectionStream};
pub(crate) use self::listener::{ListenerHandle, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::RecordingHandler;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
