//! Blocking client for the lockd lock server.
//!
//! ```no_run
//! use lockd_client::{ClientOptions, LockdClient};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LockdClient::connect(ClientOptions::tcp("localhost:9999")?)?;
//! client.get("build-cache")?;
//! // ... exclusive work ...
//! client.release("build-cache")?;
//! client.disconnect()?;
//! # Ok(())
//! # }
//! ```
//!
//! The protocol carries no request identifiers, so a client keeps exactly
//! one request in flight and pairs each reply with the request written
//! before it. How long to wait for a reply is decided per request by a
//! [`ReadPolicy`]; replies of unknown length (stats, dumps) are complete only
//! once [`ClientOptions::read_timeout`] has passed, so that timeout trades
//! latency for completeness.

mod client;
mod errors;
mod events;
mod options;
mod queue;
mod reader;
mod transport;

pub use client::{LockReply, LockdClient};
pub use errors::ClientError;
pub use events::ClientEvent;
pub use options::ClientOptions;
pub use reader::ReadPolicy;

const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");
