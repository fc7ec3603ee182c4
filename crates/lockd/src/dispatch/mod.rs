//! Line dispatch for lock server connections.
//!
//! Each connection thread feeds its lines, in arrival order, to
//! [`LockServer::dispatch`]. A dispatch holds the single state mutex from
//! parsing to reply rendering, so a lock mutation and the counters it bumps
//! are never observed half-applied by another connection.
//!
//! Unknown commands are counted under `invalid_commands` and produce no
//! reply at all; clients tolerate the silence through their read timeout.

mod commands;
mod handler;
mod reply;
mod server;

pub use self::handler::MAX_LINE_BYTES;
pub(crate) use self::handler::LockConnectionHandler;
pub use self::reply::Reply;
pub use self::server::LockServer;

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
