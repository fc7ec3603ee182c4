//! Line-oriented wire protocol shared by the lockd server and its clients.
//!
//! Every request and every reply is a single `\n`-terminated line of text.
//! The protocol carries no message length and no request identifier: a client
//! pairs replies with requests purely by ordering, so the helpers here are
//! pure functions with no connection state.
//!
//! ```text
//! > g build-cache
//! < 1 Lock Get Success: build-cache
//! > sg readers
//! < 2 Shared Lock Get Success: readers
//! ```

mod command;
mod host_port;
mod reply;
mod request;

pub use command::Command;
pub use host_port::{HostPort, HostPortError};
pub use reply::{DISABLED_REPLY, StatusLine, parse_entry_line};
pub use request::{ProtocolError, Request, split_at_first_space};
