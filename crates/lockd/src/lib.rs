//! Lock coordination server.
//!
//! `lockd` hands out named exclusive and shared locks to clients connected
//! over TCP or Unix domain sockets. A lock is owned by a connection rather
//! than by a process: when the connection closes, every lock it still holds is
//! released and counted as an orphan. Clients speak the line protocol defined
//! in [`lockd_protocol`]; configuration comes from [`lockd_config`].
//!
//! The [`LockServer`] type holds all shared state and can be driven without
//! sockets, which is how most of the unit tests exercise it. [`RunningServer`]
//! wires it to real listeners, and [`run_daemon`] adds telemetry, the PID file
//! and signal handling for the `lockd` binary.
//!
//! ## Optional commands
//!
//! Dumping lock holders (`d`, `sd`, `dump`) can be disabled, as can the name
//! registry (`iam`). Listing registered clients (`who`) needs both. A
//! disabled command still answers, with `0 disabled`, so clients can tell a
//! switched-off feature from a slow server.

mod dispatch;
mod holder;
mod process;
mod state;
mod telemetry;
mod transport;

pub use dispatch::{LockServer, MAX_LINE_BYTES, Reply};
pub use holder::HolderId;
pub use process::{
    LaunchError, RunningServer, STOP_SIGNALS, ShutdownError, ShutdownSignal, SystemShutdownSignal,
    run_daemon, run_daemon_with,
};
pub use state::{LockTable, OrphanCounts, Registry, ServerState, Stats};
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};
pub use transport::ListenerError;
