//! Process lifecycle: configuration, listeners, PID file, and shutdown.

mod errors;
mod files;
mod launch;
mod shutdown;

pub use errors::LaunchError;
pub use launch::{RunningServer, run_daemon, run_daemon_with};
pub use shutdown::{STOP_SIGNALS, ShutdownError, ShutdownSignal, SystemShutdownSignal};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
