//! Blocking until the server is asked to stop.

use std::ffi::c_int;
use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use signal_hook::low_level::signal_name;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Signals that stop a running server.
pub const STOP_SIGNALS: [c_int; 4] = [SIGTERM, SIGINT, SIGQUIT, SIGHUP];

/// Something the daemon can block on until it should stop serving.
pub trait ShutdownSignal: Send + Sync {
    /// Returns once the server should stop.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] when the trigger cannot be watched at all.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// The stop trigger could not be installed.
#[derive(Debug, Error)]
#[error("cannot watch for stop signals: {0}")]
pub struct ShutdownError(#[from] io::Error);

/// Waits for any of [`STOP_SIGNALS`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemShutdownSignal;

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals = Signals::new(STOP_SIGNALS)?;
        let received = signals.forever().next();
        let name = received.and_then(signal_name).unwrap_or("unknown");
        info!(target: PROCESS_TARGET, signal = name, "stopping on signal");
        Ok(())
    }
}
