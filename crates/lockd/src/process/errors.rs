//! Defines the error surface for starting and stopping the server process.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use lockd_config::{ConfigError, SocketPreparationError};

use crate::telemetry::TelemetryError;
use crate::transport::ListenerError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching or supervising the server process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Configuration failed to load. Help and version requests land here too.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Telemetry could not be installed.
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    /// Preparing a Unix socket directory failed.
    #[error("failed to prepare server socket: {0}")]
    Socket(#[from] SocketPreparationError),
    /// Binding or running a listener failed.
    #[error("listener error: {0}")]
    Listener(#[from] ListenerError),
    /// The PID file could not be written.
    #[error("failed to write PID file '{path}': {source}")]
    PidFile {
        /// PID file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Waiting for a shutdown signal failed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}
