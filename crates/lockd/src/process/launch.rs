//! Starts the listeners and supervises them until shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use lockd_config::{Features, ServerConfig, SocketEndpoint};

use crate::dispatch::{LockConnectionHandler, LockServer};
use crate::telemetry;
use crate::transport::{ConnectionHandler, ListenerHandle, SocketListener};

use super::files::PidFile;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use super::{LaunchError, PROCESS_TARGET};

/// A lock server accepting connections on one or more endpoints.
#[derive(Debug)]
pub struct RunningServer {
    server: Arc<LockServer>,
    listeners: Vec<ListenerHandle>,
    tcp_addr: Option<SocketAddr>,
}

impl RunningServer {
    /// Binds every endpoint and starts accepting connections.
    ///
    /// Listeners started before a failing bind are stopped again when the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Socket`] or [`LaunchError::Listener`] when an
    /// endpoint cannot be prepared or bound.
    pub fn start(endpoints: &[SocketEndpoint], features: Features) -> Result<Self, LaunchError> {
        let server = Arc::new(LockServer::new(features));
        let handler: Arc<dyn ConnectionHandler> =
            Arc::new(LockConnectionHandler::new(Arc::clone(&server)));
        let mut listeners = Vec::with_capacity(endpoints.len());
        let mut tcp_addr = None;
        for endpoint in endpoints {
            endpoint.prepare_filesystem()?;
            let listener = SocketListener::bind(endpoint)?;
            let bound = listener.local_addr()?;
            info!(
                target: PROCESS_TARGET,
                endpoint = %listener.endpoint(),
                bound = ?bound,
                "listener bound"
            );
            tcp_addr = tcp_addr.or(bound);
            listeners.push(listener.start(Arc::clone(&handler))?);
        }
        Ok(Self {
            server,
            listeners,
            tcp_addr,
        })
    }

    /// Address of the first TCP listener, with any ephemeral port resolved.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> {
        self.tcp_addr
    }

    /// The shared lock state served by every listener.
    #[must_use]
    pub fn lock_server(&self) -> &Arc<LockServer> {
        &self.server
    }

    /// Stops accepting connections and waits for the accept loops to exit.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Listener`] when an accept loop panicked.
    pub fn shutdown(self) -> Result<(), LaunchError> {
        for listener in &self.listeners {
            listener.stop();
        }
        for listener in self.listeners {
            listener.join()?;
        }
        Ok(())
    }
}

/// Runs the server with configuration from the command line and
/// environment until a termination signal arrives.
///
/// # Errors
///
/// Returns a [`LaunchError`] when configuration, telemetry, binding or the
/// PID file fail.
pub fn run_daemon() -> Result<(), LaunchError> {
    let config = ServerConfig::load()?;
    telemetry::initialise(config.log_filter(), config.log_format())?;
    run_daemon_with(&config, &SystemShutdownSignal)
}

/// Runs the server with an explicit configuration and shutdown trigger.
///
/// # Errors
///
/// Returns a [`LaunchError`] when binding, the PID file, or waiting for the
/// shutdown trigger fail.
pub fn run_daemon_with<S>(config: &ServerConfig, shutdown: &S) -> Result<(), LaunchError>
where
    S: ShutdownSignal + ?Sized,
{
    let features = config.features();
    info!(
        target: PROCESS_TARGET,
        dump = features.dump,
        registry = features.registry,
        "starting lock server"
    );
    let running = RunningServer::start(&config.endpoints(), features)?;
    let pid_file = config
        .pid_file()
        .map(|path| PidFile::create(path, std::process::id(), running.local_addr()))
        .transpose()?;
    info!(target: PROCESS_TARGET, "lock server ready");

    shutdown.wait()?;
    running.shutdown()?;
    drop(pid_file);
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}
