//! Accept loops for the configured endpoints.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::net::UnixListener;

use tracing::{debug, info, warn};

use lockd_config::SocketEndpoint;

use super::{ConnectionHandler, ConnectionStream, LISTENER_TARGET, ListenerError};
use crate::HolderId;

#[cfg(unix)]
use super::unix_path;

/// Pause between polls while no client is waiting.
const IDLE_POLL: Duration = Duration::from_millis(25);
/// Pause after a failed accept, so a persistent failure does not spin.
const FAILURE_PAUSE: Duration = Duration::from_millis(150);

/// A connection taken off a listening socket, with its lock-holder identity.
#[derive(Debug)]
struct Accepted {
    stream: ConnectionStream,
    holder: HolderId,
}

#[derive(Debug)]
enum Acceptor {
    Tcp(TcpListener),
    /// Unix peers have no useful address, so they are numbered in accept
    /// order instead.
    #[cfg(unix)]
    Unix {
        listener: UnixListener,
        count: u64,
    },
}

impl Acceptor {
    fn set_nonblocking(&self) -> io::Result<()> {
        match self {
            Self::Tcp(listener) => listener.set_nonblocking(true),
            #[cfg(unix)]
            Self::Unix { listener, .. } => listener.set_nonblocking(true),
        }
    }

    /// Takes the next waiting connection, if any.
    fn poll(&mut self) -> io::Result<Option<Accepted>> {
        let accepted = match self {
            Self::Tcp(listener) => listener.accept().and_then(|(stream, peer)| {
                stream.set_nonblocking(false)?;
                Ok(Accepted {
                    stream: ConnectionStream::Tcp(stream),
                    holder: HolderId::from(peer),
                })
            }),
            #[cfg(unix)]
            Self::Unix { listener, count } => listener.accept().and_then(|(stream, _)| {
                stream.set_nonblocking(false)?;
                *count += 1;
                Ok(Accepted {
                    stream: ConnectionStream::Unix(stream),
                    holder: HolderId::unix(*count),
                })
            }),
        };
        match accepted {
            Ok(accepted) => Ok(Some(accepted)),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }
}

/// A bound endpoint that has not started accepting yet.
#[derive(Debug)]
pub(crate) struct SocketListener {
    endpoint: SocketEndpoint,
    acceptor: Acceptor,
}

impl SocketListener {
    /// Binds `endpoint`, clearing away a leftover Unix socket file first.
    pub(crate) fn bind(endpoint: &SocketEndpoint) -> Result<Self, ListenerError> {
        let acceptor = match endpoint {
            SocketEndpoint::Tcp { host, port } => Acceptor::Tcp(bind_tcp(endpoint, host, *port)?),
            #[cfg(unix)]
            SocketEndpoint::Unix { path } => {
                unix_path::claim(path.as_std_path())?;
                let listener = UnixListener::bind(path.as_std_path()).map_err(|source| {
                    ListenerError::Bind {
                        endpoint: endpoint.to_string(),
                        source,
                    }
                })?;
                Acceptor::Unix { listener, count: 0 }
            }
            #[cfg(not(unix))]
            SocketEndpoint::Unix { .. } => {
                return Err(ListenerError::UnsupportedUnix {
                    endpoint: endpoint.to_string(),
                });
            }
        };
        Ok(Self {
            endpoint: endpoint.clone(),
            acceptor,
        })
    }

    /// Endpoint this listener was bound from.
    pub(crate) const fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Bound TCP address with any ephemeral port resolved; `None` for Unix
    /// sockets.
    pub(crate) fn local_addr(&self) -> Result<Option<SocketAddr>, ListenerError> {
        match &self.acceptor {
            Acceptor::Tcp(listener) => listener.local_addr().map(Some).map_err(|source| {
                ListenerError::Configure {
                    endpoint: self.endpoint.to_string(),
                    source,
                }
            }),
            #[cfg(unix)]
            Acceptor::Unix { .. } => Ok(None),
        }
    }

    /// Starts accepting on a background thread. Each connection is served on
    /// a thread of its own by `handler`.
    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<ListenerHandle, ListenerError> {
        if let Err(source) = self.acceptor.set_nonblocking() {
            self.release_path();
            return Err(ListenerError::Configure {
                endpoint: self.endpoint.to_string(),
                source,
            });
        }
        let stop = Arc::new(AtomicBool::new(false));
        let loop_stop = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name(format!("lockd-accept-{}", self.endpoint))
            .spawn(move || self.serve(&loop_stop, &handler))
            .map_err(|source| ListenerError::Spawn { source })?;
        Ok(ListenerHandle {
            stop,
            thread: Some(thread),
        })
    }

    fn serve(mut self, stop: &AtomicBool, handler: &Arc<dyn ConnectionHandler>) {
        info!(target: LISTENER_TARGET, endpoint = %self.endpoint, "accepting connections");
        let mut reported = None::<io::ErrorKind>;
        while !stop.load(Ordering::SeqCst) {
            match self.acceptor.poll() {
                Ok(Some(accepted)) => {
                    reported = None;
                    dispatch(handler, accepted);
                }
                Ok(None) => thread::sleep(IDLE_POLL),
                Err(error) => {
                    if reported.replace(error.kind()) != Some(error.kind()) {
                        warn!(
                            target: LISTENER_TARGET,
                            endpoint = %self.endpoint,
                            error = %error,
                            "accept failed"
                        );
                    }
                    thread::sleep(FAILURE_PAUSE);
                }
            }
        }
        info!(target: LISTENER_TARGET, endpoint = %self.endpoint, "stopped accepting");
        self.release_path();
    }

    fn release_path(&self) {
        #[cfg(unix)]
        if let Some(path) = self.endpoint.unix_path() {
            unix_path::release(path.as_std_path());
        }
    }
}

/// A running accept loop.
///
/// Stopping it refuses new clients; connections already accepted are served
/// until their peers hang up. Dropping the handle stops the loop without
/// waiting for it.
#[derive(Debug)]
pub(crate) struct ListenerHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    pub(crate) fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Waits for the loop to exit; it only does so once stopped.
    pub(crate) fn join(mut self) -> Result<(), ListenerError> {
        self.thread
            .take()
            .map_or(Ok(()), |thread| thread.join().map_err(|_| ListenerError::Panicked))
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn dispatch(handler: &Arc<dyn ConnectionHandler>, accepted: Accepted) {
    let Accepted { stream, holder } = accepted;
    debug!(target: LISTENER_TARGET, %holder, "client connected");
    let handler = Arc::clone(handler);
    let name = format!("lockd-conn-{holder}");
    let spawned = thread::Builder::new().name(name).spawn({
        let holder = holder.clone();
        move || handler.handle(stream, holder)
    });
    if let Err(error) = spawned {
        warn!(
            target: LISTENER_TARGET,
            %holder,
            error = %error,
            "dropping client: cannot start connection thread"
        );
    }
}

fn bind_tcp(
    endpoint: &SocketEndpoint,
    host: &str,
    port: u16,
) -> Result<TcpListener, ListenerError> {
    let address = format!("{host}:{port}");
    let resolved = (host, port)
        .to_socket_addrs()
        .and_then(|mut addrs| {
            addrs
                .next()
                .ok_or_else(|| io::Error::from(io::ErrorKind::AddrNotAvailable))
        })
        .map_err(|source| ListenerError::Resolve { address, source })?;
    TcpListener::bind(resolved).map_err(|source| ListenerError::Bind {
        endpoint: endpoint.to_string(),
        source,
    })
}
