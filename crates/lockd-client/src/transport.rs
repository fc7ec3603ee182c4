//! Dialling a server endpoint.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

use lockd_config::SocketEndpoint;

use crate::ClientError;

/// An open connection to the server, over either transport.
#[derive(Debug)]
pub(crate) enum Connection {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

trait Duplex: Read + Write {}

impl<T: Read + Write> Duplex for T {}

impl Connection {
    fn duplex(&mut self) -> &mut dyn Duplex {
        match self {
            Self::Tcp(stream) => stream,
            #[cfg(unix)]
            Self::Unix(stream) => stream,
        }
    }

    /// A second handle on the same socket, for the reader thread.
    pub(crate) fn try_clone(&self) -> io::Result<Self> {
        Ok(match self {
            Self::Tcp(stream) => Self::Tcp(stream.try_clone()?),
            #[cfg(unix)]
            Self::Unix(stream) => Self::Unix(stream.try_clone()?),
        })
    }

    /// Closes both directions; a thread blocked reading the socket wakes
    /// with end of file.
    pub(crate) fn shutdown(&self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            Self::Unix(stream) => stream.shutdown(Shutdown::Both),
        }
    }

    /// The client's own TCP address, which is also how the server names it.
    pub(crate) fn local_addr(&self) -> Option<SocketAddr> {
        match self {
            Self::Tcp(stream) => stream.local_addr().ok(),
            #[cfg(unix)]
            Self::Unix(_) => None,
        }
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.duplex().read(buf)
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.duplex().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.duplex().flush()
    }
}

/// Connects to `endpoint`, giving up after `timeout`.
pub(crate) fn connect(
    endpoint: &SocketEndpoint,
    timeout: Duration,
) -> Result<Connection, ClientError> {
    let failed = |source: io::Error| ClientError::Connect {
        endpoint: endpoint.to_string(),
        source: Arc::new(source),
    };
    match endpoint {
        SocketEndpoint::Tcp { host, port } => {
            let address = first_address(host, *port).map_err(|source| ClientError::Resolve {
                endpoint: endpoint.to_string(),
                source: Arc::new(source),
            })?;
            let stream = TcpStream::connect_timeout(&address, timeout).map_err(failed)?;
            // Requests are single short lines.
            let _ = stream.set_nodelay(true);
            Ok(Connection::Tcp(stream))
        }
        #[cfg(unix)]
        SocketEndpoint::Unix { path } => dial_unix(path.as_str(), timeout)
            .map(Connection::Unix)
            .map_err(failed),
        #[cfg(not(unix))]
        SocketEndpoint::Unix { .. } => {
            let _ = (timeout, failed);
            Err(ClientError::UnsupportedUnixTransport(endpoint.to_string()))
        }
    }
}

fn first_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no addresses found"))
}

/// `UnixStream::connect` has no timeout, so the socket is built by hand.
#[cfg(unix)]
fn dial_unix(path: &str, timeout: Duration) -> io::Result<UnixStream> {
    use socket2::{Domain, SockAddr, Socket, Type};

    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    socket.connect_timeout(&SockAddr::unix(path)?, timeout)?;
    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use rstest::rstest;

    use super::*;

    #[test]
    fn connects_over_tcp() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let port = listener.local_addr().expect("listener address").port();
        let endpoint = SocketEndpoint::tcp("127.0.0.1", port);
        let connection = connect(&endpoint, Duration::from_secs(1)).expect("connect");
        let (_, peer) = listener.accept().expect("accept");
        assert_eq!(connection.local_addr(), Some(peer));
    }

    #[rstest]
    fn reports_refused_connections() {
        let port = {
            let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
            listener.local_addr().expect("listener address").port()
        };
        let endpoint = SocketEndpoint::tcp("127.0.0.1", port);
        let error = connect(&endpoint, Duration::from_secs(1)).expect_err("refused");
        assert!(matches!(error, ClientError::Connect { .. }));
        assert!(error.to_string().starts_with("failed to connect to tcp://127.0.0.1:"));
    }

    #[cfg(unix)]
    #[test]
    fn connects_over_unix_sockets() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("lockd.sock");
        let _listener = std::os::unix::net::UnixListener::bind(&path).expect("bind");
        let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
        let connection = connect(&endpoint, Duration::from_secs(1)).expect("connect");
        assert!(connection.local_addr().is_none());
    }
}
