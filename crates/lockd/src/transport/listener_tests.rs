//! Behaviour of bound listeners: holder identities and socket file hygiene.

use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rstest::rstest;

use lockd_config::SocketEndpoint;

use super::listener::{ListenerHandle, SocketListener};
use super::{ListenerError, RecordingHandler};
use crate::HolderId;

/// A started listener plus everything its handler has seen.
struct Running {
    handle: ListenerHandle,
    holders: Arc<Mutex<Vec<HolderId>>>,
}

impl Running {
    fn start(listener: SocketListener) -> Self {
        let (holders, handler) = RecordingHandler::new();
        let handle = listener.start(handler).expect("start listener");
        Self { handle, holders }
    }

    /// Sorted holders once `count` connections arrived, or whatever arrived
    /// within two seconds.
    fn holders(&self, count: usize) -> Vec<HolderId> {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let mut seen = self.holders.lock().expect("holders lock").clone();
            if seen.len() >= count || Instant::now() >= deadline {
                seen.sort();
                return seen;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn stop(self) {
        self.handle.stop();
        self.handle.join().expect("join listener");
    }
}

fn ephemeral_tcp() -> SocketListener {
    SocketListener::bind(&SocketEndpoint::tcp("127.0.0.1", 0)).expect("bind tcp listener")
}

#[rstest]
fn tcp_holders_are_peer_addresses() {
    let listener = ephemeral_tcp();
    let addr = listener
        .local_addr()
        .expect("local address")
        .expect("tcp listeners report an address");
    assert_ne!(addr.port(), 0);
    let running = Running::start(listener);

    let clients = [
        TcpStream::connect(addr).expect("connect"),
        TcpStream::connect(addr).expect("connect"),
    ];
    let mut expected: Vec<HolderId> = clients
        .iter()
        .map(|client| HolderId::from(client.local_addr().expect("client address")))
        .collect();
    expected.sort();

    assert_eq!(running.holders(2), expected);
    running.stop();
}

#[rstest]
fn taken_port_fails_to_bind() {
    let first = ephemeral_tcp();
    let port = first.local_addr().expect("address").expect("tcp").port();
    let error = SocketListener::bind(&SocketEndpoint::tcp("127.0.0.1", port))
        .expect_err("port is taken");
    assert!(matches!(error, ListenerError::Bind { .. }));
    assert!(error.to_string().contains(&port.to_string()));
}

#[cfg(unix)]
mod unix {
    use std::os::unix::net::{UnixListener, UnixStream};
    use std::path::PathBuf;

    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;

    struct SocketDir {
        _dir: TempDir,
        path: PathBuf,
    }

    impl SocketDir {
        fn endpoint(&self) -> SocketEndpoint {
            SocketEndpoint::unix(self.path.to_str().expect("utf8 path"))
        }
    }

    #[fixture]
    fn socket_dir() -> SocketDir {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("lockd.sock");
        SocketDir { _dir: dir, path }
    }

    #[rstest]
    fn connections_are_numbered_from_one(socket_dir: SocketDir) {
        let listener = SocketListener::bind(&socket_dir.endpoint()).expect("bind");
        assert_eq!(listener.local_addr().expect("local address"), None);
        let running = Running::start(listener);

        let _first = UnixStream::connect(&socket_dir.path).expect("connect");
        let _second = UnixStream::connect(&socket_dir.path).expect("connect");

        assert_eq!(running.holders(2), [HolderId::unix(1), HolderId::unix(2)]);
        running.stop();
    }

    #[rstest]
    fn leftover_socket_is_replaced_and_removed_on_stop(socket_dir: SocketDir) {
        drop(UnixListener::bind(&socket_dir.path).expect("bind leftover"));
        assert!(socket_dir.path.exists());

        let running = Running::start(SocketListener::bind(&socket_dir.endpoint()).expect("bind"));
        UnixStream::connect(&socket_dir.path).expect("connect");
        assert_eq!(running.holders(1).len(), 1);

        running.stop();
        assert!(!socket_dir.path.exists(), "socket file should be gone");
    }

    #[rstest]
    fn live_socket_is_left_alone(socket_dir: SocketDir) {
        let _live = UnixListener::bind(&socket_dir.path).expect("bind live listener");
        let error = SocketListener::bind(&socket_dir.endpoint()).expect_err("socket in use");
        assert!(matches!(error, ListenerError::SocketBusy { .. }));
        assert!(socket_dir.path.exists());
    }

    #[rstest]
    fn regular_file_is_left_alone(socket_dir: SocketDir) {
        std::fs::write(&socket_dir.path, b"keep me").expect("write file");
        let error = SocketListener::bind(&socket_dir.endpoint()).expect_err("not a socket");
        assert!(matches!(error, ListenerError::NotASocket { .. }));
        assert_eq!(
            std::fs::read(&socket_dir.path).expect("read file"),
            b"keep me"
        );
    }
}
