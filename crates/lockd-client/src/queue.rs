//! The request queue behind a client.
//!
//! A worker thread owns the connection. It connects, then takes requests off
//! a channel strictly in submission order: arm a reader, write the line, wait
//! for the reader to resolve, move on. A second thread reads lines from the
//! socket and hands them to whichever reader is armed. With one request in
//! flight, the next complete reply always belongs to the last written
//! request.

use std::io::{self, BufRead, BufReader, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::reader::{Delivery, ReadPolicy, ReaderSlot, ReplyResult};
use crate::transport::{self, Connection};
use crate::{ClientError, ClientEvent, ClientOptions};

use super::CLIENT_TARGET;

/// One queued request.
#[derive(Debug)]
pub(crate) struct Task {
    pub(crate) line: String,
    pub(crate) policy: ReadPolicy,
    pub(crate) reply: Sender<ReplyResult>,
}

/// State shared by the caller, the worker, and the reader thread.
#[derive(Debug)]
pub(crate) struct Shared {
    slot: Mutex<ReaderSlot>,
    resolved: Condvar,
    disconnecting: AtomicBool,
    connection: Mutex<Option<Connection>>,
    events: Mutex<Sender<ClientEvent>>,
}

impl Shared {
    pub(crate) fn new(events: Sender<ClientEvent>) -> Self {
        Self {
            slot: Mutex::new(ReaderSlot::default()),
            resolved: Condvar::new(),
            disconnecting: AtomicBool::new(false),
            connection: Mutex::new(None),
            events: Mutex::new(events),
        }
    }

    /// Suppresses the close event and shuts the socket down, if there is one
    /// yet. A worker that connects afterwards shuts its socket down itself.
    pub(crate) fn begin_disconnect(&self) {
        self.disconnecting.store(true, Ordering::SeqCst);
        if let Some(connection) = self.release_connection() {
            let _ = connection.shutdown();
        }
    }

    /// Gives up the handle kept for [`Self::begin_disconnect`], so the socket
    /// closes once the worker and reader drop theirs.
    fn release_connection(&self) -> Option<Connection> {
        lock(&self.connection).take()
    }

    fn is_disconnecting(&self) -> bool {
        self.disconnecting.load(Ordering::SeqCst)
    }

    fn emit(&self, event: ClientEvent) {
        let _ = lock(&self.events).send(event);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn spawn_worker(
    options: ClientOptions,
    shared: Arc<Shared>,
    tasks: Receiver<Task>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(String::from("lockd-client"))
        .spawn(move || run_worker(&options, &shared, &tasks))
}

fn run_worker(options: &ClientOptions, shared: &Arc<Shared>, tasks: &Receiver<Task>) {
    let (mut connection, reader) = match open(options, shared) {
        Ok(opened) => opened,
        Err(error) => {
            warn!(
                target: CLIENT_TARGET,
                endpoint = %options.endpoint,
                error = %error,
                "failed to connect"
            );
            drop(shared.release_connection());
            shared.emit(ClientEvent::Error(error.clone()));
            for task in tasks {
                let _ = task.reply.send(Err(error.clone()));
            }
            return;
        }
    };

    for task in tasks {
        if shared.is_disconnecting() {
            let _ = task.reply.send(Err(ClientError::Disconnected));
            continue;
        }
        perform(&mut connection, shared, task, options.read_timeout);
    }

    let _ = connection.shutdown();
    drop(connection);
    drop(shared.release_connection());
    if reader.join().is_err() {
        warn!(target: CLIENT_TARGET, "reader thread panicked");
    }
}

fn open(
    options: &ClientOptions,
    shared: &Arc<Shared>,
) -> Result<(Connection, JoinHandle<()>), ClientError> {
    let connection = transport::connect(&options.endpoint, options.connect_timeout)?;
    let incoming = connection.try_clone()?;
    *lock(&shared.connection) = Some(connection.try_clone()?);
    if shared.is_disconnecting() {
        let _ = connection.shutdown();
    }

    debug!(target: CLIENT_TARGET, endpoint = %options.endpoint, "connected");
    shared.emit(ClientEvent::Connected {
        local_addr: connection.local_addr(),
    });

    let reader_shared = Arc::clone(shared);
    let reader = thread::Builder::new()
        .name(String::from("lockd-client-reader"))
        .spawn(move || run_reader(incoming, &reader_shared))?;
    Ok((connection, reader))
}

fn perform(connection: &mut Connection, shared: &Shared, task: Task, timeout: Duration) {
    let Task {
        line,
        policy,
        reply,
    } = task;
    // Arm before writing: the reply may arrive before write_all returns.
    let id = lock(&shared.slot).arm(policy, reply);

    if let Err(error) = write_line(connection, &line) {
        debug!(target: CLIENT_TARGET, error = %error, "failed to write request");
        lock(&shared.slot).fail(error.into());
        return;
    }

    let slot = lock(&shared.slot);
    let (mut slot, _) = shared
        .resolved
        .wait_timeout_while(slot, timeout, |slot| slot.is_armed(id))
        .unwrap_or_else(PoisonError::into_inner);
    slot.expire(id);
}

fn write_line(connection: &mut Connection, line: &str) -> io::Result<()> {
    connection.write_all(line.as_bytes())?;
    connection.flush()
}

fn run_reader(connection: Connection, shared: &Shared) {
    let mut incoming = BufReader::new(connection);
    let mut buffer = Vec::new();
    let failure = loop {
        buffer.clear();
        match incoming.read_until(b'\n', &mut buffer) {
            Ok(0) => break None,
            Ok(_) => deliver(shared, &buffer),
            Err(error) => break Some(error),
        }
    };

    let disconnecting = shared.is_disconnecting();
    let lost = if disconnecting {
        ClientError::Disconnected
    } else {
        ClientError::ConnectionLost
    };
    lock(&shared.slot).close(lost);
    shared.resolved.notify_all();

    if disconnecting {
        return;
    }
    debug!(target: CLIENT_TARGET, "connection closed by server");
    if let Some(error) = failure {
        shared.emit(ClientEvent::Error(error.into()));
    }
    shared.emit(ClientEvent::Closed);
}

fn deliver(shared: &Shared, raw: &[u8]) {
    let text = String::from_utf8_lossy(raw);
    let line = text.strip_suffix('\n').unwrap_or(&*text);
    let line = line.strip_suffix('\r').unwrap_or(line);

    let delivery = lock(&shared.slot).deliver(line.to_owned());
    shared.resolved.notify_all();
    if let Delivery::Unexpected(line) = delivery {
        warn!(target: CLIENT_TARGET, line = %line, "unexpected data from server");
        shared.emit(ClientEvent::Error(ClientError::UnexpectedData(line)));
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::mpsc;

    use lockd_config::SocketEndpoint;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn disconnect_gives_up_the_kept_socket() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let port = listener.local_addr().expect("listener address").port();
        let options = ClientOptions::new(SocketEndpoint::tcp("127.0.0.1", port));
        let (event_sender, events) = mpsc::channel();
        let (task_sender, tasks) = mpsc::channel::<Task>();
        let shared = Arc::new(Shared::new(event_sender));
        let worker = spawn_worker(options, Arc::clone(&shared), tasks).expect("spawn worker");

        let event = events
            .recv_timeout(Duration::from_secs(2))
            .expect("connected event");
        assert!(matches!(event, ClientEvent::Connected { .. }));
        assert!(lock(&shared.connection).is_some());

        shared.begin_disconnect();
        assert!(lock(&shared.connection).is_none());
        drop(task_sender);
        worker.join().expect("join worker");
        assert!(lock(&shared.connection).is_none());
        assert_eq!(Arc::strong_count(&shared), 1, "reader thread has exited");
    }
}
