//! The blocking, thread-safe client API.

use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use lockd_protocol::{
    Command, DISABLED_REPLY, Request, StatusLine, parse_entry_line, split_at_first_space,
};

use crate::queue::{self, Shared, Task};
use crate::{ClientError, ClientEvent, ClientOptions, ReadPolicy};

/// Status reply to a lock command: a numeric code and its message.
pub type LockReply = StatusLine;

/// Connection to a lock server.
///
/// Every operation blocks until its reply is read. Operations may be called
/// from several threads at once; they are sent one at a time in the order
/// they were submitted, so each reply is paired with the right request.
///
/// Locks belong to the connection. Dropping the client or calling
/// [`LockdClient::disconnect`] releases every lock it holds.
#[derive(Debug)]
pub struct LockdClient {
    tasks: Mutex<Option<Sender<Task>>>,
    events: Mutex<Receiver<ClientEvent>>,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl LockdClient {
    /// Starts connecting in the background and returns at once.
    ///
    /// Requests made before the connection is up are queued. If it cannot be
    /// established, a [`ClientEvent::Error`] is raised and every request
    /// fails with the same error.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] when the worker thread cannot be spawned.
    pub fn connect(options: ClientOptions) -> Result<Self, ClientError> {
        let (task_sender, task_receiver) = mpsc::channel();
        let (event_sender, event_receiver) = mpsc::channel();
        let shared = Arc::new(Shared::new(event_sender));
        let worker = queue::spawn_worker(options, Arc::clone(&shared), task_receiver)?;
        Ok(Self {
            tasks: Mutex::new(Some(task_sender)),
            events: Mutex::new(event_receiver),
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Waits up to `timeout` for the next connection event.
    pub fn next_event(&self, timeout: Duration) -> Option<ClientEvent> {
        lock(&self.events).recv_timeout(timeout).ok()
    }

    /// Sends a raw request line and reads its reply under `policy`.
    ///
    /// A trailing newline is added when `line` lacks one.
    ///
    /// # Errors
    ///
    /// Returns the reader's error (for example [`ClientError::LineCount`]),
    /// or a connection error.
    pub fn request(&self, line: &str, policy: ReadPolicy) -> Result<Vec<String>, ClientError> {
        let mut line = line.to_owned();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        let (reply, result) = mpsc::channel();
        let task = Task {
            line,
            policy,
            reply,
        };
        {
            let tasks = lock(&self.tasks);
            let sender = tasks.as_ref().ok_or(ClientError::Disconnected)?;
            sender.send(task).map_err(|_| ClientError::Disconnected)?;
        }
        result.recv().unwrap_or(Err(ClientError::Disconnected))
    }

    /// Acquires the exclusive lock `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Rejected`] when another connection holds it.
    pub fn get(&self, name: &str) -> Result<LockReply, ClientError> {
        self.status(Command::Get, name, true)
    }

    /// Releases the exclusive lock `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Rejected`] when this connection does not hold it.
    pub fn release(&self, name: &str) -> Result<LockReply, ClientError> {
        self.status(Command::Release, name, true)
    }

    /// Reports whether anyone holds the exclusive lock `name`. A `0` code
    /// means it is free and is not an error.
    ///
    /// # Errors
    ///
    /// Returns connection and read errors only.
    pub fn inspect(&self, name: &str) -> Result<LockReply, ClientError> {
        self.status(Command::Inspect, name, false)
    }

    /// Joins the shared lock `name`; the reply code is the holder count.
    ///
    /// # Errors
    ///
    /// Returns connection and read errors only.
    pub fn get_shared(&self, name: &str) -> Result<LockReply, ClientError> {
        self.status(Command::SharedGet, name, true)
    }

    /// Leaves the shared lock `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Rejected`] when this connection is not a holder.
    pub fn release_shared(&self, name: &str) -> Result<LockReply, ClientError> {
        self.status(Command::SharedRelease, name, true)
    }

    /// Reports the holder count of the shared lock `name` if this connection
    /// is a holder, and `0` otherwise.
    ///
    /// # Errors
    ///
    /// Returns connection and read errors only.
    pub fn inspect_shared(&self, name: &str) -> Result<LockReply, ClientError> {
        self.status(Command::SharedInspect, name, false)
    }

    /// Every held exclusive lock and its holder.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::DumpDisabled`] when the server forbids dumps.
    pub fn dump(&self) -> Result<BTreeMap<String, String>, ClientError> {
        let lines = self.listing(Command::Dump, "", ClientError::DumpDisabled)?;
        entries(&lines)
            .map(|entry| entry.map(|(name, holder)| (name.to_owned(), holder.to_owned())))
            .collect()
    }

    /// Holder of the exclusive lock `name`, or `None` when it is free.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::DumpDisabled`] when the server forbids dumps.
    pub fn dump_lock(&self, name: &str) -> Result<Option<String>, ClientError> {
        let lines = self.listing(Command::Dump, name, ClientError::DumpDisabled)?;
        for entry in entries(&lines) {
            let (lock, holder) = entry?;
            if lock == name {
                return Ok(Some(holder.to_owned()));
            }
        }
        Ok(None)
    }

    /// Every held shared lock and its holders, in arrival order.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::DumpDisabled`] when the server forbids dumps.
    pub fn dump_shared(&self) -> Result<BTreeMap<String, Vec<String>>, ClientError> {
        let lines = self.listing(Command::SharedDump, "", ClientError::DumpDisabled)?;
        let mut locks: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for entry in entries(&lines) {
            let (name, holder) = entry?;
            locks
                .entry(name.to_owned())
                .or_default()
                .push(holder.to_owned());
        }
        Ok(locks)
    }

    /// Holders of the shared lock `name`; empty when nobody holds it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::DumpDisabled`] when the server forbids dumps.
    pub fn dump_shared_lock(&self, name: &str) -> Result<Vec<String>, ClientError> {
        let lines = self.listing(Command::SharedDump, name, ClientError::DumpDisabled)?;
        let mut holders = Vec::new();
        for entry in entries(&lines) {
            let (lock, holder) = entry?;
            if lock == name {
                holders.push(holder.to_owned());
            }
        }
        Ok(holders)
    }

    /// This connection's identity and display name, as the server sees them.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Malformed`] when the reply cannot be split.
    pub fn get_name(&self) -> Result<(String, String), ClientError> {
        let reply = self.single_line(&Request::bare(Command::Me))?;
        let status = StatusLine::parse(&reply);
        if !status.is_success() {
            return Err(ClientError::Rejected(status.message));
        }
        match split_at_first_space(&status.message) {
            (holder, Some(name)) if !holder.is_empty() => Ok((holder.to_owned(), name.to_owned())),
            _ => Err(ClientError::Malformed(reply)),
        }
    }

    /// Registers a friendly name for this connection; an empty name clears it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::RegistryDisabled`] when the server forbids it.
    pub fn set_name(&self, name: &str) -> Result<(), ClientError> {
        let reply = self.single_line(&Request::new(Command::Iam, name))?;
        if reply == DISABLED_REPLY {
            return Err(ClientError::RegistryDisabled);
        }
        let status = StatusLine::parse(&reply);
        if status.is_success() {
            Ok(())
        } else {
            Err(ClientError::Rejected(status.message))
        }
    }

    /// Registered friendly names and the connection each resolves to.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ListingDisabled`] unless the server allows both
    /// dumps and the registry.
    pub fn list_clients(&self) -> Result<BTreeMap<String, String>, ClientError> {
        let lines = self.listing(Command::Who, "", ClientError::ListingDisabled)?;
        entries(&lines)
            .map(|entry| entry.map(|(holder, name)| (name.to_owned(), holder.to_owned())))
            .collect()
    }

    /// Connection currently registered under `name`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ListingDisabled`] unless the server allows both
    /// dumps and the registry.
    pub fn find_client(&self, name: &str) -> Result<Option<String>, ClientError> {
        let lines = self.listing(Command::Who, name, ClientError::ListingDisabled)?;
        for entry in entries(&lines) {
            let (holder, registered) = entry?;
            if registered == name {
                return Ok(Some(holder.to_owned()));
            }
        }
        Ok(None)
    }

    /// Server counters. Waits out the full read timeout, since the reply
    /// length is not known in advance.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Malformed`] for a line that is not
    /// `key: integer`.
    pub fn stats(&self) -> Result<BTreeMap<String, i64>, ClientError> {
        let lines = self.send(&Request::bare(Command::Stats), ReadPolicy::Collect)?;
        let mut stats = BTreeMap::new();
        for line in &lines {
            let (key, value) =
                parse_entry_line(line).ok_or_else(|| ClientError::Malformed(line.clone()))?;
            let value = value
                .parse::<i64>()
                .map_err(|_| ClientError::Malformed(line.clone()))?;
            stats.insert(key.to_owned(), value);
        }
        Ok(stats)
    }

    /// Closes the connection and waits for it to finish closing.
    ///
    /// No [`ClientEvent::Closed`] is raised. A request in flight, and any
    /// still queued, fail with [`ClientError::Disconnected`]. Calling this
    /// again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::WorkerPanic`] if the worker thread panicked.
    pub fn disconnect(&self) -> Result<(), ClientError> {
        self.shared.begin_disconnect();
        drop(lock(&self.tasks).take());
        let worker = lock(&self.worker).take();
        match worker {
            Some(handle) => handle.join().map_err(|_| ClientError::WorkerPanic),
            None => Ok(()),
        }
    }

    fn send(&self, request: &Request, policy: ReadPolicy) -> Result<Vec<String>, ClientError> {
        self.request(&request.encode(), policy)
    }

    fn single_line(&self, request: &Request) -> Result<String, ClientError> {
        let lines = self.send(request, ReadPolicy::Lines(1))?;
        lines.into_iter().next().ok_or(ClientError::LineCount {
            expected: 1,
            received: 0,
        })
    }

    fn status(
        &self,
        command: Command,
        name: &str,
        failure_is_error: bool,
    ) -> Result<LockReply, ClientError> {
        let reply = self.single_line(&Request::new(command, name))?;
        let status = StatusLine::parse(&reply);
        if failure_is_error && !status.is_success() {
            return Err(ClientError::Rejected(status.message));
        }
        Ok(status)
    }

    fn listing(
        &self,
        command: Command,
        argument: &str,
        disabled: ClientError,
    ) -> Result<Vec<String>, ClientError> {
        let policy = ReadPolicy::Until(DISABLED_REPLY.to_owned());
        let lines = self.send(&Request::new(command, argument), policy)?;
        if matches!(lines.as_slice(), [only] if only == DISABLED_REPLY) {
            return Err(disabled);
        }
        Ok(lines)
    }
}

impl Drop for LockdClient {
    fn drop(&mut self) {
        self.shared.begin_disconnect();
        drop(lock(&self.tasks).take());
    }
}

fn entries(lines: &[String]) -> impl Iterator<Item = Result<(&str, &str), ClientError>> {
    lines.iter().map(|line| {
        parse_entry_line(line).ok_or_else(|| ClientError::Malformed(line.clone()))
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_flag_malformed_lines() {
        let lines = vec!["a: one".to_owned(), "garbage".to_owned()];
        let parsed: Vec<_> = entries(&lines).collect();
        assert!(matches!(parsed.first(), Some(Ok(("a", "one")))));
        assert!(matches!(parsed.get(1), Some(Err(ClientError::Malformed(_)))));
    }
}
