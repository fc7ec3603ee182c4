//! Response readers: how many lines make up one reply.
//!
//! The protocol has no framing, so a reply ends when the reader's policy
//! says it does. [`ReaderSlot`] holds the one reader that may be armed at a
//! time and decides what each incoming line means.

use std::sync::mpsc::Sender;

use crate::ClientError;

/// Completion rule for one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Exactly this many non-blank lines; fewer by the timeout is an error.
    /// `Lines(0)` completes without reading.
    Lines(usize),
    /// Everything until this exact line arrives, which is kept; if it never
    /// arrives, whatever came within the timeout.
    Until(String),
    /// Everything that arrives within the timeout.
    Collect,
}

/// Outcome of one request as handed back to its caller.
pub(crate) type ReplyResult = Result<Vec<String>, ClientError>;

/// Accumulates the lines of one reply.
#[derive(Debug)]
pub(crate) struct ResponseReader {
    policy: ReadPolicy,
    lines: Vec<String>,
}

impl ResponseReader {
    pub(crate) const fn new(policy: ReadPolicy) -> Self {
        Self {
            policy,
            lines: Vec::new(),
        }
    }

    /// Whether the reply is complete.
    pub(crate) fn is_complete(&self) -> bool {
        match &self.policy {
            ReadPolicy::Lines(wanted) => self.lines.len() >= *wanted,
            ReadPolicy::Until(terminator) => self.lines.last() == Some(terminator),
            ReadPolicy::Collect => false,
        }
    }

    /// Adds a non-blank line and reports whether the reply is now complete.
    pub(crate) fn push(&mut self, line: String) -> bool {
        self.lines.push(line);
        self.is_complete()
    }

    /// Lines collected so far, for a reply that completed on its own.
    pub(crate) fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Result for a reader whose timeout elapsed.
    pub(crate) fn expire(self) -> ReplyResult {
        match self.policy {
            ReadPolicy::Lines(expected) if self.lines.len() < expected => {
                Err(ClientError::LineCount {
                    expected,
                    received: self.lines.len(),
                })
            }
            _ => Ok(self.lines),
        }
    }
}

/// What happened to a line handed to [`ReaderSlot::deliver`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// Blank padding; dropped.
    Ignored,
    /// Taken by the armed reader, which may now be resolved.
    Consumed,
    /// No reader was armed.
    Unexpected(String),
}

#[derive(Debug)]
struct ArmedReader {
    id: u64,
    reader: ResponseReader,
    reply: Sender<ReplyResult>,
}

/// The single reader that may be waiting for a reply on a connection.
///
/// Resolving a reader (by completion, timeout or failure) sends its result
/// and disarms the slot in one step, so a late line is never handed to a
/// reader that already answered.
#[derive(Debug, Default)]
pub(crate) struct ReaderSlot {
    armed: Option<ArmedReader>,
    next_id: u64,
    closed: Option<ClientError>,
}

impl ReaderSlot {
    /// Arms a reader and returns its id. A reader that completes without any
    /// input resolves immediately, as does any reader once the connection has
    /// closed.
    pub(crate) fn arm(&mut self, policy: ReadPolicy, reply: Sender<ReplyResult>) -> u64 {
        self.next_id += 1;
        let reader = ResponseReader::new(policy);
        if let Some(error) = &self.closed {
            let _ = reply.send(Err(error.clone()));
        } else if reader.is_complete() {
            let _ = reply.send(Ok(reader.into_lines()));
        } else {
            self.armed = Some(ArmedReader {
                id: self.next_id,
                reader,
                reply,
            });
        }
        self.next_id
    }

    /// Whether the reader with `id` is still waiting.
    pub(crate) fn is_armed(&self, id: u64) -> bool {
        self.armed.as_ref().is_some_and(|armed| armed.id == id)
    }

    /// Routes one line from the server.
    pub(crate) fn deliver(&mut self, line: String) -> Delivery {
        if line.is_empty() {
            return Delivery::Ignored;
        }
        let Some(armed) = self.armed.as_mut() else {
            return Delivery::Unexpected(line);
        };
        if armed.reader.push(line)
            && let Some(done) = self.armed.take()
        {
            let _ = done.reply.send(Ok(done.reader.into_lines()));
        }
        Delivery::Consumed
    }

    /// Resolves the reader with `id` as timed out; no-op if it already
    /// resolved.
    pub(crate) fn expire(&mut self, id: u64) {
        if self.is_armed(id)
            && let Some(armed) = self.armed.take()
        {
            let _ = armed.reply.send(armed.reader.expire());
        }
    }

    /// Fails whichever reader is armed.
    pub(crate) fn fail(&mut self, error: ClientError) {
        if let Some(armed) = self.armed.take() {
            let _ = armed.reply.send(Err(error));
        }
    }

    /// Marks the connection as gone: the armed reader and every reader armed
    /// later fail with `error`.
    pub(crate) fn close(&mut self, error: ClientError) {
        self.fail(error.clone());
        self.closed = Some(error);
    }
}
