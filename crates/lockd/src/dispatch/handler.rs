//! Connection handler that feeds request lines to the lock server.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::HolderId;
use crate::transport::{ConnectionHandler, ConnectionStream};

use super::{DISPATCH_TARGET, LockServer};

/// Longest request line accepted, excluding its newline.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Serves one connection: reads lines in order, dispatches each, and writes
/// any reply before reading the next.
#[derive(Debug, Clone)]
pub(crate) struct LockConnectionHandler {
    server: Arc<LockServer>,
}

impl LockConnectionHandler {
    pub(crate) fn new(server: Arc<LockServer>) -> Self {
        Self { server }
    }

    fn serve(
        &self,
        reader: &mut BufReader<ConnectionStream>,
        holder: &HolderId,
    ) -> io::Result<()> {
        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            match read_line(reader, &mut buffer)? {
                LineRead::Line => {}
                LineRead::Eof => return Ok(()),
                LineRead::TooLong => {
                    warn!(
                        target: DISPATCH_TARGET,
                        %holder,
                        limit = MAX_LINE_BYTES,
                        "request line too long; closing connection"
                    );
                    return reader.get_ref().shutdown();
                }
            }
            let line = String::from_utf8_lossy(&buffer);
            if let Some(reply) = self.server.dispatch(holder, &line) {
                let stream = reader.get_mut();
                stream.write_all(reply.as_bytes())?;
                stream.flush()?;
            }
        }
    }
}

impl ConnectionHandler for LockConnectionHandler {
    fn handle(&self, stream: ConnectionStream, holder: HolderId) {
        self.server.connect(&holder);
        let mut reader = BufReader::new(stream);
        if let Err(error) = self.serve(&mut reader, &holder) {
            debug!(
                target: DISPATCH_TARGET,
                %holder,
                error = %error,
                "connection ended with error"
            );
        }
        self.server.disconnect(&holder);
        // Closed only after cleanup, while the peer address is still ours.
        drop(reader);
    }
}

#[derive(Debug, PartialEq, Eq)]
enum LineRead {
    Line,
    Eof,
    TooLong,
}

/// Reads up to and including the next `\n`. A final fragment without a
/// newline still counts as a line.
fn read_line<R: BufRead>(reader: &mut R, buffer: &mut Vec<u8>) -> io::Result<LineRead> {
    let limit = u64::try_from(MAX_LINE_BYTES + 1).unwrap_or(u64::MAX);
    let read = reader.by_ref().take(limit).read_until(b'\n', buffer)?;
    if read == 0 {
        return Ok(LineRead::Eof);
    }
    let content = buffer.strip_suffix(b"\n").map_or(buffer.len(), <[u8]>::len);
    if content > MAX_LINE_BYTES {
        return Ok(LineRead::TooLong);
    }
    Ok(LineRead::Line)
}
