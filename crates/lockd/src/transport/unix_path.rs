//! Ownership of Unix socket paths on disk.

use std::fs;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::UnixStream;
use std::path::Path;

use tracing::{debug, warn};

use super::{LISTENER_TARGET, ListenerError};

/// Makes `path` available for binding.
///
/// A socket left behind by a server that has gone away is removed. A socket
/// that still accepts connections, or any non-socket file, is left alone and
/// reported.
pub(super) fn claim(path: &Path) -> Result<(), ListenerError> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(source) => return Err(stale(path, "inspect", source)),
    };
    if !metadata.file_type().is_socket() {
        return Err(ListenerError::NotASocket {
            path: path.display().to_string(),
        });
    }
    match UnixStream::connect(path) {
        Ok(_live) => Err(ListenerError::SocketBusy {
            path: path.display().to_string(),
        }),
        Err(error) if is_abandoned(&error) => {
            debug!(
                target: LISTENER_TARGET,
                path = %path.display(),
                "removing leftover socket"
            );
            fs::remove_file(path).map_err(|source| stale(path, "remove", source))
        }
        Err(source) => Err(stale(path, "probe", source)),
    }
}

/// Removes the socket file once its listener has stopped.
pub(super) fn release(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => warn!(
            target: LISTENER_TARGET,
            path = %path.display(),
            error = %error,
            "failed to remove socket file"
        ),
    }
}

fn is_abandoned(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
    )
}

fn stale(path: &Path, action: &'static str, source: io::Error) -> ListenerError {
    ListenerError::StaleSocket {
        action,
        path: path.display().to_string(),
        source,
    }
}
