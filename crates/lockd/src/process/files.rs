//! PID file handling.

use std::fs;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tempfile::Builder;
use tracing::warn;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::{LaunchError, PROCESS_TARGET};

/// PID file written at startup and removed when dropped.
#[derive(Debug)]
pub(super) struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Writes the process ID, then the TCP port when there is one, one per
    /// line.
    pub(super) fn create(
        path: &Path,
        pid: u32,
        tcp: Option<SocketAddr>,
    ) -> Result<Self, LaunchError> {
        let contents = pid_file_contents(pid, tcp);
        atomic_write(path, contents.as_bytes()).map_err(|source| LaunchError::PidFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_file(&self.path)
            && error.kind() != io::ErrorKind::NotFound
        {
            warn!(
                target: PROCESS_TARGET,
                path = %self.path.display(),
                error = %error,
                "failed to remove PID file"
            );
        }
    }
}

fn pid_file_contents(pid: u32, tcp: Option<SocketAddr>) -> String {
    match tcp {
        Some(addr) => format!("{pid}\n{}\n", addr.port()),
        None => format!("{pid}\n"),
    }
}

/// Writes the provided bytes to the path using an atomic persist step.
///
/// Data is flushed and fsync'd before the temporary file is renamed into
/// place so readers never observe a partially written payload.
fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut builder = Builder::new();
    builder.prefix(
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("lockd"),
    );
    #[cfg(unix)]
    builder.permissions(fs::Permissions::from_mode(0o644));

    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::tcp(Some(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9999)), "42\n9999\n")]
    #[case::unix_only(None, "42\n")]
    fn formats_pid_file(#[case] tcp: Option<SocketAddr>, #[case] expected: &str) {
        assert_eq!(pid_file_contents(42, tcp), expected);
    }

    #[test]
    fn pid_file_is_removed_on_drop() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("lockd.pid");
        let guard = PidFile::create(&path, 7, None).expect("create pid file");
        assert_eq!(fs::read_to_string(&path).expect("read pid file"), "7\n");
        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("lockd.pid");
        fs::write(&path, "stale").expect("seed file");
        atomic_write(&path, b"fresh").expect("atomic write");
        assert_eq!(fs::read_to_string(&path).expect("read file"), "fresh");
    }
}
