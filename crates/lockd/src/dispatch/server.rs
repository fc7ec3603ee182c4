//! Shared lock server: one mutex around all lock, registry and counter state.

use std::sync::{Mutex, MutexGuard, PoisonError};

use lockd_config::Features;
use lockd_protocol::Request;
use tracing::debug;

use crate::HolderId;
use crate::state::{INVALID_COMMANDS, OrphanCounts, ServerState};

use super::{DISPATCH_TARGET, commands};

/// Lock coordination state shared by every connection.
///
/// The server is transport-agnostic: callers announce a connection with
/// [`LockServer::connect`], feed it lines with [`LockServer::dispatch`], and
/// must call [`LockServer::disconnect`] exactly once when the connection
/// ends, before its [`HolderId`] can be handed to anyone else.
#[derive(Debug)]
pub struct LockServer {
    features: Features,
    state: Mutex<ServerState>,
}

impl LockServer {
    /// Creates a server with empty tables and the given feature switches.
    #[must_use]
    pub fn new(features: Features) -> Self {
        Self {
            features,
            state: Mutex::new(ServerState::new()),
        }
    }

    /// Feature switches fixed at construction.
    #[must_use]
    pub const fn features(&self) -> Features {
        self.features
    }

    /// Records a newly accepted connection.
    pub fn connect(&self, holder: &HolderId) {
        self.state().stats.connection_opened();
        debug!(target: DISPATCH_TARGET, %holder, "connection opened");
    }

    /// Handles one request line from `holder` and returns the text to write
    /// back, if any.
    ///
    /// Unknown commands are counted and answered with silence.
    pub fn dispatch(&self, holder: &HolderId, line: &str) -> Option<String> {
        let mut state = self.state();
        let request = match Request::parse(line) {
            Ok(request) => request,
            Err(error) => {
                state.stats.bump(INVALID_COMMANDS);
                debug!(target: DISPATCH_TARGET, %holder, %error, "ignoring request");
                return None;
            }
        };
        state.stats.bump_command(request.command);
        debug!(
            target: DISPATCH_TARGET,
            %holder,
            command = %request.command,
            "dispatching request"
        );
        commands::execute(&mut state, self.features, holder, &request).render()
    }

    /// Releases everything `holder` still owns and forgets its name.
    pub fn disconnect(&self, holder: &HolderId) -> OrphanCounts {
        let mut state = self.state();
        let orphans = state.locks.release_all(holder);
        state.registry.remove(holder);
        state.stats.connection_closed(orphans);
        debug!(
            target: DISPATCH_TARGET,
            %holder,
            orphans = orphans.exclusive,
            shared_orphans = orphans.shared,
            "connection closed"
        );
        orphans
    }

    /// Sorted counter snapshot, as reported by the `q` command.
    #[must_use]
    pub fn stats(&self) -> Vec<(String, i64)> {
        let state = self.state();
        state
            .stats
            .snapshot(state.locks.exclusive_count(), state.locks.shared_count())
    }

    // A panic mid-dispatch cannot leave the tables half-updated: every
    // mutation is a single map operation.
    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LockServer {
    fn default() -> Self {
        Self::new(Features::default())
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn server() -> LockServer {
        LockServer::default()
    }

    fn stat(server: &LockServer, key: &str) -> i64 {
        server
            .stats()
            .into_iter()
            .find(|(name, _)| name == key)
            .map_or(0, |(_, value)| value)
    }

    #[rstest]
    fn exclusive_lock_contention(server: LockServer) {
        let a = HolderId::new("127.0.0.1:5000");
        let b = HolderId::new("127.0.0.1:5001");
        server.connect(&a);
        server.connect(&b);

        assert_eq!(
            server.dispatch(&a, "g asdf").as_deref(),
            Some("1 Lock Get Success: asdf\n")
        );
        assert_eq!(
            server.dispatch(&b, "g asdf").as_deref(),
            Some("0 Lock Get Failure: asdf\n")
        );
        assert_eq!(
            server.dispatch(&a, "g asdf").as_deref(),
            Some("1 Lock Get Success: asdf\n")
        );
        assert_eq!(
            server.dispatch(&a, "r asdf").as_deref(),
            Some("1 Lock Release Success: asdf\n")
        );
        assert_eq!(
            server.dispatch(&b, "g asdf").as_deref(),
            Some("1 Lock Get Success: asdf\n")
        );
    }

    #[rstest]
    fn unknown_commands_are_counted_and_silent(server: LockServer) {
        let a = HolderId::new("127.0.0.1:5000");
        assert_eq!(server.dispatch(&a, "bogus thing"), None);
        assert_eq!(server.dispatch(&a, ""), None);
        assert_eq!(stat(&server, "invalid_commands"), 2);
    }

    #[rstest]
    fn every_known_command_bumps_its_counter(server: LockServer) {
        let a = HolderId::new("127.0.0.1:5000");
        server.dispatch(&a, "i x");
        server.dispatch(&a, "i x");
        server.dispatch(&a, "who");
        assert_eq!(stat(&server, "command_i"), 2);
        assert_eq!(stat(&server, "command_who"), 1);
    }

    #[rstest]
    fn disconnect_releases_orphans(server: LockServer) {
        let a = HolderId::new("127.0.0.1:5000");
        let b = HolderId::new("127.0.0.1:5001");
        server.connect(&a);
        server.connect(&b);
        server.dispatch(&a, "iam c1");
        server.dispatch(&a, "g one");
        server.dispatch(&a, "g two");
        server.dispatch(&b, "g three");
        server.dispatch(&a, "sg readers");
        server.dispatch(&b, "sg readers");
        server.dispatch(&a, "sg solo");

        let orphans = server.disconnect(&a);

        assert_eq!(
            orphans,
            OrphanCounts {
                exclusive: 2,
                shared: 2,
            }
        );
        assert_eq!(stat(&server, "orphans"), 2);
        assert_eq!(stat(&server, "shared_orphans"), 2);
        assert_eq!(stat(&server, "connections"), 1);
        assert_eq!(stat(&server, "locks"), 1);
        assert_eq!(stat(&server, "shared_locks"), 1);
        assert_eq!(server.dispatch(&b, "who c1").as_deref(), Some("\n"));
        assert_eq!(
            server.dispatch(&b, "si readers").as_deref(),
            Some("1 Shared Lock Is Locked: readers\n")
        );
    }
}
