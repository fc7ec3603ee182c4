//! Command and connection counters.

use std::collections::BTreeMap;

use lockd_protocol::Command;

use super::OrphanCounts;

pub(crate) const CONNECTIONS: &str = "connections";
pub(crate) const ORPHANS: &str = "orphans";
pub(crate) const SHARED_ORPHANS: &str = "shared_orphans";
pub(crate) const INVALID_COMMANDS: &str = "invalid_commands";
pub(crate) const LOCKS: &str = "locks";
pub(crate) const SHARED_LOCKS: &str = "shared_locks";

/// Running counters kept for the lifetime of the server.
///
/// `locks` and `shared_locks` are not stored; [`Stats::snapshot`] derives them
/// from the current table sizes.
#[derive(Debug)]
pub struct Stats {
    counters: BTreeMap<String, i64>,
}

impl Default for Stats {
    fn default() -> Self {
        let mut counters: BTreeMap<String, i64> = Command::ALL
            .iter()
            .map(|command| (command.stat_key(), 0))
            .collect();
        for key in [CONNECTIONS, ORPHANS, SHARED_ORPHANS, INVALID_COMMANDS] {
            counters.insert(key.to_owned(), 0);
        }
        Self { counters }
    }
}

impl Stats {
    /// Zeroed counters for every known key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments `key`, starting it at one when it does not exist yet.
    pub fn bump(&mut self, key: &str) {
        self.adjust(key, 1);
    }

    /// Counts one dispatch of `command`.
    pub fn bump_command(&mut self, command: Command) {
        self.bump(&command.stat_key());
    }

    /// Records an accepted connection.
    pub fn connection_opened(&mut self) {
        self.adjust(CONNECTIONS, 1);
    }

    /// Records a closed connection and the locks it left behind.
    pub fn connection_closed(&mut self, orphans: OrphanCounts) {
        self.adjust(CONNECTIONS, -1);
        self.adjust(ORPHANS, to_counter(orphans.exclusive));
        self.adjust(SHARED_ORPHANS, to_counter(orphans.shared));
    }

    /// Current value of `key`; zero when it has never been touched.
    pub fn get(&self, key: &str) -> i64 {
        self.counters.get(key).copied().unwrap_or_default()
    }

    /// All counters plus the derived lock counts, sorted by key.
    pub fn snapshot(&self, locks: usize, shared_locks: usize) -> Vec<(String, i64)> {
        let mut all = self.counters.clone();
        all.insert(LOCKS.to_owned(), to_counter(locks));
        all.insert(SHARED_LOCKS.to_owned(), to_counter(shared_locks));
        all.into_iter().collect()
    }

    fn adjust(&mut self, key: &str, delta: i64) {
        let counter = self.counters.entry(key.to_owned()).or_insert(0);
        *counter = counter.saturating_add(delta);
    }
}

fn to_counter(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_every_command_at_zero() {
        let stats = Stats::new();
        for command in Command::ALL {
            assert_eq!(stats.get(&command.stat_key()), 0);
        }
        let keys: Vec<String> = stats.snapshot(0, 0).into_iter().map(|(key, _)| key).collect();
        assert!(keys.contains(&"command_who".to_owned()));
        assert!(keys.contains(&"invalid_commands".to_owned()));
    }

    #[test]
    fn snapshot_is_sorted_and_includes_derived_counts() {
        let mut stats = Stats::new();
        stats.bump_command(Command::Get);
        stats.bump_command(Command::Get);
        let snapshot = stats.snapshot(3, 1);

        let keys: Vec<&str> = snapshot.iter().map(|(key, _)| key.as_str()).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);

        let lookup = |wanted: &str| {
            snapshot
                .iter()
                .find(|(key, _)| key == wanted)
                .map(|(_, value)| *value)
        };
        assert_eq!(lookup("command_g"), Some(2));
        assert_eq!(lookup("locks"), Some(3));
        assert_eq!(lookup("shared_locks"), Some(1));
    }

    #[test]
    fn unknown_keys_start_at_one() {
        let mut stats = Stats::new();
        stats.bump("command_future");
        assert_eq!(stats.get("command_future"), 1);
    }

    #[test]
    fn connection_lifecycle_tracks_orphans() {
        let mut stats = Stats::new();
        stats.connection_opened();
        stats.connection_opened();
        stats.connection_closed(OrphanCounts {
            exclusive: 2,
            shared: 1,
        });
        assert_eq!(stats.get(CONNECTIONS), 1);
        assert_eq!(stats.get(ORPHANS), 2);
        assert_eq!(stats.get(SHARED_ORPHANS), 1);
    }
}
