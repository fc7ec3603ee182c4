//! Exclusive and shared lock tables.

use std::collections::BTreeMap;

use crate::HolderId;

/// Number of locks released on behalf of a departed holder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrphanCounts {
    /// Exclusive locks the holder still owned.
    pub exclusive: usize,
    /// Shared lock lists the holder was still a member of.
    pub shared: usize,
}

/// Authoritative record of who holds which lock.
///
/// A name appears in the exclusive table only while it is held, and in the
/// shared table only while its holder list is non-empty. Shared holder lists
/// never contain duplicates and keep arrival order.
#[derive(Debug, Default)]
pub struct LockTable {
    exclusive: BTreeMap<String, HolderId>,
    shared: BTreeMap<String, Vec<HolderId>>,
}

impl LockTable {
    /// Creates empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the exclusive lock `name` for `holder`.
    ///
    /// Succeeds when the lock is free or already held by `holder`.
    pub fn acquire_exclusive(&mut self, name: &str, holder: &HolderId) -> bool {
        match self.exclusive.get(name) {
            Some(current) if current != holder => false,
            Some(_) => true,
            None => {
                self.exclusive.insert(name.to_owned(), holder.clone());
                true
            }
        }
    }

    /// Drops the exclusive lock `name` if, and only if, `holder` owns it.
    pub fn release_exclusive(&mut self, name: &str, holder: &HolderId) -> bool {
        if self.exclusive.get(name) == Some(holder) {
            self.exclusive.remove(name);
            true
        } else {
            false
        }
    }

    /// Whether anyone holds the exclusive lock `name`.
    pub fn is_locked(&self, name: &str) -> bool {
        self.exclusive.contains_key(name)
    }

    /// Current owner of the exclusive lock `name`.
    pub fn exclusive_holder(&self, name: &str) -> Option<&HolderId> {
        self.exclusive.get(name)
    }

    /// Every held exclusive lock, ordered by name.
    pub fn exclusive_entries(&self) -> impl Iterator<Item = (&str, &HolderId)> {
        self.exclusive
            .iter()
            .map(|(name, holder)| (name.as_str(), holder))
    }

    /// Adds `holder` to the shared lock `name` and returns the holder count.
    ///
    /// Repeating the call for the same holder leaves the count unchanged.
    pub fn acquire_shared(&mut self, name: &str, holder: &HolderId) -> usize {
        let holders = self.shared.entry(name.to_owned()).or_default();
        if !holders.contains(holder) {
            holders.push(holder.clone());
        }
        holders.len()
    }

    /// Removes `holder` from the shared lock `name`; false if it was absent.
    pub fn release_shared(&mut self, name: &str, holder: &HolderId) -> bool {
        let Some(holders) = self.shared.get_mut(name) else {
            return false;
        };
        let before = holders.len();
        holders.retain(|current| current != holder);
        let released = holders.len() != before;
        if holders.is_empty() {
            self.shared.remove(name);
        }
        released
    }

    /// Holder count of the shared lock `name` when `holder` is a member.
    pub fn inspect_shared(&self, name: &str, holder: &HolderId) -> Option<usize> {
        self.shared
            .get(name)
            .filter(|holders| holders.contains(holder))
            .map(Vec::len)
    }

    /// Members of the shared lock `name` in arrival order; empty when unheld.
    pub fn shared_holders(&self, name: &str) -> &[HolderId] {
        match self.shared.get(name) {
            Some(holders) => holders.as_slice(),
            None => &[],
        }
    }

    /// Every held shared lock with its members, ordered by name.
    pub fn shared_entries(&self) -> impl Iterator<Item = (&str, &[HolderId])> {
        self.shared
            .iter()
            .map(|(name, holders)| (name.as_str(), holders.as_slice()))
    }

    /// Number of held exclusive locks.
    pub fn exclusive_count(&self) -> usize {
        self.exclusive.len()
    }

    /// Number of shared lock names with at least one holder.
    pub fn shared_count(&self) -> usize {
        self.shared.len()
    }

    /// Releases everything `holder` still owns.
    pub fn release_all(&mut self, holder: &HolderId) -> OrphanCounts {
        let before = self.exclusive.len();
        self.exclusive.retain(|_, current| current != holder);
        let exclusive = before - self.exclusive.len();

        let mut shared = 0;
        self.shared.retain(|_, holders| {
            let before = holders.len();
            holders.retain(|current| current != holder);
            if holders.len() != before {
                shared += 1;
            }
            !holders.is_empty()
        });

        OrphanCounts { exclusive, shared }
    }

    /// Raw JSON rendering of the exclusive table.
    pub fn exclusive_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.exclusive)
    }

    /// Raw JSON rendering of the shared table.
    pub fn shared_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.shared)
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn alice() -> HolderId {
        HolderId::new("10.0.0.1:4000")
    }

    #[fixture]
    fn bob() -> HolderId {
        HolderId::new("10.0.0.2:4000")
    }

    #[rstest]
    #[case::named("asdf")]
    #[case::empty("")]
    fn exclusive_lock_excludes_other_holders(
        #[case] name: &str,
        alice: HolderId,
        bob: HolderId,
    ) {
        let mut table = LockTable::new();
        assert!(table.acquire_exclusive(name, &alice));
        assert!(table.acquire_exclusive(name, &alice), "re-acquire is idempotent");
        assert!(!table.acquire_exclusive(name, &bob));
        assert_eq!(table.exclusive_holder(name), Some(&alice));
    }

    #[rstest]
    fn only_the_owner_releases(alice: HolderId, bob: HolderId) {
        let mut table = LockTable::new();
        assert!(!table.release_exclusive("asdf", &alice), "unheld lock");
        table.acquire_exclusive("asdf", &alice);
        assert!(!table.release_exclusive("asdf", &bob));
        assert!(table.is_locked("asdf"));
        assert!(table.release_exclusive("asdf", &alice));
        assert!(!table.is_locked("asdf"));
        assert_eq!(table.exclusive_holder("asdf"), None);
    }

    #[rstest]
    #[case::named("asdf")]
    #[case::empty("")]
    fn shared_holders_are_unique_and_ordered(
        #[case] name: &str,
        alice: HolderId,
        bob: HolderId,
    ) {
        let mut table = LockTable::new();
        assert_eq!(table.acquire_shared(name, &alice), 1);
        assert_eq!(table.acquire_shared(name, &alice), 1);
        assert_eq!(table.acquire_shared(name, &bob), 2);
        assert_eq!(table.acquire_shared(name, &alice), 2);
        assert_eq!(table.shared_holders(name), &[alice.clone(), bob.clone()]);
        assert_eq!(table.inspect_shared(name, &bob), Some(2));
    }

    #[rstest]
    #[case::named("asdf")]
    #[case::empty("")]
    fn releasing_last_shared_holder_drops_the_name(
        #[case] name: &str,
        alice: HolderId,
        bob: HolderId,
    ) {
        let mut table = LockTable::new();
        table.acquire_shared(name, &alice);
        table.acquire_shared(name, &bob);
        assert!(table.release_shared(name, &bob));
        assert!(!table.release_shared(name, &bob), "already released");
        assert_eq!(table.inspect_shared(name, &bob), None);
        assert_eq!(table.inspect_shared(name, &alice), Some(1));
        assert!(table.release_shared(name, &alice));
        assert_eq!(table.shared_count(), 0);
        assert!(table.shared_holders(name).is_empty());
    }

    #[rstest]
    fn release_all_counts_orphans(alice: HolderId, bob: HolderId) {
        let mut table = LockTable::new();
        table.acquire_exclusive("a", &alice);
        table.acquire_exclusive("b", &alice);
        table.acquire_exclusive("c", &bob);
        table.acquire_shared("s1", &alice);
        table.acquire_shared("s1", &bob);
        table.acquire_shared("s2", &alice);
        table.acquire_shared("s3", &bob);

        let orphans = table.release_all(&alice);

        assert_eq!(
            orphans,
            OrphanCounts {
                exclusive: 2,
                shared: 2
            }
        );
        assert_eq!(table.exclusive_count(), 1);
        assert_eq!(table.shared_holders("s1"), &[bob.clone()]);
        assert!(table.shared_holders("s2").is_empty());
        assert_eq!(table.shared_count(), 2);
    }

    #[rstest]
    fn renders_raw_json(alice: HolderId, bob: HolderId) {
        let mut table = LockTable::new();
        table.acquire_exclusive("x", &alice);
        table.acquire_shared("y", &alice);
        table.acquire_shared("y", &bob);
        assert_eq!(
            table.exclusive_json().expect("json"),
            r#"{"x":"10.0.0.1:4000"}"#
        );
        assert_eq!(
            table.shared_json().expect("json"),
            r#"{"y":["10.0.0.1:4000","10.0.0.2:4000"]}"#
        );
    }
}
