//! Friendly names chosen by connected clients.

use std::collections::{BTreeMap, HashMap};

use crate::HolderId;

#[derive(Debug)]
struct Registration {
    name: String,
    sequence: u64,
}

/// Maps holders to the friendly names they registered.
///
/// Names are not unique. When two holders register the same name, lookups
/// by name resolve to whichever registered most recently.
#[derive(Debug, Default)]
pub struct Registry {
    names: HashMap<HolderId, Registration>,
    next_sequence: u64,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` for `holder`, replacing any earlier name. An empty
    /// name clears the registration.
    pub fn set_name(&mut self, holder: &HolderId, name: &str) {
        if name.is_empty() {
            self.names.remove(holder);
            return;
        }
        self.next_sequence += 1;
        self.names.insert(
            holder.clone(),
            Registration {
                name: name.to_owned(),
                sequence: self.next_sequence,
            },
        );
    }

    /// Registered name for `holder`, if any.
    pub fn name_of(&self, holder: &HolderId) -> Option<&str> {
        self.names
            .get(holder)
            .map(|registration| registration.name.as_str())
    }

    /// Registered name for `holder`, falling back to the holder identity.
    pub fn display_name<'a>(&'a self, holder: &'a HolderId) -> &'a str {
        self.name_of(holder).unwrap_or(holder.as_str())
    }

    /// Most recent holder to register `name`.
    pub fn find(&self, name: &str) -> Option<&HolderId> {
        self.names
            .iter()
            .filter(|(_, registration)| registration.name == name)
            .max_by_key(|(_, registration)| registration.sequence)
            .map(|(holder, _)| holder)
    }

    /// One entry per registered name, resolved to its latest registrant.
    pub fn listing(&self) -> BTreeMap<&str, &HolderId> {
        let mut ordered: Vec<_> = self.names.iter().collect();
        ordered.sort_by_key(|(_, registration)| registration.sequence);
        ordered
            .into_iter()
            .map(|(holder, registration)| (registration.name.as_str(), holder))
            .collect()
    }

    /// Forgets `holder` entirely.
    pub fn remove(&mut self, holder: &HolderId) {
        self.names.remove(holder);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holder(id: &str) -> HolderId {
        HolderId::new(id)
    }

    #[test]
    fn display_name_falls_back_to_holder() {
        let mut registry = Registry::new();
        let client = holder("127.0.0.1:5000");
        assert_eq!(registry.display_name(&client), "127.0.0.1:5000");
        registry.set_name(&client, "c1");
        assert_eq!(registry.display_name(&client), "c1");
        registry.set_name(&client, "");
        assert_eq!(registry.name_of(&client), None);
        assert_eq!(registry.display_name(&client), "127.0.0.1:5000");
    }

    #[test]
    fn duplicate_names_resolve_to_latest_registrant() {
        let mut registry = Registry::new();
        let first = holder("127.0.0.1:5000");
        let second = holder("127.0.0.1:5001");
        registry.set_name(&first, "c1");
        registry.set_name(&second, "c1");

        assert_eq!(registry.find("c1"), Some(&second));
        assert_eq!(registry.name_of(&first), Some("c1"));
        let listing = registry.listing();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing.get("c1"), Some(&&second));

        registry.set_name(&first, "c1");
        assert_eq!(registry.find("c1"), Some(&first));
    }

    #[test]
    fn listing_covers_every_name() {
        let mut registry = Registry::new();
        let first = holder("a");
        let second = holder("b");
        registry.set_name(&first, "c1");
        registry.set_name(&second, "c2");
        let listing = registry.listing();
        assert_eq!(listing.get("c1"), Some(&&first));
        assert_eq!(listing.get("c2"), Some(&&second));
        assert_eq!(registry.find("c3"), None);
    }

    #[test]
    fn remove_forgets_holder() {
        let mut registry = Registry::new();
        let client = holder("a");
        registry.set_name(&client, "c1");
        registry.remove(&client);
        assert_eq!(registry.find("c1"), None);
        assert!(registry.listing().is_empty());
    }
}
