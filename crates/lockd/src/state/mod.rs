//! Shared server state: lock tables, the name registry, and counters.
//!
//! Nothing here is synchronised. [`crate::LockServer`] owns one
//! [`ServerState`] behind a single mutex so that a lock mutation and the
//! counters it touches always change together.

mod locks;
mod registry;
mod stats;

pub use self::locks::{LockTable, OrphanCounts};
pub use self::registry::Registry;
pub use self::stats::Stats;
pub(crate) use self::stats::INVALID_COMMANDS;

/// Everything a dispatch may read or mutate.
#[derive(Debug, Default)]
pub struct ServerState {
    pub(crate) locks: LockTable,
    pub(crate) registry: Registry,
    pub(crate) stats: Stats,
}

impl ServerState {
    /// Fresh state with empty tables and zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }
}
