use serde::{Deserialize, Serialize};

/// Startup-fixed switches for optional command classes.
///
/// `dump` gates `d`, `sd`, `dump` and `who`; `registry` gates `iam` and `who`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Features {
    /// Allow clients to list lock holders.
    pub dump: bool,
    /// Allow clients to register friendly names.
    pub registry: bool,
}

impl Features {
    /// Every feature enabled.
    pub const ALL: Self = Self {
        dump: true,
        registry: true,
    };

    /// Whether `who` may run; it needs both switches.
    #[must_use]
    pub const fn listing(&self) -> bool {
        self.dump && self.registry
    }
}

impl Default for Features {
    fn default() -> Self {
        Self::ALL
    }
}
