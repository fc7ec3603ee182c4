//! The flat command namespace understood by the server.

use std::fmt;

/// A recognised protocol command keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// `g`: acquire an exclusive lock.
    Get,
    /// `r`: release an exclusive lock.
    Release,
    /// `i`: inspect an exclusive lock.
    Inspect,
    /// `d`: dump exclusive lock holders.
    Dump,
    /// `sg`: acquire a shared lock.
    SharedGet,
    /// `sr`: release a shared lock.
    SharedRelease,
    /// `si`: inspect a shared lock.
    SharedInspect,
    /// `sd`: dump shared lock holders.
    SharedDump,
    /// `dump`: emit the raw lock table structure.
    RawDump,
    /// `me`: report the caller's holder identity and display name.
    Me,
    /// `iam`: register a friendly name for the caller.
    Iam,
    /// `who`: list registered friendly names.
    Who,
    /// `q`: report server statistics.
    Stats,
}

impl Command {
    /// Every command, in keyword order.
    pub const ALL: [Self; 13] = [
        Self::Get,
        Self::Release,
        Self::Inspect,
        Self::Dump,
        Self::SharedGet,
        Self::SharedRelease,
        Self::SharedInspect,
        Self::SharedDump,
        Self::RawDump,
        Self::Me,
        Self::Iam,
        Self::Who,
        Self::Stats,
    ];

    /// Looks up a command by its exact, case-sensitive keyword.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let command = match keyword {
            "g" => Self::Get,
            "r" => Self::Release,
            "i" => Self::Inspect,
            "d" => Self::Dump,
            "sg" => Self::SharedGet,
            "sr" => Self::SharedRelease,
            "si" => Self::SharedInspect,
            "sd" => Self::SharedDump,
            "dump" => Self::RawDump,
            "me" => Self::Me,
            "iam" => Self::Iam,
            "who" => Self::Who,
            "q" => Self::Stats,
            _ => return None,
        };
        Some(command)
    }

    /// Returns the wire keyword.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Get => "g",
            Self::Release => "r",
            Self::Inspect => "i",
            Self::Dump => "d",
            Self::SharedGet => "sg",
            Self::SharedRelease => "sr",
            Self::SharedInspect => "si",
            Self::SharedDump => "sd",
            Self::RawDump => "dump",
            Self::Me => "me",
            Self::Iam => "iam",
            Self::Who => "who",
            Self::Stats => "q",
        }
    }

    /// Name of the statistics counter bumped when this command is dispatched.
    #[must_use]
    pub fn stat_key(self) -> String {
        format!("command_{}", self.keyword())
    }

    /// Whether the command's argument may be left off the wire entirely.
    #[must_use]
    pub const fn argument_is_optional(self) -> bool {
        matches!(
            self,
            Self::Dump | Self::SharedDump | Self::RawDump | Self::Me | Self::Who | Self::Stats
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.keyword())
    }
}
