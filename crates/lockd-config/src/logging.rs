//! Log output formats for the server.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the server writes log events to stderr. Parsed from `--log-format`
/// case-insensitively.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event, with event fields at the top level.
    #[default]
    Json,
    /// Terse single-line text for a terminal.
    Compact,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::upper("COMPACT", Some(LogFormat::Compact))]
    #[case::lower("json", Some(LogFormat::Json))]
    #[case::unknown("yaml", None)]
    fn parses_flag_values(#[case] input: &str, #[case] expected: Option<LogFormat>) {
        assert_eq!(input.parse::<LogFormat>().ok(), expected);
    }

    #[test]
    fn displays_as_flag_value() {
        assert_eq!(LogFormat::Compact.to_string(), "compact");
    }
}
