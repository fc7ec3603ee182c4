//! Reply line helpers.

use crate::split_at_first_space;

/// Reply sent for any command whose feature gate is switched off.
pub const DISABLED_REPLY: &str = "0 disabled";

/// A `<code> <message>` reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// Numeric outcome; zero signals failure.
    pub code: i64,
    /// Human-readable remainder of the line.
    pub message: String,
}

impl StatusLine {
    /// Parses a status reply.
    ///
    /// A head that is not a number yields code `0` with the entire line kept
    /// as the message, so malformed replies read as failures.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let (head, rest) = split_at_first_space(line);
        head.parse::<i64>().map_or_else(
            |_| Self {
                code: 0,
                message: line.to_owned(),
            },
            |code| Self {
                code,
                message: rest.unwrap_or_default().to_owned(),
            },
        )
    }

    /// Whether the reply reports success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code != 0
    }
}

/// Splits a `<key>: <value>` listing line at its first `": "` separator.
#[must_use]
pub fn parse_entry_line(line: &str) -> Option<(&str, &str)> {
    line.split_once(": ")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::success("1 Lock Get Success: asdf", 1, "Lock Get Success: asdf")]
    #[case::failure("0 Lock Get Failure: asdf", 0, "Lock Get Failure: asdf")]
    #[case::count("3 Shared Lock Get Success: x", 3, "Shared Lock Get Success: x")]
    #[case::bare_number("444", 444, "")]
    #[case::garbage("oops nope", 0, "oops nope")]
    fn parses_status_lines(#[case] line: &str, #[case] code: i64, #[case] message: &str) {
        let status = StatusLine::parse(line);
        assert_eq!(status.code, code);
        assert_eq!(status.message, message);
    }

    #[test]
    fn entry_lines_split_on_first_separator() {
        assert_eq!(
            parse_entry_line("lock: with: colon"),
            Some(("lock", "with: colon"))
        );
        assert_eq!(parse_entry_line(": holder"), Some(("", "holder")));
        assert_eq!(parse_entry_line("no separator"), None);
    }
}
