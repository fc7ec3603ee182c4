//! Request lines: parsing on the server, encoding on the client.

use thiserror::Error;

use crate::Command;

/// Errors raised while decoding a request line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The line's first word is not a known command keyword.
    #[error("unknown command '{keyword}'")]
    UnknownCommand {
        /// The unrecognised keyword as received.
        keyword: String,
    },
}

/// Splits a line into the text before its first space and the text after it.
///
/// The remainder is `None` when the line contains no space at all, which is
/// distinct from `Some("")` for a line ending in a single space.
#[must_use]
pub fn split_at_first_space(line: &str) -> (&str, Option<&str>) {
    match line.split_once(' ') {
        Some((head, rest)) => (head, Some(rest)),
        None => (line, None),
    }
}

/// A decoded request: one command plus its (possibly empty) argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The command to execute.
    pub command: Command,
    /// The argument text; empty when the line carried none.
    pub argument: String,
}

impl Request {
    /// Builds a request from its parts.
    #[must_use]
    pub fn new(command: Command, argument: impl Into<String>) -> Self {
        Self {
            command,
            argument: argument.into(),
        }
    }

    /// Builds a request that carries no argument.
    #[must_use]
    pub fn bare(command: Command) -> Self {
        Self::new(command, String::new())
    }

    /// Decodes one request line.
    ///
    /// A trailing `\n` and a single trailing `\r` are ignored. Lock names are
    /// otherwise taken verbatim, so `g  x` asks for the lock named ` x`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownCommand`] when the keyword is not part
    /// of the command table.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let unterminated = line.strip_suffix('\n').unwrap_or(line);
        let trimmed = unterminated.strip_suffix('\r').unwrap_or(unterminated);
        let (keyword, argument) = split_at_first_space(trimmed);
        let command =
            Command::from_keyword(keyword).ok_or_else(|| ProtocolError::UnknownCommand {
                keyword: keyword.to_owned(),
            })?;
        Ok(Self::new(command, argument.unwrap_or_default()))
    }

    /// Encodes the request as a newline-terminated wire line.
    #[must_use]
    pub fn encode(&self) -> String {
        if self.argument.is_empty() && self.command.argument_is_optional() {
            format!("{}\n", self.command.keyword())
        } else {
            format!("{} {}\n", self.command.keyword(), self.argument)
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::words("abcd e f g", ("abcd", Some("e f g")))]
    #[case::numeric("1 then some other stuff", ("1", Some("then some other stuff")))]
    #[case::one_word("one-word", ("one-word", None))]
    #[case::trailing_space("g ", ("g", Some("")))]
    fn splits_at_first_space(#[case] input: &str, #[case] expected: (&str, Option<&str>)) {
        assert_eq!(split_at_first_space(input), expected);
    }

    #[rstest]
    #[case::named("g asdf\n", Command::Get, "asdf")]
    #[case::empty_name("g \n", Command::Get, "")]
    #[case::bare("q", Command::Stats, "")]
    #[case::spaces_kept("iam my client", Command::Iam, "my client")]
    #[case::crlf("sr asdf\r\n", Command::SharedRelease, "asdf")]
    fn parses_request_lines(
        #[case] line: &str,
        #[case] command: Command,
        #[case] argument: &str,
    ) {
        let request = Request::parse(line).expect("request should parse");
        assert_eq!(request, Request::new(command, argument));
    }

    #[test]
    fn rejects_unknown_keywords() {
        let error = Request::parse("xx\n").expect_err("unknown keyword");
        assert_eq!(
            error,
            ProtocolError::UnknownCommand {
                keyword: "xx".to_owned()
            }
        );
    }

    #[test]
    fn empty_line_is_unknown() {
        assert!(Request::parse("").is_err());
    }

    #[rstest]
    #[case::lock(Request::new(Command::Get, "asdf"), "g asdf\n")]
    #[case::empty_lock(Request::new(Command::Inspect, ""), "i \n")]
    #[case::full_dump(Request::bare(Command::Dump), "d\n")]
    #[case::filtered_dump(Request::new(Command::SharedDump, "x"), "sd x\n")]
    #[case::stats(Request::bare(Command::Stats), "q\n")]
    fn encodes_request_lines(#[case] request: Request, #[case] expected: &str) {
        assert_eq!(request.encode(), expected);
    }
}
