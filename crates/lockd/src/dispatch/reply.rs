//! Rendering of command results onto the wire.

/// Outcome of one dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A single response line.
    Line(String),
    /// Zero or more lines written together. An empty list still produces a
    /// single newline.
    Lines(Vec<String>),
    /// Nothing is written back.
    Silent,
}

impl Reply {
    /// Newline-terminated wire text, or `None` when nothing should be sent.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        match self {
            Self::Line(line) => Some(format!("{line}\n")),
            Self::Lines(lines) => {
                let mut text = lines.join("\n");
                text.push('\n');
                Some(text)
            }
            Self::Silent => None,
        }
    }
}

impl From<String> for Reply {
    fn from(line: String) -> Self {
        Self::Line(line)
    }
}

impl From<&str> for Reply {
    fn from(line: &str) -> Self {
        Self::Line(line.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::line(Reply::from("1 ok"), Some("1 ok\n"))]
    #[case::lines(Reply::Lines(vec!["a: x".into(), "b: y".into()]), Some("a: x\nb: y\n"))]
    #[case::empty_lines(Reply::Lines(Vec::new()), Some("\n"))]
    #[case::silent(Reply::Silent, None)]
    fn renders_wire_text(#[case] reply: Reply, #[case] expected: Option<&str>) {
        assert_eq!(reply.render().as_deref(), expected);
    }
}
