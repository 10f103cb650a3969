//! Lint findings: style violations the formatter cannot fix on its own.
//!
//! A `Lint` renders as `L<line> <rule>: <message>`; the line is dropped when
//! the finding applies to the whole file. Findings are grouped per file in a
//! `LintFindings` map keyed by the absolute path's string form, so files
//! iterate in plain string order (`/r/a-b/x` before `/r/a/x`).

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single style violation found in one file.
pub struct Lint {
    /// 1-based line, when the finding can be pinned to one.
    pub line: Option<usize>,
    pub rule: String,
    pub message: String,
}

impl Lint {
    pub fn new(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Lint {
            line: None,
            rule: rule.into(),
            message: message.into(),
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for Lint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "L{} {}: {}", line, self.rule, self.message),
            None => write!(f, "{}: {}", self.rule, self.message),
        }
    }
}

/// Lints per file, keyed and ordered by the absolute path string.
pub type LintFindings = BTreeMap<String, Vec<Lint>>;

/// Find the 1-based line declaring `key` as an object member.
///
/// Nested paths (`a.b`) resolve to the last segment's first occurrence after
/// the line of the previous segment, which is good enough for pretty JSON.
pub fn locate_key_line(content: &str, path: &str) -> Option<usize> {
    let mut from = 0usize;
    let mut found = None;
    for seg in path.split('.') {
        let needle = format!("\"{}\"", seg);
        let hit = content
            .lines()
            .enumerate()
            .skip(from)
            .find(|(_, line)| {
                line.trim_start().starts_with(&needle)
                    && line.trim_start()[needle.len()..].trim_start().starts_with(':')
            })
            .map(|(i, _)| i)?;
        from = hit + 1;
        found = Some(hit + 1);
    }
    found
}
