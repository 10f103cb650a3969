//! Diff message rendered for fixable violations.
//!
//! Layout:
//!
//! ```text
//! The following files had format violations:
//!     conf/app.json
//!         @@ -1,4 +1,4 @@
//!         -...
//!         +...
//! Run 'fmtcheck apply' to fix these violations.
//! ```
//!
//! Output is bounded: at most `max_files` files get a diff and at most
//! `max_lines` diff lines are shown in total. Files past either limit are only
//! listed by name.

use crate::dirty::DirtyState;
use similar::{ChangeTag, TextDiff};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const FILE_INDENT: &str = "    ";
const DIFF_INDENT: &str = "        ";
pub const DEFAULT_MAX_FILES: usize = 10;
pub const DEFAULT_MAX_LINES: usize = 50;

/// A file whose content differs from what the formatter would produce.
#[derive(Debug, Clone)]
pub struct ProblemFile {
    pub path: PathBuf,
    pub original: String,
    pub state: DirtyState,
}

/// Builder for the fixable-violation message.
pub struct DiffMessage<'a> {
    base_dir: &'a Path,
    run_to_fix: String,
    max_files: usize,
    max_lines: usize,
}

impl<'a> DiffMessage<'a> {
    pub fn new(base_dir: &'a Path, fix_command: &str) -> Self {
        DiffMessage {
            base_dir,
            run_to_fix: format!("Run '{}' to fix these violations.", fix_command),
            max_files: DEFAULT_MAX_FILES,
            max_lines: DEFAULT_MAX_LINES,
        }
    }

    pub fn max_files(mut self, n: usize) -> Self {
        self.max_files = n;
        self
    }

    pub fn max_lines(mut self, n: usize) -> Self {
        self.max_lines = n;
        self
    }

    pub fn render(&self, problems: &[ProblemFile]) -> String {
        let mut out = String::from("The following files had format violations:\n");
        let mut lines_left = self.max_lines;
        let mut listed = 0usize;
        for problem in problems {
            if listed == self.max_files || lines_left == 0 {
                break;
            }
            listed += 1;
            let _ = writeln!(out, "{}{}", FILE_INDENT, self.relativize(&problem.path));
            let body = diff_lines(problem);
            let shown = body.len().min(lines_left);
            for line in &body[..shown] {
                let _ = writeln!(out, "{}{}", DIFF_INDENT, line);
            }
            lines_left -= shown;
            if shown < body.len() {
                let _ = writeln!(
                    out,
                    "{}... ({} more lines that didn't fit)",
                    FILE_INDENT,
                    body.len() - shown
                );
            }
        }
        let rest = &problems[listed..];
        if !rest.is_empty() {
            out.push_str("Violations also present in:\n");
            for problem in rest.iter().take(self.max_files) {
                let _ = writeln!(out, "{}{}", FILE_INDENT, self.relativize(&problem.path));
            }
            if rest.len() > self.max_files {
                let _ = writeln!(
                    out,
                    "{}... and {} more files",
                    FILE_INDENT,
                    rest.len() - self.max_files
                );
            }
        }
        out.push_str(&self.run_to_fix);
        out
    }

    fn relativize(&self, path: &Path) -> String {
        pathdiff::diff_paths(path, self.base_dir)
            .unwrap_or_else(|| path.to_path_buf())
            .to_string_lossy()
            .replace('\\', "/")
    }
}

/// Unified-diff lines (hunk headers and signed lines, no trailing newlines).
fn diff_lines(problem: &ProblemFile) -> Vec<String> {
    let (formatted, note) = match &problem.state {
        DirtyState::Clean => return Vec::new(),
        DirtyState::Dirty { canonical } => (canonical.as_str(), None),
        DirtyState::DidNotConverge { first_pass } => (
            first_pass.as_str(),
            Some("(formatter output is not stable; it changes on every pass)"),
        ),
    };
    let visible = only_whitespace_differs(&problem.original, formatted);
    let (old, new) = if visible {
        (
            show_whitespace(&problem.original),
            show_whitespace(formatted),
        )
    } else {
        (problem.original.clone(), formatted.to_string())
    };
    let diff = TextDiff::from_lines(old.as_str(), new.as_str());
    let mut lines = Vec::new();
    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        lines.push(hunk.header().to_string().trim_end().to_string());
        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => '-',
                ChangeTag::Insert => '+',
                ChangeTag::Equal => ' ',
            };
            let text = change.value().trim_end_matches(|c: char| c == '\n' || c == '\r');
            lines.push(format!("{}{}", sign, text));
        }
    }
    if let Some(note) = note {
        lines.push(note.to_string());
    }
    lines
}

fn only_whitespace_differs(a: &str, b: &str) -> bool {
    a != b && a.split_whitespace().eq(b.split_whitespace())
}

/// Make spaces, tabs and carriage returns visible, keeping line structure.
fn show_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            ' ' => out.push('·'),
            '\t' => out.push('→'),
            '\r' => out.push('␍'),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dirty(path: &str, original: &str, canonical: &str) -> ProblemFile {
        ProblemFile {
            path: PathBuf::from(path),
            original: original.to_string(),
            state: DirtyState::Dirty {
                canonical: canonical.to_string(),
            },
        }
    }

    #[test]
    fn test_render_single_file() {
        let base = Path::new("/repo");
        let msg = DiffMessage::new(base, "fmtcheck apply").render(&[dirty(
            "/repo/conf/a.json",
            "{\"b\":1}\n",
            "{\n  \"b\": 1\n}\n",
        )]);
        let expected = "The following files had format violations:\n\
                        \x20   conf/a.json\n\
                        \x20       @@ -1 +1,3 @@\n\
                        \x20       -{\"b\":1}\n\
                        \x20       +{\n\
                        \x20       +  \"b\": 1\n\
                        \x20       +}\n\
                        Run 'fmtcheck apply' to fix these violations.";
        assert_eq!(msg, expected);
    }

    #[test]
    fn test_whitespace_only_change_is_visible() {
        let base = Path::new("/repo");
        let msg = DiffMessage::new(base, "fix").render(&[dirty(
            "/repo/a.json",
            "{\n\t\"a\": 1\n}\n",
            "{\n  \"a\": 1\n}\n",
        )]);
        assert!(msg.contains("-→\"a\":·1"));
        assert!(msg.contains("+··\"a\":·1"));
    }

    #[test]
    fn test_line_limit_truncates_and_lists_remaining_files() {
        let base = Path::new("/repo");
        let problems: Vec<_> = (0..3)
            .map(|i| dirty(&format!("/repo/f{}.json", i), "a\nb\nc\n", "x\ny\nz\n"))
            .collect();
        // each file renders 7 diff lines (header + 3 deletes + 3 inserts)
        let msg = DiffMessage::new(base, "fix").max_lines(10).render(&problems);
        assert!(msg.contains("    f0.json\n"));
        assert!(msg.contains("    f1.json\n"));
        assert!(msg.contains("    ... (4 more lines that didn't fit)\n"));
        assert!(msg.contains("Violations also present in:\n    f2.json\n"));
        assert!(msg.ends_with("Run 'fix' to fix these violations."));
    }

    #[test]
    fn test_file_limit() {
        let base = Path::new("/repo");
        let problems: Vec<_> = (0..5)
            .map(|i| dirty(&format!("/repo/f{}.json", i), "a\n", "b\n"))
            .collect();
        let msg = DiffMessage::new(base, "fix").max_files(2).render(&problems);
        assert!(msg.contains("Violations also present in:\n    f2.json\n    f3.json\n"));
        assert!(msg.contains("    ... and 1 more files\n"));
        assert!(!msg.contains("    f4.json"));
    }

    #[test]
    fn test_non_converging_file_gets_note() {
        let base = Path::new("/repo");
        let problem = ProblemFile {
            path: PathBuf::from("/repo/a.json"),
            original: "a\n".into(),
            state: DirtyState::DidNotConverge {
                first_pass: "b\n".into(),
            },
        };
        let msg = DiffMessage::new(base, "fix").render(&[problem]);
        assert!(msg.contains("not stable"));
    }

    #[test]
    fn test_path_outside_base_stays_readable() {
        let base = Path::new("/repo/sub");
        let msg = DiffMessage::new(base, "fix").render(&[dirty("/repo/a.json", "a\n", "b\n")]);
        assert!(msg.contains("    ../a.json\n"));
    }
}
