//! Terminal output: diagnostic prefixes, lint lines, and the run summary.
//!
//! Colors are used for prefixes only and are disabled by `NO_COLOR`. Lint
//! lines are never colored since build tools parse them.

use crate::engine::Verified;
use crate::lint::LintFindings;
use owo_colors::OwoColorize;
use std::io::{self, Write};

fn use_colors() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

pub fn error_prefix() -> String {
    if use_colors() {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn note_prefix() -> String {
    if use_colors() {
        "note:".yellow().bold().to_string()
    } else {
        "note:".to_string()
    }
}

pub fn info_prefix() -> String {
    if use_colors() {
        "info:".blue().bold().to_string()
    } else {
        "info:".to_string()
    }
}

/// Write one `<absolute path>:<lint>` line per finding, files in path order.
pub fn write_lints(w: &mut dyn Write, findings: &LintFindings) -> io::Result<()> {
    for (file, lints) in findings {
        for lint in lints {
            writeln!(w, "{}:{}", file, lint)?;
        }
    }
    w.flush()
}

/// One-line summary of a passing run.
pub fn summary_line(rule: &str, v: &Verified) -> String {
    let text = format!(
        "{}: {} checked, {} up to date",
        rule, v.checked, v.skipped
    );
    if use_colors() {
        format!("{} {}", "✔".green(), text)
    } else {
        format!("✔ {}", text)
    }
}
