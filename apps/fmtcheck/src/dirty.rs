//! Dirty-state calculation: does formatting change a file, and which lints apply.
//!
//! The engine only talks to the `Calculator`/`Calculation` pair. The stock
//! implementation, `FormatterCalculator`, reads the file, runs a `Formatter`
//! and compares the result with the original text.
//!
//! Lints are evaluated against the dirty state: a dirty file is linted in its
//! canonical form (what it will look like once fixed), a clean file as-is.

use crate::lint::Lint;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Canonical-text producer for one kind of file.
pub trait Formatter: Send + Sync {
    /// Produce canonical text. `Err` means the input cannot be formatted at
    /// all; the lint is reported and the file is left as it is.
    fn format(&self, raw: &str, path: &Path) -> Result<String, Lint>;

    /// Findings the formatter cannot fix.
    fn lint(&self, content: &str, path: &Path) -> Vec<Lint>;

    /// Identifies the formatter configuration; a change invalidates cached results.
    fn fingerprint(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirtyState {
    Clean,
    Dirty { canonical: String },
    /// Formatting the formatter's own output changed it again.
    DidNotConverge { first_pass: String },
}

impl DirtyState {
    pub fn is_clean(&self) -> bool {
        matches!(self, DirtyState::Clean)
    }
}

/// The per-file result of a calculator, queried by the engine.
pub trait Calculation {
    fn original(&self) -> &str;
    fn dirty_state(&self) -> DirtyState;
    fn lints_against(&self, dirty: &DirtyState) -> Vec<Lint>;
}

pub trait Calculator: Sync {
    type Calc<'a>: Calculation
    where
        Self: 'a;

    fn calculate<'a>(&'a self, path: &Path) -> io::Result<Self::Calc<'a>>;
}

/// Calculator backed by a `Formatter`.
pub struct FormatterCalculator<F> {
    formatter: F,
}

impl<F: Formatter> FormatterCalculator<F> {
    pub fn new(formatter: F) -> Self {
        FormatterCalculator { formatter }
    }

    pub fn formatter(&self) -> &F {
        &self.formatter
    }
}

impl<F: Formatter> Calculator for FormatterCalculator<F> {
    type Calc<'a>
        = FormattedFile<'a, F>
    where
        F: 'a;

    fn calculate<'a>(&'a self, path: &Path) -> io::Result<FormattedFile<'a, F>> {
        let raw = fs::read_to_string(path)?;
        let first_pass = self.formatter.format(&raw, path);
        Ok(FormattedFile {
            formatter: &self.formatter,
            path: path.to_path_buf(),
            raw,
            first_pass,
        })
    }
}

/// One file read from disk and run through the formatter once.
pub struct FormattedFile<'a, F> {
    formatter: &'a F,
    path: PathBuf,
    raw: String,
    first_pass: Result<String, Lint>,
}

impl<F: Formatter> Calculation for FormattedFile<'_, F> {
    fn original(&self) -> &str {
        &self.raw
    }

    fn dirty_state(&self) -> DirtyState {
        let formatted = match &self.first_pass {
            Ok(s) => s,
            Err(_) => return DirtyState::Clean,
        };
        if *formatted == self.raw {
            return DirtyState::Clean;
        }
        match self.formatter.format(formatted, &self.path) {
            Ok(second) if second == *formatted => DirtyState::Dirty {
                canonical: formatted.clone(),
            },
            _ => DirtyState::DidNotConverge {
                first_pass: formatted.clone(),
            },
        }
    }

    fn lints_against(&self, dirty: &DirtyState) -> Vec<Lint> {
        let mut lints = Vec::new();
        if let Err(failure) = &self.first_pass {
            lints.push(failure.clone());
        }
        let content = match dirty {
            DirtyState::Dirty { canonical } => canonical.as_str(),
            DirtyState::Clean | DirtyState::DidNotConverge { .. } => self.raw.as_str(),
        };
        lints.extend(self.formatter.lint(content, &self.path));
        lints
    }
}
