//! Incremental verification: decide which files are dirty or linted, keep
//! the up-to-date cache current, and turn the outcome into one result.
//!
//! Per file, in input order:
//! 1. up-to-date per the cache → skipped, nothing else happens;
//! 2. otherwise the calculator runs; an I/O failure aborts the whole run;
//! 3. lints are computed against the dirty state;
//! 4. non-empty lints are recorded, a dirty file is recorded as a problem;
//! 5. clean and lint-free → cached. This is the only place entries are written.
//!
//! Dirty files win over lints: when any file is dirty the run fails with the
//! diff report alone. Lints are printed only once nothing is left to fix
//! mechanically.
//!
//! Files are processed on a rayon pool. Outcomes are collected in input order
//! and merged afterwards, so the report never depends on completion order.

use crate::cache::UpToDateChecker;
use crate::dirty::{Calculation, Calculator};
use crate::error::{CheckError, Result};
use crate::lint::{Lint, LintFindings};
use crate::output;
use crate::report::{DiffMessage, ProblemFile, DEFAULT_MAX_FILES, DEFAULT_MAX_LINES};
use rayon::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Counters for a successful run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Verified {
    /// Files run through the calculator.
    pub checked: usize,
    /// Files skipped as up to date.
    pub skipped: usize,
    /// Files newly recorded as up to date.
    pub cached: usize,
}

enum Outcome {
    Skipped,
    Checked {
        problem: Option<ProblemFile>,
        lints: Vec<Lint>,
        cached: bool,
    },
}

/// Runs a verification pass over a file set.
pub struct Verifier {
    base_dir: PathBuf,
    fix_command: String,
    jobs: Option<usize>,
    max_files: usize,
    max_lines: usize,
}

impl Verifier {
    pub fn new(base_dir: impl Into<PathBuf>, fix_command: impl Into<String>) -> Self {
        Verifier {
            base_dir: base_dir.into(),
            fix_command: fix_command.into(),
            jobs: None,
            max_files: DEFAULT_MAX_FILES,
            max_lines: DEFAULT_MAX_LINES,
        }
    }

    /// Worker count; `None` uses one worker per available core.
    pub fn jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs.filter(|n| *n > 0);
        self
    }

    pub fn report_limits(mut self, max_files: usize, max_lines: usize) -> Self {
        self.max_files = max_files;
        self.max_lines = max_lines;
        self
    }

    /// Verify `files`. Lint lines for an unfixable failure go to `err_out`.
    pub fn verify<C, U>(
        &self,
        files: &[PathBuf],
        calculator: &C,
        cache: &U,
        err_out: &mut dyn Write,
    ) -> Result<Verified>
    where
        C: Calculator + ?Sized,
        U: UpToDateChecker + ?Sized,
    {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(n) = self.jobs {
            builder = builder.num_threads(n);
        }
        let pool = builder.build()?;
        let outcomes: Vec<Outcome> = pool.install(|| {
            files
                .par_iter()
                .map(|file| check_file(file, calculator, cache))
                .collect::<Result<Vec<_>>>()
        })?;

        let mut verified = Verified::default();
        let mut problems: Vec<ProblemFile> = Vec::new();
        let mut findings = LintFindings::new();
        for (file, outcome) in files.iter().zip(outcomes) {
            match outcome {
                Outcome::Skipped => verified.skipped += 1,
                Outcome::Checked {
                    problem,
                    lints,
                    cached,
                } => {
                    verified.checked += 1;
                    if cached {
                        verified.cached += 1;
                    }
                    if !lints.is_empty() {
                        findings.insert(absolute(file), lints);
                    }
                    problems.extend(problem);
                }
            }
        }

        if !problems.is_empty() {
            tracing::info!(files = problems.len(), "format violations found");
            let message = DiffMessage::new(&self.base_dir, &self.fix_command)
                .max_files(self.max_files)
                .max_lines(self.max_lines)
                .render(&problems);
            return Err(CheckError::Fixable(message));
        }
        if !findings.is_empty() {
            tracing::info!(files = findings.len(), "lint violations found");
            if let Err(e) = output::write_lints(err_out, &findings) {
                tracing::warn!(error = %e, "failed to print lint findings");
            }
            return Err(CheckError::Unfixable(format!(
                "'{}' cannot fix these violations.",
                self.fix_command
            )));
        }
        tracing::info!(
            checked = verified.checked,
            skipped = verified.skipped,
            cached = verified.cached,
            "all files clean"
        );
        Ok(verified)
    }
}

fn check_file<C, U>(file: &Path, calculator: &C, cache: &U) -> Result<Outcome>
where
    C: Calculator + ?Sized,
    U: UpToDateChecker + ?Sized,
{
    if cache.is_up_to_date(file) {
        tracing::debug!(file = %file.display(), "skipping up-to-date file");
        return Ok(Outcome::Skipped);
    }
    let calc = calculator.calculate(file).map_err(|source| CheckError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    let state = calc.dirty_state();
    let lints = calc.lints_against(&state);

    let mut cached = false;
    if lints.is_empty() && state.is_clean() {
        match cache.set_up_to_date(file) {
            Ok(()) => cached = true,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "could not record file as up to date")
            }
        }
    }
    let problem = if state.is_clean() {
        None
    } else {
        Some(ProblemFile {
            path: file.to_path_buf(),
            original: calc.original().to_string(),
            state,
        })
    };
    Ok(Outcome::Checked {
        problem,
        lints,
        cached,
    })
}

fn absolute(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}
