//! fmtcheck core library.
//!
//! Verifies that files are already in canonical form and free of lints,
//! without ever rewriting them. Unchanged files that passed before are
//! skipped via a persisted up-to-date index.
//!
//! High-level modules:
//! - `engine`: the incremental verification pass and its two-tier failure model.
//! - `dirty`: `Formatter`/`Calculator` seams and dirty-state calculation.
//! - `cache`: up-to-date checkers (`FileIndex`, `NoopChecker`).
//! - `report`: diff message for fixable violations.
//! - `lint`: lint findings and their rendering.
//! - `format`: policy-driven JSON formatter.
//! - `checks`: policy lint checks.
//! - `check`: index-driven discovery and the `check` command runner.
//! - `config`: discovery and effective configuration resolution.
//! - `cli`: CLI argument parsing (binary uses this).
//! - `models`: index and policy schemas.
//! - `output`: terminal prefixes, lint lines, summaries.
//! - `error`: `CheckError`.
pub mod cache;
pub mod check;
pub mod checks;
pub mod cli;
pub mod config;
pub mod dirty;
pub mod engine;
pub mod error;
pub mod format;
pub mod lint;
pub mod models;
pub mod output;
pub mod report;
