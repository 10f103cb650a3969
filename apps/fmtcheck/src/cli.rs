//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "fmtcheck",
    version,
    about = "Verify that files are formatted and lint-free",
    long_about = "fmtcheck — verify JSON files against formatting policies without rewriting them.\n\nConfiguration precedence: CLI > fmtcheck.toml > defaults.",
    after_help = "Examples:\n  fmtcheck check --index conv/index.toml\n  fmtcheck check --no-up-to-date --jobs 1\n  FMTCHECK_LOG=fmtcheck=debug fmtcheck check",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current fmtcheck version.")]
    Version,
    /// Verify formatting and lints
    #[command(
        about = "Verify formatting and lints",
        long_about = "Check files matched by index rules. Fails with a diff when files are not formatted, or lists lints when only manual fixes remain. Files are never modified.",
        after_help = "Exit codes:\n  0  all files clean\n  1  format or lint violations\n  2  configuration or I/O error"
    )]
    Check {
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, help = "Path to index.toml relative to the repository root")]
        index: Option<String>,
        #[arg(long, help = "Command suggested to fix violations (default: fmtcheck apply)")]
        fix_command: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Ignore and do not update the up-to-date index")]
        no_up_to_date: bool,
        #[arg(long, help = "Worker threads (default: one per core)")]
        jobs: Option<usize>,
        #[arg(short, long, action = clap::ArgAction::SetTrue, help = "Debug logging")]
        verbose: bool,
    },
}
