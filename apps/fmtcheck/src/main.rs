//! fmtcheck CLI binary entry point.
//! Resolves configuration, runs the check and maps the result to an exit code.

use clap::Parser;
use fmtcheck::cli::{Cli, Commands};
use fmtcheck::config::{self, CliOverrides};
use fmtcheck::error::CheckError;
use fmtcheck::{check, output};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging(verbose: bool) {
    let default = if verbose { "fmtcheck=debug" } else { "fmtcheck=warn" };
    let filter = EnvFilter::try_from_env("FMTCHECK_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Check {
            repo_root,
            index,
            fix_command,
            no_up_to_date,
            jobs,
            verbose,
        } => {
            init_logging(verbose);
            let overrides = CliOverrides {
                repo_root,
                index,
                fix_command,
                up_to_date: if no_up_to_date { Some(false) } else { None },
                jobs,
            };
            let eff = match config::resolve_effective(&overrides) {
                Ok(eff) => eff,
                Err(e) => {
                    eprintln!("{} {}", output::error_prefix(), e);
                    std::process::exit(2);
                }
            };
            if !eff.config_found {
                eprintln!(
                    "{} No fmtcheck.toml found; using defaults.",
                    output::note_prefix()
                );
            }
            let mut stderr = std::io::stderr();
            match check::run_check(&eff, &mut stderr) {
                Ok(done) => {
                    for (rule, v) in &done {
                        println!("{}", output::summary_line(rule, v));
                    }
                }
                Err(e) if e.is_violation() => {
                    eprintln!("{} {}", output::error_prefix(), e);
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("{} {}", output::error_prefix(), e);
                    if let CheckError::Io { source, .. } = &e {
                        eprintln!("{} {}", output::info_prefix(), source);
                    }
                    std::process::exit(2);
                }
            }
        }
    }
}
