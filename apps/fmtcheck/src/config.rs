//! Configuration discovery and effective settings resolution.
//!
//! fmtcheck reads `fmtcheck.toml|yaml|yml` from the repository root (or
//! closest ancestor) and merges it with CLI flags to produce an `Effective`
//! config. Defaults:
//! - `index`: none (must be configured)
//! - `check.fixCommand`: `fmtcheck apply`
//! - `check.upToDate`: true, stored in `.fmtcheck/up-to-date.json`
//! - `check.jobs`: one worker per core
//! - `check.maxFiles|maxLines`: 10 / 50
//! - `format.strictLineBreak`: true
//! - `format.linebreak.{between_groups,before_fields,in_fields}`: optional
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::format::LineBreakSettings;
use crate::report::{DEFAULT_MAX_FILES, DEFAULT_MAX_LINES};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_FIX_COMMAND: &str = "fmtcheck apply";
pub const DEFAULT_INDEX_FILE: &str = ".fmtcheck/up-to-date.json";

const CONFIG_NAMES: [&str; 3] = ["fmtcheck.toml", "fmtcheck.yaml", "fmtcheck.yml"];

#[derive(Debug, Default, Deserialize, Clone)]
/// Verification settings under `[check]`.
pub struct CheckCfg {
    #[serde(rename = "fixCommand")]
    pub fix_command: Option<String>,
    #[serde(rename = "upToDate")]
    pub up_to_date: Option<bool>,
    #[serde(rename = "indexFile")]
    pub index_file: Option<String>,
    pub jobs: Option<usize>,
    #[serde(rename = "maxFiles")]
    pub max_files: Option<usize>,
    #[serde(rename = "maxLines")]
    pub max_lines: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Formatting-related configuration section under `[format]`.
pub struct FormatCfg {
    #[serde(rename = "strictLineBreak")]
    pub strict_linebreak: Option<bool>,
    pub linebreak: Option<LineBreakCfg>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Line break configuration (overrides policy at runtime).
pub struct LineBreakCfg {
    pub between_groups: Option<bool>,
    pub before_fields: Option<HashMap<String, String>>, // keep|none
    pub in_fields: Option<HashMap<String, String>>,     // keep|none
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct RulePatternOverride {
    pub patterns: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `fmtcheck.toml|yaml`.
pub struct FmtcheckConfig {
    pub index: Option<String>,
    pub check: Option<CheckCfg>,
    pub format: Option<FormatCfg>,
    #[serde(default)]
    pub rules: Option<HashMap<String, RulePatternOverride>>, // [rules.<id>].patterns
}

/// CLI-level overrides; `None` falls through to the config file.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub repo_root: Option<String>,
    pub index: Option<String>,
    pub fix_command: Option<String>,
    pub up_to_date: Option<bool>,
    pub jobs: Option<usize>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub config_found: bool,
    pub index: Option<String>,
    pub fix_command: String,
    pub up_to_date: bool,
    pub index_file: PathBuf,
    pub jobs: Option<usize>,
    pub max_files: usize,
    pub max_lines: usize,
    pub linebreak: LineBreakSettings,
    pub pattern_overrides: HashMap<String, Vec<String>>, // id -> patterns
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when a `fmtcheck.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_NAMES.iter().any(|n| cur.join(n).exists()) || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `FmtcheckConfig` from `fmtcheck.toml` or `fmtcheck.yaml|yml` if present.
///
/// A present but unparsable file is an error, not a silent fallback.
pub fn load_config(root: &Path) -> Result<Option<FmtcheckConfig>, String> {
    for name in CONFIG_NAMES {
        let p = root.join(name);
        if !p.exists() {
            continue;
        }
        let s = fs::read_to_string(&p).map_err(|e| format!("{}: {}", p.display(), e))?;
        let cfg = if name.ends_with(".toml") {
            toml::from_str::<FmtcheckConfig>(&s).map_err(|e| format!("{}: {}", p.display(), e))?
        } else {
            serde_yaml::from_str::<FmtcheckConfig>(&s)
                .map_err(|e| format!("{}: {}", p.display(), e))?
        };
        return Ok(Some(cfg));
    }
    Ok(None)
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(cli: &CliOverrides) -> Result<Effective, String> {
    let start = PathBuf::from(cli.repo_root.as_deref().unwrap_or("."));
    let start = std::path::absolute(&start).unwrap_or(start);
    let repo_root = detect_repo_root(&start);
    let loaded = load_config(&repo_root)?;
    let config_found = loaded.is_some();
    let cfg = loaded.unwrap_or_default();
    let check = cfg.check.unwrap_or_default();
    let format = cfg.format.unwrap_or_default();
    let lb = format.linebreak.unwrap_or_default();

    let index = cli.index.clone().or(cfg.index);
    let fix_command = cli
        .fix_command
        .clone()
        .or(check.fix_command)
        .unwrap_or_else(|| DEFAULT_FIX_COMMAND.to_string());
    let up_to_date = cli.up_to_date.or(check.up_to_date).unwrap_or(true);
    let index_file = repo_root.join(
        check
            .index_file
            .unwrap_or_else(|| DEFAULT_INDEX_FILE.to_string()),
    );
    let jobs = cli.jobs.or(check.jobs).filter(|n| *n > 0);

    let linebreak = LineBreakSettings {
        strict: format.strict_linebreak.unwrap_or(true),
        between_groups: lb.between_groups,
        before_fields: lb.before_fields.unwrap_or_default(),
        in_fields: lb.in_fields.unwrap_or_default(),
    };

    let pattern_overrides = cfg
        .rules
        .unwrap_or_default()
        .into_iter()
        .map(|(id, ov)| (id, ov.patterns))
        .collect::<HashMap<_, _>>();

    Ok(Effective {
        repo_root,
        config_found,
        index,
        fix_command,
        up_to_date,
        index_file,
        jobs,
        max_files: check.max_files.unwrap_or(DEFAULT_MAX_FILES),
        max_lines: check.max_lines.unwrap_or(DEFAULT_MAX_LINES),
        linebreak,
        pattern_overrides,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn at(root: &Path) -> CliOverrides {
        CliOverrides {
            repo_root: root.to_str().map(String::from),
            ..CliOverrides::default()
        }
    }

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("fmtcheck.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
index = "conventions/acme/index.toml"
[check]
fixCommand = "make fmt"
upToDate = false
jobs = 2
    "#
        )
        .unwrap();

        // Resolve using explicit repo_root to avoid global CWD races
        let eff = resolve_effective(&at(root)).unwrap();
        assert!(eff.config_found);
        assert_eq!(eff.index.as_deref(), Some("conventions/acme/index.toml"));
        assert_eq!(eff.fix_command, "make fmt");
        assert!(!eff.up_to_date);
        assert_eq!(eff.jobs, Some(2));
    }

    #[test]
    fn test_load_yaml_and_defaults() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("fmtcheck.yaml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
index: convention/index.toml
format:
  strictLineBreak: true
            "#
        )
        .unwrap();

        let eff = resolve_effective(&at(root)).unwrap();
        assert_eq!(eff.index.as_deref(), Some("convention/index.toml"));
        assert_eq!(eff.fix_command, DEFAULT_FIX_COMMAND);
        assert!(eff.up_to_date);
        assert!(eff.index_file.ends_with(".fmtcheck/up-to-date.json"));
        assert_eq!(eff.max_files, DEFAULT_MAX_FILES);
        assert_eq!(eff.max_lines, DEFAULT_MAX_LINES);
        assert!(eff.linebreak.strict);
        assert_eq!(eff.jobs, None);
    }

    #[test]
    fn test_precedence_and_linebreak_overrides_loaded() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("fmtcheck.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
index = "conventions/acme/index.toml"
[check]
upToDate = true
fixCommand = "make fmt"
[format]
strictLineBreak = true
[format.linebreak]
between_groups = false
[format.linebreak.before_fields]
license = "keep"
[format.linebreak.in_fields]
scripts = "keep"
[rules.package]
patterns = ["pkg/*.json"]
            "#
        )
        .unwrap();

        let cli = CliOverrides {
            up_to_date: Some(false),
            fix_command: Some("just fmt".into()),
            index: Some("other/index.toml".into()),
            ..at(root)
        };
        let eff = resolve_effective(&cli).unwrap();
        assert!(!eff.up_to_date);
        assert_eq!(eff.fix_command, "just fmt");
        assert_eq!(eff.index.as_deref(), Some("other/index.toml"));
        assert_eq!(eff.linebreak.between_groups, Some(false));
        assert_eq!(
            eff.linebreak.before_fields.get("license").map(String::as_str),
            Some("keep")
        );
        assert_eq!(
            eff.linebreak.in_fields.get("scripts").map(String::as_str),
            Some("keep")
        );
        assert_eq!(eff.pattern_overrides["package"], vec!["pkg/*.json"]);
    }

    #[test]
    fn test_missing_config_is_not_an_error() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        let eff = resolve_effective(&at(dir.path())).unwrap();
        assert!(!eff.config_found);
        assert!(eff.index.is_none());
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("fmtcheck.toml"), "index = [").unwrap();
        let err = resolve_effective(&at(dir.path())).unwrap_err();
        assert!(err.contains("fmtcheck.toml"));
    }

    #[test]
    fn test_detect_repo_root_walks_up() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("fmtcheck.toml"), "").unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(detect_repo_root(&nested), dir.path());
    }
}
