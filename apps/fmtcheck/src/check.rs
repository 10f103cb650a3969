//! `fmtcheck check`: resolve the index, discover files per rule and verify
//! each rule in index order.
//!
//! All rules share one up-to-date index whose fingerprint covers every
//! rule's formatter, so editing any policy re-checks everything. Entries are
//! scoped per rule: a file two rules match is verified by both. The index is
//! saved after the run whether it passed or not.

use crate::cache::{FileIndex, NoopChecker};
use crate::config::Effective;
use crate::dirty::{Formatter, FormatterCalculator};
use crate::engine::{Verified, Verifier};
use crate::error::{CheckError, Result};
use crate::format::JsonFormatter;
use crate::models::index::{Index, RuleIndex};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A rule ready to verify: its formatter and matched files.
pub struct PreparedRule {
    pub id: String,
    pub calculator: FormatterCalculator<JsonFormatter>,
    pub files: Vec<PathBuf>,
}

/// Run every rule; stop at the first rule that fails.
pub fn run_check(eff: &Effective, err_out: &mut dyn Write) -> Result<Vec<(String, Verified)>> {
    let rules = prepare_rules(eff)?;
    let verifier = Verifier::new(&eff.repo_root, eff.fix_command.as_str())
        .jobs(eff.jobs)
        .report_limits(eff.max_files, eff.max_lines);

    if !eff.up_to_date {
        return verify_rules(&verifier, &rules, None, err_out);
    }
    let fingerprint = combined_fingerprint(&rules);
    let index = FileIndex::open(&eff.repo_root, &eff.index_file, &fingerprint);
    let result = verify_rules(&verifier, &rules, Some(&index), err_out);
    if let Err(e) = index.save() {
        tracing::warn!(index = %eff.index_file.display(), error = %e, "could not save up-to-date index");
    }
    result
}

fn verify_rules(
    verifier: &Verifier,
    rules: &[PreparedRule],
    index: Option<&FileIndex>,
    err_out: &mut dyn Write,
) -> Result<Vec<(String, Verified)>> {
    let mut done = Vec::with_capacity(rules.len());
    for rule in rules {
        tracing::debug!(rule = %rule.id, files = rule.files.len(), "verifying rule");
        let v = match index {
            Some(index) => {
                let scope = index.scope(&rule.id);
                verifier.verify(&rule.files, &rule.calculator, &scope, err_out)?
            }
            None => verifier.verify(&rule.files, &rule.calculator, &NoopChecker, err_out)?,
        };
        done.push((rule.id.clone(), v));
    }
    Ok(done)
}

/// Load the index, build each rule's formatter and expand its patterns.
pub fn prepare_rules(eff: &Effective) -> Result<Vec<PreparedRule>> {
    let index_rel = eff.index.as_deref().ok_or_else(|| {
        CheckError::Config("Index is not configured. Pass --index or add fmtcheck.toml.".into())
    })?;
    let idx_path = eff.repo_root.join(index_rel);
    let idx_str = fs::read_to_string(&idx_path).map_err(|e| {
        CheckError::Config(format!(
            "Index file not found: {} ({})",
            idx_path.display(),
            e
        ))
    })?;
    let index: Index = toml::from_str(&idx_str).map_err(|e| {
        CheckError::Config(format!("Index file is not valid TOML: {}: {}", idx_path.display(), e))
    })?;
    let idx_dir = idx_path.parent().unwrap_or_else(|| Path::new("."));

    let mut prepared = Vec::with_capacity(index.rules.len());
    for ri in index.rules {
        let pol_path = idx_dir.join(&ri.policy);
        let pol_src = fs::read_to_string(&pol_path).map_err(|e| {
            CheckError::Config(format!(
                "Policy file not found for rule '{}': {} ({})",
                ri.id,
                pol_path.display(),
                e
            ))
        })?;
        let formatter = JsonFormatter::parse(&pol_src, &eff.linebreak).map_err(|e| {
            CheckError::Config(format!(
                "Policy file for rule '{}' is not valid TOML: {}",
                ri.id, e
            ))
        })?;
        let files = discover(&eff.repo_root, &ri, eff)?;
        prepared.push(PreparedRule {
            id: ri.id,
            calculator: FormatterCalculator::new(formatter),
            files,
        });
    }
    Ok(prepared)
}

/// Expand a rule's globs (or their configured override) into sorted files.
fn discover(root: &Path, ri: &RuleIndex, eff: &Effective) -> Result<Vec<PathBuf>> {
    let patterns = eff.pattern_overrides.get(&ri.id).unwrap_or(&ri.patterns);
    let mut found: BTreeSet<PathBuf> = BTreeSet::new();
    for pat in patterns {
        let pattern = root.join(pat).to_string_lossy().to_string();
        let paths = glob::glob(&pattern).map_err(|e| {
            CheckError::Config(format!("Bad glob pattern '{}' in rule '{}': {}", pat, ri.id, e))
        })?;
        for entry in paths {
            match entry {
                Ok(p) if p.is_file() => {
                    found.insert(p);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "skipping unreadable path"),
            }
        }
    }
    Ok(found.into_iter().collect())
}

fn combined_fingerprint(rules: &[PreparedRule]) -> String {
    let mut h = Sha256::new();
    for rule in rules {
        h.update(rule.id.as_bytes());
        h.update([0u8]);
        h.update(rule.calculator.formatter().fingerprint().as_bytes());
        h.update([0u8]);
    }
    hex::encode(h.finalize())
}
