//! JSON formatter for policy-driven ordering and line breaks.
//!
//! Canonical form is produced in three deterministic passes:
//! - key ordering from the policy's `order.top` groups (remaining keys
//!   follow in lexicographic order) and `order.sub` for nested objects;
//! - two-space pretty printing with a trailing newline;
//! - line-break adjustments from `linebreak` rules when `strict_linebreak`
//!   is on (config default: true).
//!
//! Design notes:
//! - Group line breaks are only inserted at object depth 1 (top-level),
//!   and never before the first group. `before_fields` can override
//!   insertion for the first key of each group.
//! - In-field line breaks use the original source to preserve existing
//!   blank lines for fields marked `keep`.
//! - Brace depth is tracked per line and does not look inside strings.

use crate::checks::run_checks;
use crate::dirty::Formatter;
use crate::lint::Lint;
use crate::models::policy::{LineBreakRule, Policy};
use serde_json::{Map, Value as Json};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Line-break settings from configuration; they override the policy.
#[derive(Debug, Clone)]
pub struct LineBreakSettings {
    pub strict: bool,
    pub between_groups: Option<bool>,
    pub before_fields: HashMap<String, String>,
    pub in_fields: HashMap<String, String>,
}

impl Default for LineBreakSettings {
    fn default() -> Self {
        LineBreakSettings {
            strict: true,
            between_groups: None,
            before_fields: HashMap::new(),
            in_fields: HashMap::new(),
        }
    }
}

/// `Formatter` for JSON files governed by one policy.
pub struct JsonFormatter {
    policy: Policy,
    strict: bool,
    between_groups: bool,
    before_fields: HashMap<String, LineBreakRule>,
    in_fields: HashMap<String, LineBreakRule>,
    fingerprint: String,
}

impl JsonFormatter {
    /// Build from the policy's TOML source and configuration overrides.
    pub fn parse(policy_src: &str, settings: &LineBreakSettings) -> Result<Self, toml::de::Error> {
        let policy: Policy = toml::from_str(policy_src)?;
        Ok(Self::new(policy, policy_src, settings))
    }

    fn new(policy: Policy, policy_src: &str, settings: &LineBreakSettings) -> Self {
        let lb = policy.linebreak.as_ref();
        let between_groups = settings
            .between_groups
            .or(lb.and_then(|l| l.between_groups))
            .unwrap_or(false);
        let before_fields = merge_linebreak_fields(lb.map(|l| &l.before_fields), &settings.before_fields);
        let in_fields = merge_linebreak_fields(lb.map(|l| &l.in_fields), &settings.in_fields);
        let fingerprint = fingerprint_of(policy_src, settings);
        JsonFormatter {
            policy,
            strict: settings.strict,
            between_groups,
            before_fields,
            in_fields,
            fingerprint,
        }
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, raw: &str, _path: &Path) -> Result<String, Lint> {
        let mut json: Json = serde_json::from_str(raw).map_err(parse_lint)?;
        if let Some(ord) = self.policy.order.as_ref() {
            apply_order(&mut json, &ord.top, &ord.sub);
        }
        let mut s = serde_json::to_string_pretty(&json)
            .map_err(|e| Lint::new("format", e.to_string()))?;
        if self.strict {
            if let Some(ord) = self.policy.order.as_ref() {
                if self.between_groups {
                    s = apply_linebreaks(s, &ord.top, &self.before_fields);
                }
            }
            let keep_map = compute_in_field_keep_map(raw, &self.in_fields);
            s = apply_in_field_linebreaks(s, &self.in_fields, &keep_map);
        }
        s.push('\n');
        Ok(s)
    }

    fn lint(&self, content: &str, _path: &Path) -> Vec<Lint> {
        if self.policy.checks.is_empty() {
            return Vec::new();
        }
        // unparseable content was already reported by `format`
        match serde_json::from_str::<Json>(content) {
            Ok(doc) => run_checks(&self.policy.checks, &doc, content),
            Err(_) => Vec::new(),
        }
    }

    fn fingerprint(&self) -> String {
        self.fingerprint.clone()
    }
}

fn parse_lint(e: serde_json::Error) -> Lint {
    Lint::new("parse", format!("invalid JSON: {}", e)).at_line(e.line().max(1))
}

fn fingerprint_of(policy_src: &str, settings: &LineBreakSettings) -> String {
    let sorted = |m: &HashMap<String, String>| -> BTreeMap<String, String> {
        m.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    };
    let mut h = Sha256::new();
    h.update(env!("CARGO_PKG_VERSION").as_bytes());
    h.update(policy_src.as_bytes());
    h.update(
        format!(
            "{}|{:?}|{:?}|{:?}",
            settings.strict,
            settings.between_groups,
            sorted(&settings.before_fields),
            sorted(&settings.in_fields)
        )
        .as_bytes(),
    );
    hex::encode(h.finalize())
}

/// Reorder an object according to top-level groups and per-field orders.
///
/// Keys not listed are appended in lexicographic order.
fn apply_order(json: &mut Json, top: &[Vec<String>], sub: &HashMap<String, Vec<String>>) {
    if let Json::Object(obj) = json {
        let flat: Vec<String> = top.iter().flatten().cloned().collect();
        reorder(obj, &flat);
        for (field, keys) in sub {
            if let Some(Json::Object(inner)) = obj.get_mut(field) {
                reorder(inner, keys);
            }
        }
    }
}

fn reorder(obj: &mut Map<String, Json>, listed: &[String]) {
    let mut new_obj = Map::new();
    for key in listed {
        if let Some(v) = obj.remove(key) {
            new_obj.insert(key.clone(), v);
        }
    }
    let mut rest: Vec<String> = obj.keys().cloned().collect();
    rest.sort();
    for key in rest {
        if let Some(v) = obj.remove(&key) {
            new_obj.insert(key, v);
        }
    }
    *obj = new_obj;
}

/// Merge policy-provided field rules with configuration overrides.
fn merge_linebreak_fields(
    policy: Option<&HashMap<String, LineBreakRule>>,
    override_map: &HashMap<String, String>,
) -> HashMap<String, LineBreakRule> {
    let mut out: HashMap<String, LineBreakRule> = policy.cloned().unwrap_or_default();
    for (k, v) in override_map {
        out.insert(k.clone(), LineBreakRule::from_override(v));
    }
    out
}

/// Key named at the start of a trimmed line (`"key": ...`).
fn leading_key(trimmed: &str) -> Option<&str> {
    let rest = trimmed.strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(&rest[..end])
}

fn brace_delta(trimmed: &str) -> i32 {
    trimmed.chars().fold(0, |d, ch| match ch {
        '{' => d + 1,
        '}' => d - 1,
        _ => d,
    })
}

/// Leave exactly one blank line at the end of `out`.
fn ensure_single_blank(out: &mut Vec<String>) {
    match out.last() {
        Some(last) if last.is_empty() => {
            while out.len() >= 2 && out[out.len() - 2].is_empty() {
                out.pop();
            }
        }
        Some(_) => out.push(String::new()),
        None => {}
    }
}

fn drop_blanks(out: &mut Vec<String>) {
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
}

/// Is this line an entry (not a nested object opener) of the active field?
fn is_field_entry(depth: i32, trimmed: &str) -> bool {
    depth == 1 && trimmed.starts_with('"') && !trimmed.contains("\": {")
}

/// Scan the original source for child keys preceded by a blank line inside
/// objects configured with `Keep`. Returns `field -> {child keys}`.
fn compute_in_field_keep_map(
    original: &str,
    in_field_rules: &HashMap<String, LineBreakRule>,
) -> HashMap<String, HashSet<String>> {
    let mut result: HashMap<String, HashSet<String>> = HashMap::new();
    let targets: HashSet<&str> = in_field_rules
        .iter()
        .filter(|(_, v)| **v == LineBreakRule::Keep)
        .map(|(k, _)| k.as_str())
        .collect();
    if targets.is_empty() {
        return result;
    }
    let mut active: Option<String> = None;
    let mut depth: i32 = 0;
    let mut prev_blank = false;
    for line in original.lines() {
        let trimmed = line.trim();
        if active.is_none() && trimmed.contains(": {") {
            if let Some(key) = leading_key(trimmed).filter(|k| targets.contains(k)) {
                active = Some(key.to_string());
                depth = 0;
            }
        }
        if let Some(fld) = active.clone() {
            depth += brace_delta(trimmed);
            if prev_blank && is_field_entry(depth, trimmed) {
                if let Some(child) = leading_key(trimmed) {
                    result.entry(fld).or_default().insert(child.to_string());
                }
            }
            if depth <= 0 && trimmed.contains('}') {
                active = None;
            }
        }
        prev_blank = trimmed.is_empty();
    }
    result
}

/// Insert one blank line before the first key of every non-first group.
///
/// Only lines at object depth 1 are considered. `field_rules[key] == None`
/// removes the blank line before that key instead.
fn apply_linebreaks(
    pretty: String,
    groups: &[Vec<String>],
    field_rules: &HashMap<String, LineBreakRule>,
) -> String {
    if groups.is_empty() {
        return pretty;
    }
    let group_first_keys: HashSet<&str> = groups
        .iter()
        .filter_map(|g| g.first().map(String::as_str))
        .collect();
    let mut out: Vec<String> = Vec::new();
    let mut seen_first = false;
    let mut depth: i32 = 0;
    for line in pretty.lines() {
        let trimmed = line.trim_start();
        if depth == 1 {
            if let Some(key) = leading_key(trimmed).filter(|k| group_first_keys.contains(k)) {
                if !seen_first {
                    seen_first = true;
                } else if field_rules.get(key) == Some(&LineBreakRule::None) {
                    drop_blanks(&mut out);
                } else {
                    ensure_single_blank(&mut out);
                }
            }
        }
        out.push(line.to_string());
        depth += brace_delta(trimmed);
    }
    out.join("\n")
}

/// Apply in-field rules: `Keep` reproduces a blank line before a child key
/// only where `keep_map` says the original had one; `None` removes them.
fn apply_in_field_linebreaks(
    pretty: String,
    in_field_rules: &HashMap<String, LineBreakRule>,
    keep_map: &HashMap<String, HashSet<String>>,
) -> String {
    if in_field_rules.is_empty() {
        return pretty;
    }
    let mut out: Vec<String> = Vec::new();
    // (field, rule, seen first entry)
    let mut active: Option<(String, LineBreakRule, bool)> = None;
    let mut depth: i32 = 0;
    for line in pretty.lines() {
        let trimmed = line.trim_start();
        if active.is_none() && trimmed.contains(": {") {
            if let Some(key) = leading_key(trimmed) {
                if let Some(rule) = in_field_rules.get(key) {
                    active = Some((key.to_string(), *rule, false));
                    depth = 0;
                }
            }
        }
        if let Some((fld, rule, seen_first)) = active.as_mut() {
            depth += brace_delta(trimmed);
            if is_field_entry(depth, trimmed) {
                if !*seen_first {
                    *seen_first = true;
                } else {
                    let wants_blank = *rule == LineBreakRule::Keep
                        && leading_key(trimmed)
                            .zip(keep_map.get(fld.as_str()))
                            .is_some_and(|(child, set)| set.contains(child));
                    if wants_blank {
                        ensure_single_blank(&mut out);
                    } else {
                        drop_blanks(&mut out);
                    }
                }
            }
        }
        out.push(line.to_string());
        if active.is_some() && depth <= 0 && trimmed.contains('}') {
            active = None;
        }
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn formatter(policy: &str) -> JsonFormatter {
        JsonFormatter::parse(policy, &LineBreakSettings::default()).unwrap()
    }

    fn fmt(f: &JsonFormatter, raw: &str) -> String {
        f.format(raw, Path::new("x.json")).unwrap()
    }

    #[test]
    fn test_apply_order_top_then_rest_sorted() {
        let mut json = json!({
            "z": 1,
            "b": 2,
            "a": 3,
            "version": "v",
            "name": "n"
        });
        let top = vec![vec!["name".to_string(), "version".to_string()]];
        apply_order(&mut json, &top, &HashMap::new());
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["name", "version", "a", "b", "z"]);
    }

    #[test]
    fn test_apply_order_sub_orders_nested_object() {
        let mut json = json!({
            "scripts": { "test": "t", "lint": "l", "build": "b" }
        });
        let mut sub = HashMap::new();
        sub.insert("scripts".to_string(), vec!["build".to_string(), "test".to_string()]);
        apply_order(&mut json, &[], &sub);
        let keys: Vec<_> = json["scripts"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["build", "test", "lint"]);
    }

    #[test]
    fn test_apply_linebreaks_between_groups_inserts_blank_line() {
        let pretty = r#"{
  "name": "x",
  "version": "1.0.0",
  "scripts": {},
  "dependencies": {}
}"#
        .to_string();
        let groups = vec![
            vec!["name".to_string(), "version".to_string()],
            vec!["scripts".to_string(), "dependencies".to_string()],
        ];
        let out = apply_linebreaks(pretty, &groups, &HashMap::new());
        assert!(out.contains("\n\n  \"scripts\""));
        assert!(!out.starts_with("{\n\n"));
    }

    #[test]
    fn test_apply_linebreaks_before_fields_none_suppresses() {
        let pretty = "{\n  \"name\": \"x\",\n\n  \"scripts\": {}\n}".to_string();
        let groups = vec![vec!["name".to_string()], vec!["scripts".to_string()]];
        let mut rules = HashMap::new();
        rules.insert("scripts".to_string(), LineBreakRule::None);
        let out = apply_linebreaks(pretty, &groups, &rules);
        assert_eq!(out, "{\n  \"name\": \"x\",\n  \"scripts\": {}\n}");
    }

    #[test]
    fn test_apply_in_field_linebreaks_keep_does_not_insert() {
        let pretty = r#"{
  "scripts": {
    "build": "echo build",
    "test": "echo test"
  }
}"#
        .to_string();
        let mut rules = HashMap::new();
        rules.insert("scripts".to_string(), LineBreakRule::Keep);
        let out = apply_in_field_linebreaks(pretty, &rules, &HashMap::new());
        assert!(!out.contains("\n\n"));
    }

    #[test]
    fn test_apply_in_field_linebreaks_keep_preserves_existing_single_blank() {
        let original = r#"{
    "scripts": {
        "build": "echo build",


        "test": "echo test"
    }
}"#;
        let pretty = r#"{
  "scripts": {
    "build": "echo build",
    "test": "echo test"
  }
}"#
        .to_string();
        let mut rules = HashMap::new();
        rules.insert("scripts".to_string(), LineBreakRule::Keep);
        let keep_map = compute_in_field_keep_map(original, &rules);
        let out = apply_in_field_linebreaks(pretty, &rules, &keep_map);
        assert!(out.contains("\"build\": \"echo build\",\n\n    \"test\""));
        assert!(!out.contains("\n\n\n"));
    }

    #[test]
    fn test_format_produces_canonical_text() {
        let f = formatter(
            r#"
[order]
top = [["name", "version"], ["scripts"]]

[linebreak]
between_groups = true
"#,
        );
        let out = fmt(&f, r#"{"scripts":{"b":"2"},"version":"1.0.0","name":"demo"}"#);
        assert_eq!(
            out,
            "{\n  \"name\": \"demo\",\n  \"version\": \"1.0.0\",\n\n  \"scripts\": {\n    \"b\": \"2\"\n  }\n}\n"
        );
    }

    #[test]
    fn test_format_is_idempotent() {
        let f = formatter(
            r#"
[order]
top = [["name"], ["scripts"]]
sub = { scripts = ["build"] }

[linebreak]
between_groups = true
in_fields = { scripts = "keep" }
"#,
        );
        let raw = "{\"scripts\": {\n\"test\": \"t\",\n\n\"build\": \"b\"}, \"name\": \"n\"}";
        let once = fmt(&f, raw);
        assert_eq!(fmt(&f, &once), once);
    }

    #[test]
    fn test_format_without_policy_keeps_key_order() {
        let f = formatter("");
        let out = fmt(&f, r#"{"b":1,"a":2}"#);
        assert_eq!(out, "{\n  \"b\": 1,\n  \"a\": 2\n}\n");
    }

    #[test]
    fn test_strict_linebreak_off_skips_blank_lines() {
        let settings = LineBreakSettings {
            strict: false,
            ..LineBreakSettings::default()
        };
        let f = JsonFormatter::parse(
            "[order]\ntop = [[\"a\"], [\"b\"]]\n[linebreak]\nbetween_groups = true\n",
            &settings,
        )
        .unwrap();
        let out = f.format(r#"{"b":1,"a":2}"#, Path::new("x.json")).unwrap();
        assert_eq!(out, "{\n  \"a\": 2,\n  \"b\": 1\n}\n");
    }

    #[test]
    fn test_invalid_json_is_a_lint() {
        let f = formatter("");
        let err = f.format("{\n  \"a\": ,\n}", Path::new("x.json")).unwrap_err();
        assert_eq!(err.rule, "parse");
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn test_lint_runs_policy_checks() {
        let f = formatter("[[checks]]\nkind = \"required\"\nfields = [\"name\"]\n");
        let lints = f.lint("{\n  \"version\": \"1\"\n}\n", Path::new("x.json"));
        assert_eq!(lints.len(), 1);
        assert_eq!(lints[0].rule, "required");
    }

    #[test]
    fn test_fingerprint_tracks_policy_and_overrides() {
        let a = formatter("[order]\ntop = [[\"a\"]]\n");
        let b = formatter("[order]\ntop = [[\"b\"]]\n");
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), formatter("[order]\ntop = [[\"a\"]]\n").fingerprint());
        let mut settings = LineBreakSettings::default();
        settings.in_fields.insert("scripts".into(), "keep".into());
        let c = JsonFormatter::parse("[order]\ntop = [[\"a\"]]\n", &settings).unwrap();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
