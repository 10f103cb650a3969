//! Policy checks producing lints for JSON documents.
//!
//! Field paths are dotted (`repository.url`). A check on an absent field is
//! skipped, except for `required`. Findings carry the line of the field's key
//! in the checked text when it can be located.

use crate::lint::{locate_key_line, Lint};
use crate::models::policy::Check;
use regex::Regex;
use serde_json::Value as Json;

/// Evaluate `checks` against `doc`, which was parsed from `content`.
pub fn run_checks(checks: &[Check], doc: &Json, content: &str) -> Vec<Lint> {
    let mut lints = Vec::new();
    for check in checks {
        match check {
            Check::Required { fields, message } => {
                for field in fields {
                    if lookup(doc, field).is_none() {
                        lints.push(Lint::new(
                            "required",
                            message
                                .clone()
                                .unwrap_or_else(|| format!("missing required field '{}'", field)),
                        ));
                    }
                }
            }
            Check::Type { fields, message } => {
                let mut sorted: Vec<_> = fields.iter().collect();
                sorted.sort();
                for (field, kind) in sorted {
                    if let Some(v) = lookup(doc, field) {
                        if !is_kind(v, kind) {
                            push_at(
                                &mut lints,
                                content,
                                field,
                                "type",
                                message.clone().unwrap_or_else(|| {
                                    format!("field '{}' should be of type {}", field, kind)
                                }),
                            );
                        }
                    }
                }
            }
            Check::Pattern {
                field,
                regex,
                message,
            } => {
                let re = match Regex::new(regex) {
                    Ok(re) => re,
                    Err(e) => {
                        lints.push(Lint::new(
                            "pattern",
                            format!("invalid regex for '{}': {}", field, e),
                        ));
                        continue;
                    }
                };
                if let Some(Json::String(s)) = lookup(doc, field) {
                    if !re.is_match(s) {
                        push_at(
                            &mut lints,
                            content,
                            field,
                            "pattern",
                            message.clone().unwrap_or_else(|| {
                                format!("field '{}' does not match /{}/", field, regex)
                            }),
                        );
                    }
                }
            }
            Check::Enum {
                field,
                values,
                message,
            } => {
                if let Some(v) = lookup(doc, field) {
                    if !values.contains(v) {
                        push_at(
                            &mut lints,
                            content,
                            field,
                            "enum",
                            message.clone().unwrap_or_else(|| {
                                format!("field '{}' has a value outside the allowed set", field)
                            }),
                        );
                    }
                }
            }
            Check::MinLength {
                field,
                min,
                message,
            } => {
                if let Some(len) = lookup(doc, field).and_then(length_of) {
                    if len < *min {
                        push_at(
                            &mut lints,
                            content,
                            field,
                            "minLength",
                            message.clone().unwrap_or_else(|| {
                                format!("field '{}' is shorter than {}", field, min)
                            }),
                        );
                    }
                }
            }
            Check::MaxLength {
                field,
                max,
                message,
            } => {
                if let Some(len) = lookup(doc, field).and_then(length_of) {
                    if len > *max {
                        push_at(
                            &mut lints,
                            content,
                            field,
                            "maxLength",
                            message.clone().unwrap_or_else(|| {
                                format!("field '{}' is longer than {}", field, max)
                            }),
                        );
                    }
                }
            }
        }
    }
    lints
}

fn push_at(lints: &mut Vec<Lint>, content: &str, field: &str, rule: &str, message: String) {
    let lint = Lint::new(rule, message);
    lints.push(match locate_key_line(content, field) {
        Some(line) => lint.at_line(line),
        None => lint,
    });
}

fn lookup<'a>(doc: &'a Json, path: &str) -> Option<&'a Json> {
    path.split('.').try_fold(doc, |cur, seg| cur.as_object()?.get(seg))
}

fn is_kind(v: &Json, kind: &str) -> bool {
    match kind {
        "string" => v.is_string(),
        "number" => v.is_number(),
        "integer" => v.is_i64() || v.is_u64(),
        "boolean" => v.is_boolean(),
        "array" => v.is_array(),
        "object" => v.is_object(),
        "null" => v.is_null(),
        _ => true,
    }
}

fn length_of(v: &Json) -> Option<usize> {
    match v {
        Json::String(s) => Some(s.chars().count()),
        Json::Array(a) => Some(a.len()),
        Json::Object(o) => Some(o.len()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::policy::Policy;

    const DOC: &str = r#"{
  "name": "demo",
  "version": "1.0",
  "license": "GPL",
  "repository": {
    "url": 42
  },
  "keywords": []
}
"#;

    fn checks(src: &str) -> Vec<Check> {
        toml::from_str::<Policy>(src).unwrap().checks
    }

    fn run(src: &str) -> Vec<Lint> {
        let doc: Json = serde_json::from_str(DOC).unwrap();
        run_checks(&checks(src), &doc, DOC)
    }

    #[test]
    fn test_required_reports_missing_fields() {
        let lints = run(r#"
[[checks]]
kind = "required"
fields = ["name", "description", "repository.url"]
"#);
        assert_eq!(
            lints,
            vec![Lint::new("required", "missing required field 'description'")]
        );
    }

    #[test]
    fn test_type_points_at_line() {
        let lints = run(r#"
[[checks]]
kind = "type"
fields = { "repository.url" = "string", "name" = "string" }
"#);
        assert_eq!(lints.len(), 1);
        assert_eq!(lints[0].line, Some(6));
        assert_eq!(lints[0].rule, "type");
    }

    #[test]
    fn test_pattern_with_custom_message() {
        let lints = run(r#"
[[checks]]
kind = "pattern"
field = "version"
regex = '^\d+\.\d+\.\d+$'
message = "version must be semver"
"#);
        assert_eq!(
            lints,
            vec![Lint::new("pattern", "version must be semver").at_line(3)]
        );
    }

    #[test]
    fn test_invalid_regex_is_reported() {
        let lints = run(r#"
[[checks]]
kind = "pattern"
field = "version"
regex = "("
"#);
        assert_eq!(lints.len(), 1);
        assert!(lints[0].message.starts_with("invalid regex"));
    }

    #[test]
    fn test_enum_and_lengths() {
        let lints = run(r#"
[[checks]]
kind = "enum"
field = "license"
values = ["MIT", "Apache-2.0"]

[[checks]]
kind = "minLength"
field = "keywords"
min = 1

[[checks]]
kind = "maxLength"
field = "name"
max = 10
"#);
        let rules: Vec<_> = lints.iter().map(|l| l.rule.as_str()).collect();
        assert_eq!(rules, vec!["enum", "minLength"]);
        assert_eq!(lints[0].line, Some(4));
    }

    #[test]
    fn test_absent_field_is_skipped() {
        let lints = run(r#"
[[checks]]
kind = "pattern"
field = "homepage"
regex = "^https://"
"#);
        assert!(lints.is_empty());
    }
}
