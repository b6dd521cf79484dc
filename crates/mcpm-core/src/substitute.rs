//! `${VAR}` substitution
//!
//! Flat key to string replacement over strings and JSON trees. Each template
//! is scanned once; text produced by a replacement is never rescanned, so a
//! value containing `${...}` is inserted literally.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::inputs::ResolvedInputs;
use crate::{Error, Result};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// Output of a lenient substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct Substituted<T> {
    pub value: T,
    /// Names with no value, in first-seen order, without duplicates.
    /// Their placeholders are left in `value` untouched.
    pub unresolved: Vec<String>,
}

impl<T> Substituted<T> {
    /// Fail with [`Error::UnknownVariable`] if anything was left unresolved.
    pub fn into_strict(self) -> Result<T> {
        if self.unresolved.is_empty() {
            Ok(self.value)
        } else {
            Err(Error::UnknownVariable {
                names: self.unresolved,
            })
        }
    }
}

/// Replace every placeholder in `template`, failing on unknown names.
pub fn substitute(template: &str, values: &ResolvedInputs) -> Result<String> {
    substitute_lenient(template, values).into_strict()
}

/// Replace the placeholders that have a value and report the rest.
pub fn substitute_lenient(template: &str, values: &ResolvedInputs) -> Substituted<String> {
    let mut unresolved = Vec::new();
    let value = replace_in(template, values, &mut unresolved);
    Substituted { value, unresolved }
}

/// Substitute into every string leaf of `value`, failing on unknown names.
///
/// Object keys and non-string scalars pass through unchanged.
pub fn substitute_value(value: &Value, values: &ResolvedInputs) -> Result<Value> {
    substitute_value_lenient(value, values).into_strict()
}

/// Lenient form of [`substitute_value`].
pub fn substitute_value_lenient(value: &Value, values: &ResolvedInputs) -> Substituted<Value> {
    let mut unresolved = Vec::new();
    let value = walk(value, values, &mut unresolved);
    Substituted { value, unresolved }
}

/// Names referenced by `template`, in order of first appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(template) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

fn walk(value: &Value, values: &ResolvedInputs, unresolved: &mut Vec<String>) -> Value {
    match value {
        Value::String(s) => Value::String(replace_in(s, values, unresolved)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| walk(item, values, unresolved))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), walk(v, values, unresolved)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn replace_in(template: &str, values: &ResolvedInputs, unresolved: &mut Vec<String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            match values.get(name) {
                Some(value) => value.to_string(),
                None => {
                    if !unresolved.iter().any(|n| n == name) {
                        unresolved.push(name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn inputs(pairs: &[(&str, &str)]) -> ResolvedInputs {
        pairs.iter().copied().collect()
    }

    #[test]
    fn single_placeholder() {
        assert_eq!(substitute("${X}", &inputs(&[("X", "v")])).unwrap(), "v");
    }

    #[test]
    fn unknown_variable_is_named() {
        let err = substitute("${Y}", &ResolvedInputs::new()).unwrap_err();
        assert!(matches!(err, Error::UnknownVariable { names } if names == vec!["Y"]));
    }

    #[test]
    fn unknown_variables_are_aggregated_once() {
        let err = substitute("${A} ${B} ${A} ${C}", &inputs(&[("C", "c")])).unwrap_err();
        assert!(matches!(err, Error::UnknownVariable { names } if names == vec!["A", "B"]));
    }

    #[rstest]
    #[case::no_placeholders("npm install", "npm install")]
    #[case::repeated("${X}-${X}", "v-v")]
    #[case::adjacent("${X}${Y}", "vw")]
    #[case::bare_dollar("$X and ${X}", "$X and v")]
    #[case::invalid_ident("${1X} ${X}", "${1X} v")]
    #[case::unterminated("${X", "${X")]
    fn substitution_cases(#[case] template: &str, #[case] expected: &str) {
        let values = inputs(&[("X", "v"), ("Y", "w")]);
        assert_eq!(substitute(template, &values).unwrap(), expected);
    }

    #[test]
    fn single_pass_does_not_expand_values() {
        let values = inputs(&[("A", "${B}"), ("B", "nope")]);
        assert_eq!(substitute("${A}", &values).unwrap(), "${B}");
    }

    #[test]
    fn lenient_keeps_placeholder_and_reports() {
        let out = substitute_lenient("run ${X} ${MISSING}", &inputs(&[("X", "v")]));
        assert_eq!(out.value, "run v ${MISSING}");
        assert_eq!(out.unresolved, vec!["MISSING"]);
    }

    #[test]
    fn value_substitution_touches_only_string_leaves() {
        let block = json!({
            "command": "node",
            "args": ["server.js", "--key=${API_KEY}"],
            "env": {"API_KEY": "${API_KEY}"},
            "disabled": false,
            "port": 8080,
            "${API_KEY}": null
        });
        let out = substitute_value(&block, &inputs(&[("API_KEY", "abc123")])).unwrap();
        assert_eq!(
            out,
            json!({
                "command": "node",
                "args": ["server.js", "--key=abc123"],
                "env": {"API_KEY": "abc123"},
                "disabled": false,
                "port": 8080,
                "${API_KEY}": null
            })
        );
    }

    #[test]
    fn value_substitution_aggregates_across_leaves() {
        let block = json!({"command": "${CMD}", "env": {"K": "${KEY}"}});
        let err = substitute_value(&block, &ResolvedInputs::new()).unwrap_err();
        assert!(matches!(err, Error::UnknownVariable { names } if names == vec!["CMD", "KEY"]));
    }

    #[test]
    fn placeholders_in_order() {
        assert_eq!(placeholders("${B} ${A} ${B}"), vec!["B", "A"]);
    }
}
