//! Input resolution
//!
//! Turns a manifest's declared inputs into concrete values. Values already
//! known (explicitly provided, or stored from a previous install) win; anything
//! still missing is prompted for through a [`Prompter`], or reported as
//! [`Error::MissingRequiredInput`] when running non-interactively.
//!
//! All terminal I/O lives behind [`Prompter`], so the rest of the pipeline can
//! be driven from tests without a terminal.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use mcpm_meta::InputSpec;

use crate::{Error, Result};

/// Replacement shown wherever a secret value would appear.
pub const REDACTED: &str = "****";

/// Concrete values for a package's inputs, keyed by input name.
///
/// Values flagged secret are masked by the `Debug` impl and by
/// [`ResolvedInputs::redact`].
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResolvedInputs {
    values: BTreeMap<String, String>,
    secrets: BTreeSet<String>,
}

impl ResolvedInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a plain value, clearing any secret flag for `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.secrets.remove(&name);
        self.values.insert(name, value.into());
    }

    /// Set a value that must never be logged or stored in plain text.
    pub fn insert_secret(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.secrets.insert(name.clone());
        self.values.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_secret(&self, name: &str) -> bool {
        self.secrets.contains(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All `(name, value)` pairs, secrets included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Values safe to persist in plain text.
    pub fn public_values(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .filter(|(k, _)| !self.secrets.contains(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Secret `(name, value)` pairs.
    pub fn secret_values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .filter(|(k, _)| self.secrets.contains(*k))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay `other` onto `self`; values in `other` win.
    pub fn merge(&mut self, other: &ResolvedInputs) {
        for (name, value) in other.iter() {
            if other.is_secret(name) {
                self.insert_secret(name, value);
            } else {
                self.insert(name, value);
            }
        }
    }

    /// Replace every secret value occurring in `text` with [`REDACTED`].
    pub fn redact(&self, text: &str) -> String {
        // Longest first, so a secret containing another secret is fully masked.
        let mut secrets: Vec<&str> = self
            .secret_values()
            .map(|(_, v)| v)
            .filter(|v| !v.is_empty())
            .collect();
        secrets.sort_by_key(|v| std::cmp::Reverse(v.len()));

        secrets
            .into_iter()
            .fold(text.to_string(), |acc, secret| acc.replace(secret, REDACTED))
    }
}

impl fmt::Debug for ResolvedInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.values {
            if self.secrets.contains(name) {
                map.entry(name, &REDACTED);
            } else {
                map.entry(name, value);
            }
        }
        map.finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ResolvedInputs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut inputs = Self::new();
        for (k, v) in iter {
            inputs.insert(k, v);
        }
        inputs
    }
}

/// Source of values the user types in.
pub trait Prompter {
    /// Ask for a value for `spec`. Secret inputs must be read without echo.
    ///
    /// Returns [`Error::Cancelled`] when the user aborts (Ctrl-C, EOF).
    fn prompt(&mut self, spec: &InputSpec) -> Result<String>;
}

/// Whether missing inputs may be prompted for.
pub enum InputMode<'a> {
    Interactive(&'a mut dyn Prompter),
    NonInteractive,
}

impl InputMode<'_> {
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive(_))
    }
}

/// Resolve every declared input.
///
/// For each spec, in manifest order: a value in `known` is used as is;
/// otherwise non-interactive mode fails with
/// [`Error::MissingRequiredInput`], and interactive mode prompts. The secret
/// flag of the result follows the spec, whatever the source of the value.
/// Values in `known` that no spec declares are dropped.
pub fn resolve(
    specs: &[InputSpec],
    known: &ResolvedInputs,
    mode: &mut InputMode<'_>,
) -> Result<ResolvedInputs> {
    let mut resolved = ResolvedInputs::new();

    for spec in specs {
        let value = match known.get(&spec.name) {
            Some(value) => {
                tracing::debug!(input = %spec.name, "using stored value");
                value.to_string()
            }
            None => match mode {
                InputMode::NonInteractive => {
                    return Err(Error::MissingRequiredInput {
                        name: spec.name.clone(),
                    });
                }
                InputMode::Interactive(prompter) => prompter.prompt(spec)?,
            },
        };

        if spec.secret {
            resolved.insert_secret(&spec.name, value);
        } else {
            resolved.insert(&spec.name, value);
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;

    struct Scripted {
        answers: VecDeque<String>,
        asked: Vec<String>,
    }

    impl Scripted {
        fn new(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().map(|a| a.to_string()).collect(),
                asked: Vec::new(),
            }
        }
    }

    impl Prompter for Scripted {
        fn prompt(&mut self, spec: &InputSpec) -> Result<String> {
            self.asked.push(spec.name.clone());
            self.answers.pop_front().ok_or(Error::Cancelled)
        }
    }

    fn spec(name: &str, secret: bool) -> InputSpec {
        InputSpec {
            name: name.to_string(),
            prompt: None,
            input_type: "string".to_string(),
            secret,
        }
    }

    #[test]
    fn known_values_are_not_prompted() {
        let known: ResolvedInputs = [("REGION", "eu")].into_iter().collect();
        let mut prompter = Scripted::new(&["abc123"]);

        let resolved = resolve(
            &[spec("REGION", false), spec("API_KEY", true)],
            &known,
            &mut InputMode::Interactive(&mut prompter),
        )
        .unwrap();

        assert_eq!(prompter.asked, vec!["API_KEY"]);
        assert_eq!(resolved.get("REGION"), Some("eu"));
        assert_eq!(resolved.get("API_KEY"), Some("abc123"));
        assert!(resolved.is_secret("API_KEY"));
    }

    #[test]
    fn non_interactive_reports_first_missing_input() {
        let result = resolve(
            &[spec("A", false), spec("B", false)],
            &ResolvedInputs::new(),
            &mut InputMode::NonInteractive,
        );
        assert!(matches!(result, Err(Error::MissingRequiredInput { name }) if name == "A"));
    }

    #[test]
    fn cancelled_prompt_propagates() {
        let mut prompter = Scripted::new(&[]);
        let result = resolve(
            &[spec("A", false)],
            &ResolvedInputs::new(),
            &mut InputMode::Interactive(&mut prompter),
        );
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn secret_flag_follows_spec() {
        let known: ResolvedInputs = [("TOKEN", "t0k")].into_iter().collect();
        let resolved = resolve(&[spec("TOKEN", true)], &known, &mut InputMode::NonInteractive)
            .unwrap();
        assert!(resolved.is_secret("TOKEN"));
        assert!(resolved.public_values().is_empty());
    }

    #[test]
    fn undeclared_known_values_are_dropped() {
        let known: ResolvedInputs = [("A", "1"), ("STALE", "x")].into_iter().collect();
        let resolved =
            resolve(&[spec("A", false)], &known, &mut InputMode::NonInteractive).unwrap();
        assert_eq!(resolved.len(), 1);
        assert!(!resolved.contains("STALE"));
    }

    #[test]
    fn debug_masks_secrets() {
        let mut inputs = ResolvedInputs::new();
        inputs.insert("REGION", "eu");
        inputs.insert_secret("API_KEY", "abc123");

        let rendered = format!("{inputs:?}");
        assert!(rendered.contains("eu"));
        assert!(!rendered.contains("abc123"));
        assert!(rendered.contains(REDACTED));
    }

    #[test]
    fn redact_masks_every_occurrence() {
        let mut inputs = ResolvedInputs::new();
        inputs.insert_secret("KEY", "abc");
        inputs.insert_secret("LONG", "abcdef");
        inputs.insert("PLAIN", "visible");

        assert_eq!(
            inputs.redact("abcdef abc visible"),
            "**** **** visible".to_string()
        );
    }

    #[test]
    fn merge_overrides_and_keeps_secret_flag() {
        let mut base: ResolvedInputs = [("A", "old"), ("B", "keep")].into_iter().collect();
        let mut overlay = ResolvedInputs::new();
        overlay.insert_secret("A", "new");

        base.merge(&overlay);
        assert_eq!(base.get("A"), Some("new"));
        assert!(base.is_secret("A"));
        assert_eq!(base.get("B"), Some("keep"));
    }
}
