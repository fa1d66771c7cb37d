//! Variable files and `((placeholder))` interpolation.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_yaml::Value;

use super::document::parse_document;
use crate::error::EngineError;

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\(\((!?[-/\.\w\p{L}]+)\)\)").expect("placeholder pattern compiles")
    })
}

/// Merged set of static variables. Later files override earlier ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarSet {
    values: BTreeMap<String, Value>,
}

impl VarSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a variable file: a YAML map of names to values.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Parse`] if the file is not a map with string keys.
    pub fn parse(name: &str, content: &str) -> Result<Self, EngineError> {
        let context = || format!("vars file '{name}'");
        let doc = parse_document(content).map_err(|e| EngineError::parse(context(), e))?;
        let values: Option<BTreeMap<String, Value>> =
            serde_yaml::from_value(doc).map_err(|e| EngineError::parse(context(), e))?;
        Ok(Self { values: values.unwrap_or_default() })
    }

    /// Merges `other` into this set; its values win.
    pub fn merge(&mut self, other: Self) {
        self.values.extend(other.values);
    }

    /// Number of top-level variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` when no variable is defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolves a placeholder name: a `!` prefix is ignored and dots walk
    /// into nested maps.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        let name = name.strip_prefix('!').unwrap_or(name);
        let mut parts = name.split('.');
        let mut current = self.values.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Replaces placeholders in every value of `doc`. Map keys are left as is,
    /// and unknown placeholders stay in place.
    ///
    /// # Errors
    ///
    /// Returns an error message when a placeholder embedded in a longer
    /// string resolves to a map or a list.
    pub fn interpolate(&self, doc: &mut Value) -> Result<(), String> {
        match doc {
            Value::String(s) => {
                if let Some(replacement) = self.interpolate_str(s)? {
                    *doc = replacement;
                }
                Ok(())
            }
            Value::Sequence(items) => items.iter_mut().try_for_each(|item| self.interpolate(item)),
            Value::Mapping(map) => map.values_mut().try_for_each(|v| self.interpolate(v)),
            Value::Tagged(tagged) => self.interpolate(&mut tagged.value),
            Value::Null | Value::Bool(_) | Value::Number(_) => Ok(()),
        }
    }

    fn interpolate_str(&self, s: &str) -> Result<Option<Value>, String> {
        let re = placeholder();
        if let Some(caps) = re.captures(s) {
            if caps.get(0).is_some_and(|m| m.as_str().len() == s.len()) {
                return Ok(self.lookup(&caps[1]).cloned());
            }
        } else {
            return Ok(None);
        }

        let mut failure = None;
        let replaced = re.replace_all(s, |caps: &Captures<'_>| match self.lookup(&caps[1]) {
            None => caps[0].to_string(),
            Some(value) => scalar_text(value).unwrap_or_else(|| {
                failure.get_or_insert_with(|| {
                    format!("placeholder '{}' inside '{s}' must resolve to a scalar", &caps[1])
                });
                caps[0].to_string()
            }),
        });
        match failure {
            Some(message) => Err(message),
            None => Ok(Some(Value::String(replaced.into_owned()))),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
    }
}
