//! Formatter style mappings
//!
//! A style is an insertion-ordered mapping from clang-format option keys to
//! values. It is rendered as YAML for `.clang-format` artifacts and the final
//! result, and as compact JSON for cache signatures and inline `--style`.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Ordered option-key → value mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Style(Mapping);

impl Style {
    /// Create an empty style
    pub fn new() -> Self {
        Self(Mapping::new())
    }

    /// Look up the value for a key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set a key, keeping its original position if it already exists
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(Value::String(key.into()), value);
    }

    /// Apply every entry of `other` on top of this style
    pub fn merge(&mut self, other: &Style) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Copy of this style with `overrides` applied
    pub fn with_overrides(&self, overrides: &Style) -> Style {
        let mut style = self.clone();
        style.merge(overrides);
        style
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as a YAML document
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.0)
    }

    /// Render as single-line JSON, which clang-format also accepts inline
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }
}

impl From<Mapping> for Style {
    fn from(mapping: Mapping) -> Self {
        Self(mapping)
    }
}

/// Text form of a scalar candidate value, used as its selection name.
///
/// Returns `None` for sequences, mappings and tagged values.
pub fn scalar_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_keeps_insertion_order() {
        let mut style = Style::new();
        style.set("UseTab", Value::from("Never"));
        style.set("IndentWidth", Value::from(4));
        style.set("UseTab", Value::from("Always"));

        assert_eq!(style.len(), 2);
        assert_eq!(style.to_json().unwrap(), r#"{"UseTab":"Always","IndentWidth":4}"#);
    }

    #[test]
    fn test_with_overrides_leaves_base_untouched() {
        let mut base = Style::new();
        base.set("ColumnLimit", Value::from(80));

        let mut overrides = Style::new();
        overrides.set("ColumnLimit", Value::from(100));
        overrides.set("BreakBeforeBraces", Value::from("Allman"));

        let merged = base.with_overrides(&overrides);
        assert_eq!(merged.get("ColumnLimit"), Some(&Value::from(100)));
        assert!(merged.contains_key("BreakBeforeBraces"));
        assert_eq!(base.get("ColumnLimit"), Some(&Value::from(80)));
        assert!(!base.contains_key("BreakBeforeBraces"));
    }

    #[test]
    fn test_yaml_output() {
        let mut style = Style::new();
        style.set("UseTab", Value::from("Never"));
        style.set("SortIncludes", Value::from(false));

        let yaml = style.to_yaml().unwrap();
        assert!(yaml.contains("UseTab: Never"));
        assert!(yaml.contains("SortIncludes: false"));
    }

    #[test]
    fn test_scalar_label() {
        assert_eq!(scalar_label(&Value::from("Never")), Some("Never".into()));
        assert_eq!(scalar_label(&Value::from(120)), Some("120".into()));
        assert_eq!(scalar_label(&Value::from(true)), Some("true".into()));
        assert_eq!(scalar_label(&Value::Sequence(vec![])), None);
    }
}
