//! Option list: which clang-format keys to try, and with which candidates
//!
//! The list is a YAML sequence of single-entry mappings, searched top to bottom:
//!
//! ```yaml
//! - UseTab: [Never, Always]
//! - ColumnLimit: [80, 100, 120]
//! - BreakBeforeBraces:
//!     - Attach
//!     - Allman
//!     - Custom: {BreakBeforeBraces: Custom, BraceWrapping: {AfterFunction: true}}
//! ```
//!
//! A scalar candidate sets the option key to that value. A single-entry mapping
//! is an alias: its key names the candidate and its value is the set of
//! overrides applied when trying it.

use super::error::OptionsError;
use crate::cache::is_reserved_slot_name;
use crate::style::{Style, scalar_label};
use serde_yaml::Value;
use std::collections::HashSet;
use std::path::Path;

/// One value (or aliased override set) to try for an option
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    /// Bare value: `key: value`
    Value { name: String, value: Value },
    /// Named override set
    Alias { name: String, overrides: Style },
}

impl Candidate {
    /// Bare-value candidate, named after its scalar text
    pub fn value(value: impl Into<Value>) -> Result<Self, String> {
        let value = value.into();
        let name = scalar_label(&value)
            .ok_or_else(|| format!("candidate value must be a scalar, got {:?}", value))?;
        Ok(Self::Value { name, value })
    }

    /// Aliased candidate with explicit overrides
    pub fn alias(name: impl Into<String>, overrides: Style) -> Self {
        Self::Alias {
            name: name.into(),
            overrides,
        }
    }

    /// Selection name; also the cache slot name
    pub fn name(&self) -> &str {
        match self {
            Self::Value { name, .. } | Self::Alias { name, .. } => name,
        }
    }

    /// Overrides this candidate applies when tried for `key`
    pub fn overrides(&self, key: &str) -> Style {
        match self {
            Self::Value { value, .. } => {
                let mut style = Style::new();
                style.set(key, value.clone());
                style
            }
            Self::Alias { overrides, .. } => overrides.clone(),
        }
    }

    fn from_yaml(option: &str, raw: &Value) -> Result<Self, OptionsError> {
        let invalid = |message: String| OptionsError::InvalidCandidate {
            option: option.to_string(),
            message,
        };

        match raw {
            Value::Mapping(map) => {
                if map.len() != 1 {
                    return Err(invalid(format!(
                        "alias candidates need exactly one entry, found {}",
                        map.len()
                    )));
                }
                let Some((alias, overrides)) = map.iter().next() else {
                    return Err(invalid("empty alias candidate".into()));
                };
                let name = scalar_label(alias)
                    .ok_or_else(|| invalid("alias name must be a scalar".into()))?;
                match overrides {
                    Value::Mapping(overrides) => {
                        Ok(Self::alias(name, Style::from(overrides.clone())))
                    }
                    other => Err(invalid(format!(
                        "overrides for alias '{}' must be a mapping, got {:?}",
                        name, other
                    ))),
                }
            }
            other => Self::value(other.clone()).map_err(invalid),
        }
    }
}

/// An option key and the ordered candidates to try for it
#[derive(Debug, Clone, PartialEq)]
pub struct OptionEntry {
    pub key: String,
    pub candidates: Vec<Candidate>,
}

impl OptionEntry {
    pub fn new(key: impl Into<String>, candidates: Vec<Candidate>) -> Self {
        Self {
            key: key.into(),
            candidates,
        }
    }

    /// Check that candidates exist and that their names are usable and unique
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.candidates.is_empty() {
            return Err(OptionsError::NoCandidates {
                option: self.key.clone(),
            });
        }

        let mut seen = HashSet::new();
        for candidate in &self.candidates {
            let name = candidate.name();
            if name.is_empty()
                || name == "."
                || name == ".."
                || name.contains(['/', '\\'])
                || is_reserved_slot_name(name)
            {
                return Err(OptionsError::InvalidCandidate {
                    option: self.key.clone(),
                    message: format!("'{}' cannot be used as a candidate name", name),
                });
            }
            if !seen.insert(name) {
                return Err(OptionsError::DuplicateCandidate {
                    option: self.key.clone(),
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn candidate_names(&self) -> Vec<&str> {
        self.candidates.iter().map(Candidate::name).collect()
    }
}

/// Load and validate an option list file
pub fn load_options(path: &Path) -> Result<Vec<OptionEntry>, OptionsError> {
    let contents = std::fs::read_to_string(path).map_err(|source| OptionsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: Vec<Value> = serde_yaml::from_str(&contents).map_err(|source| OptionsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    parse_entries(&raw)
}

fn parse_entries(raw: &[Value]) -> Result<Vec<OptionEntry>, OptionsError> {
    let mut entries = Vec::with_capacity(raw.len());

    for (index, item) in raw.iter().enumerate() {
        let malformed = |message: &str| OptionsError::MalformedEntry {
            index,
            message: message.to_string(),
        };

        let map = item
            .as_mapping()
            .ok_or_else(|| malformed("expected a mapping of option key to candidates"))?;
        if map.len() != 1 {
            return Err(malformed("expected exactly one option key"));
        }
        let Some((key, values)) = map.iter().next() else {
            return Err(malformed("expected exactly one option key"));
        };
        let key = key
            .as_str()
            .ok_or_else(|| malformed("option key must be a string"))?;
        let values = values
            .as_sequence()
            .ok_or_else(|| malformed("candidates must be a list"))?;

        let candidates = values
            .iter()
            .map(|v| Candidate::from_yaml(key, v))
            .collect::<Result<Vec<_>, _>>()?;

        let entry = OptionEntry::new(key, candidates);
        entry.validate()?;
        entries.push(entry);
    }

    Ok(entries)
}
