//! Plugin identifiers.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PluginError;

lazy_static! {
    /// Criteria a plugin id must comply with: lowercase alphanumeric
    /// characters, underscores, and hyphens.
    pub static ref IDENTIFIER_PATTERN: Regex =
        Regex::new("^[a-z0-9_-]+$").expect("identifier pattern is valid");
}

/// A validated plugin identifier.
///
/// Identity is case-insensitive: ids derived from component titles are
/// lowercased before validation. The original title is preserved separately
/// for rules-store lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PluginId(String);

impl PluginId {
    /// Validates a raw id against the identifier pattern.
    pub fn parse(raw: &str) -> Result<Self, PluginError> {
        if !IDENTIFIER_PATTERN.is_match(raw) {
            return Err(PluginError::InvalidIdentifier(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Normalizes a component title into a plugin id: trims whitespace,
    /// lowercases, then validates.
    pub fn from_title(title: &str) -> Result<Self, PluginError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(PluginError::MissingTitle);
        }
        Self::parse(&title.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PluginId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PluginId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PluginId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).map_err(|e| e.to_string())
    }
}

impl From<PluginId> for String {
    fn from(id: PluginId) -> Self {
        id.0
    }
}
