// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ignore patterns for the `ignoredErrors` and `ignoredUrls` options.
//!
//! Each entry is either a plain string, matched by substring containment, or a
//! regular expression written between slashes:
//!
//! ```json
//! { "ignoredErrors": ["ResizeObserver loop", "/^Script error\\.?$/"] }
//! ```
//!
//! Any entry that starts and ends with `/` and has something in between is a regex.
//! That includes path-like URL entries: `"/api/"` is the regex `api`, which matches
//! any URL containing `api`. Write `"/api"` or `"api/"` for a plain substring, or
//! escape the path as a regex (`"/\\/api\\//"`). A lone `"/"` or `"//"` has no
//! regex body and stays a plain substring.
//!
//! Invalid entries are logged and skipped so a bad pattern never prevents the
//! pipeline from starting.

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use tracing::error;

#[derive(Clone, Debug)]
pub enum IgnorePattern {
    /// Matches when the text contains the string.
    Contains(String),
    /// Matches when the regex finds a match anywhere in the text.
    Regex(regex::Regex),
}

impl IgnorePattern {
    /// Parses a configured entry. `/expr/` with a non-empty `expr` is compiled as a
    /// regex, anything else is a containment pattern.
    pub fn parse(entry: &str) -> Result<Self, regex::Error> {
        if entry.len() > 2 && entry.starts_with('/') && entry.ends_with('/') {
            let expr = &entry[1..entry.len() - 1];
            return regex::Regex::new(expr).map(IgnorePattern::Regex);
        }
        Ok(IgnorePattern::Contains(entry.to_string()))
    }

    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        match self {
            IgnorePattern::Contains(needle) => text.contains(needle.as_str()),
            IgnorePattern::Regex(regex) => regex.is_match(text),
        }
    }
}

impl PartialEq for IgnorePattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (IgnorePattern::Contains(a), IgnorePattern::Contains(b)) => a == b,
            (IgnorePattern::Regex(a), IgnorePattern::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl From<regex::Regex> for IgnorePattern {
    fn from(regex: regex::Regex) -> Self {
        IgnorePattern::Regex(regex)
    }
}

impl From<&str> for IgnorePattern {
    fn from(needle: &str) -> Self {
        IgnorePattern::Contains(needle.to_string())
    }
}

/// Compiles a list of configured entries, skipping the ones that fail.
pub fn compile_patterns<S: AsRef<str>>(entries: &[S]) -> Vec<IgnorePattern> {
    entries
        .iter()
        .filter_map(|entry| match IgnorePattern::parse(entry.as_ref()) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                error!("Failed to compile ignore pattern '{}': {}, ignoring", entry.as_ref(), e);
                None
            }
        })
        .collect()
}

/// Deserializes ignore patterns from either a JSON array of strings or a single
/// comma-separated string (the environment variable form).
pub fn deserialize_ignore_patterns<'de, D>(
    deserializer: D,
) -> Result<Option<Vec<IgnorePattern>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: JsonValue = Deserialize::deserialize(deserializer)?;

    match value {
        JsonValue::String(s) => {
            let entries: Vec<&str> = s
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .collect();
            Ok(Some(compile_patterns(&entries)))
        }
        JsonValue::Array(values) => {
            let mut entries = Vec::with_capacity(values.len());
            for v in values {
                match v {
                    JsonValue::String(s) => entries.push(s),
                    other => error!("Expected a string ignore pattern, got {:?}, ignoring", other),
                }
            }
            Ok(Some(compile_patterns(&entries)))
        }
        JsonValue::Null => Ok(None),
        other => {
            error!("Failed to parse ignore patterns: {:?}, ignoring", other);
            Ok(None)
        }
    }
}
