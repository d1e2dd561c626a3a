//! String properties and `${...}` placeholder resolution.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Variable that switches on `${key:default}` handling.
pub const ENABLE_DEFAULT_VALUE: &str = "sqlsession.parsing.enable-default-value";

/// Variable that overrides the separator used by `${key:default}`.
pub const DEFAULT_VALUE_SEPARATOR: &str = "sqlsession.parsing.default-value-separator";

const DEFAULT_SEPARATOR: &str = ":";

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\$\{([^}]*)\}").expect("placeholder pattern is valid"))
}

/// An ordered set of string key/value pairs.
///
/// Used both for the variables declared in a configuration document and for
/// the overrides a caller passes at build time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    /// Create an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, returning the previous value if any.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Builder-style variant of [`Properties::set`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copy every entry of `other` into `self`. Entries from `other` win.
    pub fn extend_from(&mut self, other: &Properties) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    /// Replace every `${key}` in `text` with the matching property.
    ///
    /// Placeholders without a matching property are left as written. When
    /// [`ENABLE_DEFAULT_VALUE`] is `"true"`, `${key:fallback}` resolves to
    /// `fallback` for a missing key.
    pub fn resolve(&self, text: &str) -> String {
        if !text.contains("${") {
            return text.to_string();
        }

        let defaults_enabled = self
            .get(ENABLE_DEFAULT_VALUE)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        let separator = self
            .get(DEFAULT_VALUE_SEPARATOR)
            .unwrap_or(DEFAULT_SEPARATOR);

        placeholder_regex()
            .replace_all(text, |caps: &Captures<'_>| {
                let whole = &caps[0];
                let key = &caps[1];

                if defaults_enabled && !separator.is_empty() {
                    if let Some((name, fallback)) = key.split_once(separator) {
                        return self.get(name).unwrap_or(fallback).to_string();
                    }
                }

                match self.get(key) {
                    Some(value) => value.to_string(),
                    None => {
                        tracing::trace!(placeholder = whole, "Leaving unresolved placeholder");
                        whole.to_string()
                    }
                }
            })
            .into_owned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, String>> for Properties {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<BTreeMap<String, String>> for Properties {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }
}
