//! Localization fallback for language-suffixed record fields.
//!
//! Editors translate a field by adding a sibling with a language suffix:
//! `title_en`, `title_fr`, ... . On read, a record that lacks a plain
//! `title` gets one materialized from those siblings. The stored record is
//! never touched; resolution happens on a copy for every request.

use serde_json::Value;

use crate::record::{is_truthy, Record};

pub const DEFAULT_LANGUAGES: [&str; 4] = ["en", "fr", "es", "nl"];
pub const DEFAULT_FALLBACK_LANGUAGE: &str = "en";

/// Resolves plain fields from `<base>_<lang>` siblings.
#[derive(Debug, Clone)]
pub struct Localizer {
    languages: Vec<String>,
    fallback: String,
}

impl Default for Localizer {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGES, DEFAULT_FALLBACK_LANGUAGE)
    }
}

impl Localizer {
    pub fn new<I, S>(languages: I, fallback: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            languages: languages.into_iter().map(Into::into).collect(),
            fallback: fallback.into(),
        }
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn supports(&self, lang: &str) -> bool {
        self.languages.iter().any(|l| l == lang)
    }

    /// Returns `base` when `key` is `<base>_<lang>` for a supported `lang`.
    pub fn base_of<'a>(&self, key: &'a str) -> Option<&'a str> {
        let (base, lang) = key.rsplit_once('_')?;
        if base.is_empty() || !self.supports(lang) {
            return None;
        }
        Some(base)
    }

    /// Returns a copy of `record` with plain fields filled in for `lang`.
    ///
    /// For every localized key, in record order, a plain `base` that is
    /// missing or falsy is set to the first truthy of `base_<lang>`,
    /// `base_<fallback>`, or else the localized key's own value. Truthy
    /// plain values are left alone. Localized siblings are kept.
    pub fn localize(&self, record: &Record, lang: &str) -> Record {
        let mut resolved = record.clone();
        for (key, value) in record {
            let Some(base) = self.base_of(key) else {
                continue;
            };
            if resolved.get(base).is_some_and(is_truthy) {
                continue;
            }
            let requested = format!("{base}_{lang}");
            let fallback = format!("{base}_{}", self.fallback);
            let value = [requested, fallback]
                .iter()
                .find_map(|k| record.get(k).filter(|v| is_truthy(v)))
                .unwrap_or(value)
                .clone();
            resolved.insert(base.to_string(), value);
        }
        resolved
    }

    pub fn localize_all(&self, records: &[Record], lang: &str) -> Vec<Record> {
        records.iter().map(|r| self.localize(r, lang)).collect()
    }

    /// Localize a JSON value holding a record or a list of records.
    ///
    /// Anything that is not an object is returned unchanged.
    pub fn localize_value(&self, value: &Value, lang: &str) -> Value {
        match value {
            Value::Object(record) => Value::Object(self.localize(record, lang)),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| match item {
                        Value::Object(record) => Value::Object(self.localize(record, lang)),
                        other => other.clone(),
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}
