//! The persisted catalog of built dictionaries.
//!
//! On disk the catalog is a JavaScript module: [`CATALOG_PREFIX`] followed by
//! a compact JSON array of [`ResultDescriptor`]s. The site imports it
//! directly, and the build reads it back by stripping the prefix.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::builder::write_file_atomic;
use crate::error::{LexitrieError, Result};
use crate::lang::LangPair;

/// Text written in front of the JSON array.
pub const CATALOG_PREFIX: &str = "export default ";

/// Metadata of one successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultDescriptor {
    #[serde(rename = "n")]
    pub lemma_count: usize,
    #[serde(rename = "s")]
    pub uncompressed_size: u64,
    #[serde(rename = "cs")]
    pub compressed_size: u64,
    #[serde(rename = "f")]
    pub artifact_filename: String,
    /// SHA-1 of the uncompressed artifact, lowercase hex.
    #[serde(rename = "h")]
    pub content_hash: String,
    #[serde(rename = "date", with = "iso_seconds")]
    pub source_last_modified: DateTime<Utc>,
    #[serde(rename = "l1")]
    pub lang1: String,
    #[serde(rename = "l2")]
    pub lang2: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    #[serde(rename = "desc", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub descriptions: BTreeMap<String, String>,
}

impl ResultDescriptor {
    pub fn matches(&self, lang1: &str, lang2: &str) -> bool {
        self.lang1 == lang1 && self.lang2 == lang2
    }
}

mod iso_seconds {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let value = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&value)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Ordered list of descriptors, at most one per language pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildCatalog {
    entries: Vec<ResultDescriptor>,
}

impl BuildCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ResultDescriptor] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, pair: &LangPair) -> Option<&ResultDescriptor> {
        self.entries
            .iter()
            .find(|entry| entry.matches(&pair.lang1, &pair.lang2))
    }

    /// Dictionaries from `from` to `to`; `None` matches any language.
    pub fn find<'a>(
        &'a self,
        from: Option<&'a str>,
        to: Option<&'a str>,
    ) -> impl Iterator<Item = &'a ResultDescriptor> + 'a {
        self.entries.iter().filter(move |entry| {
            from.map_or(true, |lang| entry.lang1 == lang)
                && to.map_or(true, |lang| entry.lang2 == lang)
        })
    }

    /// Sum of lemma counts over dictionaries whose source language is `lang`.
    pub fn total_lemmas(&self, lang: &str) -> usize {
        self.find(Some(lang), None).map(|entry| entry.lemma_count).sum()
    }

    /// Upserts `candidate` by (lang1, lang2). `None` is a no-op.
    pub fn merge(&mut self, candidate: Option<ResultDescriptor>) {
        let Some(candidate) = candidate else {
            return;
        };
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.matches(&candidate.lang1, &candidate.lang2))
        {
            Some(existing) => *existing = candidate,
            None => self.entries.push(candidate),
        }
    }

    /// Parses catalog text. The prefix must match exactly.
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let corrupt = |reason: String| LexitrieError::CatalogCorrupt {
            path: path.to_path_buf(),
            reason,
        };
        let json = text
            .strip_prefix(CATALOG_PREFIX)
            .ok_or_else(|| corrupt(format!("missing {CATALOG_PREFIX:?} prefix")))?;
        let entries: Vec<ResultDescriptor> =
            serde_json::from_str(json).map_err(|error| corrupt(error.to_string()))?;

        let mut catalog = Self::new();
        for entry in entries {
            catalog.merge(Some(entry));
        }
        Ok(catalog)
    }

    /// Loads the catalog at `path`. A missing file is an empty catalog; an
    /// unreadable or unparsable one is [`LexitrieError::CatalogCorrupt`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                log::info!("no catalog at {}, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(error) => {
                return Err(LexitrieError::CatalogCorrupt {
                    path: path.to_path_buf(),
                    reason: error.to_string(),
                })
            }
        };
        let catalog = Self::parse(path, &text)?;
        log::debug!("loaded {} catalog entries from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Renders the catalog text, entries sorted by language pair.
    pub fn render(&self) -> Result<String> {
        let mut entries: Vec<&ResultDescriptor> = self.entries.iter().collect();
        entries.sort_by(|a, b| (&a.lang1, &a.lang2).cmp(&(&b.lang1, &b.lang2)));
        let json = serde_json::to_string(&entries)?;
        Ok(format!("{CATALOG_PREFIX}{json}"))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_file_atomic(path, self.render()?.as_bytes())?;
        log::info!("wrote {} catalog entries to {}", self.len(), path.display());
        Ok(())
    }
}
