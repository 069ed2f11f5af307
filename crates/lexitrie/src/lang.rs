//! Recognised language codes and language pairs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LexitrieError, Result};

/// ISO 639-3 codes that gate which source directories become build tasks.
pub const VALID_LANGUAGES: &[&str] = &[
    "chp", "chr", "deu", "eng", "est", "fin", "fit", "fkv", "hdn", "hun", "izh", "koi", "kom",
    "kpv", "lav", "liv", "mdf", "mhr", "mns", "mrj", "myv", "nob", "olo", "otw", "ron", "rus",
    "sjd", "sje", "sjt", "sma", "sme", "smj", "smn", "sms", "som", "srs", "swe", "udm", "vot",
    "vro", "yrk",
];

pub fn is_valid_language(code: &str) -> bool {
    VALID_LANGUAGES.binary_search(&code).is_ok()
}

/// A directed dictionary pair, e.g. `sme-nob`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LangPair {
    pub lang1: String,
    pub lang2: String,
}

impl LangPair {
    /// Creates a pair after checking both codes against [`VALID_LANGUAGES`].
    pub fn new(lang1: &str, lang2: &str) -> Result<Self> {
        for code in [lang1, lang2] {
            if !is_valid_language(code) {
                return Err(LexitrieError::InvalidInput(format!(
                    "unknown language code: {code}"
                )));
            }
        }
        if lang1 == lang2 {
            return Err(LexitrieError::InvalidInput(format!(
                "language pair needs two different languages: {lang1}-{lang2}"
            )));
        }
        Ok(Self {
            lang1: lang1.to_string(),
            lang2: lang2.to_string(),
        })
    }

    /// Parses a source directory name: `eng-fin` or `dict-eng-fin`.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix("dict-").unwrap_or(name);
        name.parse().ok()
    }

    /// Filename of the compressed trie artifact for this pair.
    pub fn artifact_filename(&self) -> String {
        format!("{}-{}.json.gz", self.lang1, self.lang2)
    }
}

impl FromStr for LangPair {
    type Err = LexitrieError;

    fn from_str(value: &str) -> Result<Self> {
        match value.split_once('-') {
            Some((lang1, lang2)) => Self::new(lang1, lang2),
            None => Err(LexitrieError::InvalidInput(format!(
                "expected a language pair like eng-fin, got {value:?}"
            ))),
        }
    }
}

impl TryFrom<String> for LangPair {
    type Error = LexitrieError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<LangPair> for String {
    fn from(pair: LangPair) -> Self {
        pair.to_string()
    }
}

impl fmt::Display for LangPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.lang1, self.lang2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_table_is_sorted() {
        let mut sorted = VALID_LANGUAGES.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, VALID_LANGUAGES);
    }

    #[test]
    fn parses_pairs_and_directory_names() {
        let pair: LangPair = "sme-nob".parse().expect("pair");
        assert_eq!(pair.lang1, "sme");
        assert_eq!(pair.lang2, "nob");
        assert_eq!(pair.to_string(), "sme-nob");
        assert_eq!(pair.artifact_filename(), "sme-nob.json.gz");

        assert_eq!(LangPair::from_dir_name("dict-eng-fin"), LangPair::new("eng", "fin").ok());
        assert_eq!(LangPair::from_dir_name("eng-fin"), LangPair::new("eng", "fin").ok());
    }

    #[test]
    fn rejects_unknown_or_repeated_codes() {
        assert!("xxx-eng".parse::<LangPair>().is_err());
        assert!("eng-eng".parse::<LangPair>().is_err());
        assert!("engfin".parse::<LangPair>().is_err());
        assert_eq!(LangPair::from_dir_name("dict-sme-nob-old"), None);
        assert_eq!(LangPair::from_dir_name("README"), None);
    }
}
