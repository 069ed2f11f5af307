//! Builds the compressed trie artifact for one language pair.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::catalog::ResultDescriptor;
use crate::error::{LexitrieError, Result};
use crate::lang::LangPair;
use crate::source::{LemmaRecord, SourceData};
use crate::trie::PrefixTrie;

/// One (part of speech, translation) pair in a lemma's payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sense {
    pub pos: Option<String>,
    #[serde(rename = "t")]
    pub translation: String,
}

/// The trie type stored in artifacts.
pub type LemmaTrie = PrefixTrie<Vec<Sense>>;

/// Serialized, compressed and hashed trie for one language pair.
#[derive(Debug, Clone)]
pub struct BuiltIndex {
    pub lemma_count: usize,
    pub uncompressed_size: u64,
    pub content_hash: String,
    pub compressed: Vec<u8>,
}

/// Groups records by lemma, keeping record order within each lemma.
/// Records without a lemma are dropped.
pub fn group_records(records: Vec<LemmaRecord>) -> BTreeMap<String, Vec<Sense>> {
    let mut grouped: BTreeMap<String, Vec<Sense>> = BTreeMap::new();
    for record in records {
        let Some(lemma) = record.lemma else {
            continue;
        };
        grouped.entry(lemma).or_default().push(Sense {
            pos: record.pos,
            translation: record.translation,
        });
    }
    grouped
}

/// Builds a trie from already grouped lemmas, one insert per lemma.
pub fn build_trie(grouped: BTreeMap<String, Vec<Sense>>) -> LemmaTrie {
    let mut trie = PrefixTrie::new();
    for (lemma, senses) in grouped {
        trie.insert(&lemma, senses);
    }
    trie
}

/// Groups, serializes, compresses and hashes the records.
///
/// Returns `Ok(None)` when no lemma survives grouping; callers treat that as
/// a skip.
pub fn build_index(records: Vec<LemmaRecord>) -> Result<Option<BuiltIndex>> {
    let grouped = group_records(records);
    if grouped.is_empty() {
        return Ok(None);
    }

    let trie = build_trie(grouped);
    let serialized = trie.serialize()?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&serialized)?;
    let compressed = encoder.finish()?;

    Ok(Some(BuiltIndex {
        lemma_count: trie.len(),
        uncompressed_size: serialized.len() as u64,
        content_hash: hex::encode(Sha1::digest(&serialized)),
        compressed,
    }))
}

/// Writes artifacts for language pairs into one output directory.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    output_dir: PathBuf,
}

impl IndexBuilder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Builds and writes the artifact for `pair`.
    ///
    /// Returns `Ok(None)` without touching the output directory when the
    /// source has no usable lemmas.
    pub fn build(&self, pair: &LangPair, source: SourceData) -> Result<Option<ResultDescriptor>> {
        let SourceData {
            last_modified,
            meta,
            records,
        } = source;

        let Some(index) = build_index(records)? else {
            return Ok(None);
        };

        let filename = pair.artifact_filename();
        write_file_atomic(&self.output_dir.join(&filename), &index.compressed)?;

        let meta = meta.unwrap_or_default();
        Ok(Some(ResultDescriptor {
            lemma_count: index.lemma_count,
            uncompressed_size: index.uncompressed_size,
            compressed_size: index.compressed.len() as u64,
            artifact_filename: filename,
            content_hash: index.content_hash,
            source_last_modified: last_modified,
            lang1: pair.lang1.clone(),
            lang2: pair.lang2.clone(),
            public: meta.public,
            descriptions: meta.descriptions,
        }))
    }
}

/// Writes `bytes` to `path` through a temp file and rename.
pub(crate) fn write_file_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| {
            LexitrieError::Internal(format!(
                "failed to create output directory {}: {error}",
                parent.display()
            ))
        })?;
    }

    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path).map_err(|error| {
            LexitrieError::Internal(format!(
                "failed to create {}: {error}",
                tmp_path.display()
            ))
        })?;
        let mut output = BufWriter::new(file);
        output.write_all(bytes)?;
        output.flush()?;
    }

    fs::rename(&tmp_path, path).map_err(|error| {
        LexitrieError::Internal(format!(
            "failed to finalize {}: {error}",
            path.display()
        ))
    })?;

    log::debug!("wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Decompresses and decodes an artifact written by [`IndexBuilder::build`].
pub fn load_artifact(path: &Path) -> Result<LemmaTrie> {
    use std::io::Read;

    let file = File::open(path).map_err(|error| {
        LexitrieError::InvalidInput(format!("cannot open {}: {error}", path.display()))
    })?;
    let mut decoder = flate2::read::GzDecoder::new(file);
    let mut bytes = Vec::new();
    decoder.read_to_end(&mut bytes)?;
    PrefixTrie::deserialize(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DictMeta;
    use crate::trie::Lookup;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn records() -> Vec<LemmaRecord> {
        vec![
            LemmaRecord::new("guolli", Some("N"), "fisk"),
            LemmaRecord::new("guolástit", Some("V"), "fiske"),
            LemmaRecord::new("guolli", Some("Adj"), "fiskete"),
            LemmaRecord {
                lemma: None,
                pos: Some("N".to_string()),
                translation: "orphan".to_string(),
            },
        ]
    }

    #[test]
    fn groups_senses_by_lemma_in_record_order() {
        let grouped = group_records(records());
        assert_eq!(grouped.len(), 2);
        assert_eq!(
            grouped["guolli"],
            vec![
                Sense {
                    pos: Some("N".into()),
                    translation: "fisk".into()
                },
                Sense {
                    pos: Some("Adj".into()),
                    translation: "fiskete".into()
                },
            ]
        );
    }

    #[test]
    fn build_index_counts_and_hashes_uncompressed_bytes() {
        let index = build_index(records()).expect("build").expect("non-empty");
        assert_eq!(index.lemma_count, 2);

        let trie = build_trie(group_records(records()));
        let serialized = trie.serialize().expect("serialize");
        assert_eq!(index.uncompressed_size, serialized.len() as u64);
        assert_eq!(index.content_hash, hex::encode(Sha1::digest(&serialized)));
        assert_eq!(index.content_hash.len(), 40);
    }

    #[test]
    fn build_index_is_independent_of_lemma_order() {
        let mut reversed = records();
        reversed.reverse();
        // Senses of one lemma keep their relative order.
        reversed.swap(1, 3);
        let a = build_index(records()).expect("a").expect("a");
        let b = build_index(reversed).expect("b").expect("b");
        assert_eq!(a.content_hash, b.content_hash);
        assert_eq!(a.compressed, b.compressed);
    }

    #[test]
    fn empty_or_lemma_less_input_produces_no_index() {
        assert!(build_index(Vec::new()).expect("empty").is_none());
        let lemma_less = vec![LemmaRecord {
            lemma: None,
            pos: None,
            translation: "x".into(),
        }];
        assert!(build_index(lemma_less).expect("lemma-less").is_none());
    }

    #[test]
    fn build_writes_artifact_and_descriptor() {
        let dir = tempdir().expect("tempdir");
        let output = dir.path().join("tries");
        let builder = IndexBuilder::new(&output);
        let pair = LangPair::new("sme", "nob").expect("pair");
        let last_modified = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let mut meta = DictMeta {
            public: Some(true),
            ..DictMeta::default()
        };
        meta.descriptions.insert("eng".into(), "North Sámi - Norwegian".into());

        let descriptor = builder
            .build(
                &pair,
                SourceData {
                    last_modified,
                    meta: Some(meta),
                    records: records(),
                },
            )
            .expect("build")
            .expect("descriptor");

        assert_eq!(descriptor.artifact_filename, "sme-nob.json.gz");
        assert_eq!(descriptor.lemma_count, 2);
        assert_eq!(descriptor.source_last_modified, last_modified);
        assert_eq!(descriptor.public, Some(true));

        let path = output.join("sme-nob.json.gz");
        let on_disk = fs::metadata(&path).expect("artifact").len();
        assert_eq!(on_disk, descriptor.compressed_size);
        assert!(!output.join("sme-nob.json.tmp").exists());

        let trie = load_artifact(&path).expect("load");
        let senses = trie.find_exact("guolli").found().expect("guolli");
        assert_eq!(senses.len(), 2);
        assert_eq!(trie.find_exact("guol"), Lookup::Prefix);
    }

    #[test]
    fn empty_source_leaves_output_untouched() {
        let dir = tempdir().expect("tempdir");
        let output = dir.path().join("tries");
        let builder = IndexBuilder::new(&output);
        let pair = LangPair::new("eng", "fin").expect("pair");

        let result = builder
            .build(
                &pair,
                SourceData {
                    last_modified: Utc::now(),
                    meta: None,
                    records: Vec::new(),
                },
            )
            .expect("build");
        assert!(result.is_none());
        assert!(!output.exists());
    }
}
