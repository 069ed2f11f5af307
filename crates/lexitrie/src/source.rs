//! Dictionary sources.
//!
//! A [`SourceReader`] turns one language-pair directory into lemma records.
//! The build only relies on this interface; [`XmlSourceReader`] is the
//! reader shipped with the crate.

mod xml;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SubsecRound, Utc};

use crate::error::{LexitrieError, Result};

pub use xml::{read_meta_file, XmlSourceReader};

/// Name of the optional metadata file inside a source directory.
pub const META_FILENAME: &str = "meta.xml";

/// One extracted (lemma, part of speech, translation) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LemmaRecord {
    /// `None` when the reader could not extract a lemma.
    pub lemma: Option<String>,
    pub pos: Option<String>,
    pub translation: String,
}

impl LemmaRecord {
    pub fn new(
        lemma: impl Into<String>,
        pos: Option<&str>,
        translation: impl Into<String>,
    ) -> Self {
        Self {
            lemma: Some(lemma.into()),
            pos: pos.map(str::to_string),
            translation: translation.into(),
        }
    }
}

/// Descriptive metadata published alongside a dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DictMeta {
    pub public: Option<bool>,
    /// Description text keyed by the language it is written in.
    pub descriptions: BTreeMap<String, String>,
}

/// Everything a reader extracts from one language-pair directory.
#[derive(Debug, Clone)]
pub struct SourceData {
    pub last_modified: DateTime<Utc>,
    pub meta: Option<DictMeta>,
    pub records: Vec<LemmaRecord>,
}

/// External collaborator that understands the dictionary file format.
///
/// Implementations are shared between worker threads.
pub trait SourceReader: Send + Sync {
    /// Most recent modification time among the source files, at second
    /// precision. The metadata file does not count.
    fn last_modified(&self, dir: &Path) -> Result<DateTime<Utc>>;

    /// Reads every entry of the directory. Malformed single entries are
    /// dropped by the reader; a file that cannot be read fails the call.
    fn read(&self, dir: &Path) -> Result<SourceData>;
}

/// Returns the directory that holds the source files of a task directory:
/// `<dir>/src` when present, `dir` otherwise.
pub fn source_files_dir(dir: &Path) -> PathBuf {
    let nested = dir.join("src");
    if nested.is_dir() {
        nested
    } else {
        dir.to_path_buf()
    }
}

/// Lists the `*.xml` dictionary files of `dir` in filename order, leaving
/// out the metadata file.
pub fn list_source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|error| {
        log::debug!("cannot list source directory {}: {error}", dir.display());
        LexitrieError::SourceUnavailable(dir.to_path_buf())
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_xml = path.extension().is_some_and(|ext| ext == "xml");
        let is_meta = path.file_name().is_some_and(|name| name == META_FILENAME);
        if is_xml && !is_meta && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Maximum modification time over `files`, truncated to whole seconds.
///
/// An empty list means there is nothing to build from.
pub fn latest_modification(dir: &Path, files: &[PathBuf]) -> Result<DateTime<Utc>> {
    let mut latest: Option<DateTime<Utc>> = None;
    for file in files {
        let modified: DateTime<Utc> = fs::metadata(file)?.modified()?.into();
        let modified = modified.trunc_subsecs(0);
        latest = Some(latest.map_or(modified, |current| current.max(modified)));
    }
    latest.ok_or_else(|| LexitrieError::SourceUnavailable(dir.to_path_buf()))
}
