//! Reader for the XML dictionary source format.
//!
//! ```text
//! <r>
//!   <e>
//!     <lg><l pos="N">guolli</l></lg>
//!     <mg><tg><t pos="N">fisk</t></tg></mg>
//!   </e>
//! </r>
//! ```
//!
//! Each `<e>` becomes one record: the text of its single `<lg>/<l>` is the
//! lemma, the `pos` attribute of that `<l>` is the part of speech, and the
//! texts of all `<mg>/<tg>/<t>` are joined with `", "`.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{
    latest_modification, list_source_files, source_files_dir, DictMeta, LemmaRecord,
    SourceData, SourceReader, META_FILENAME,
};
use crate::error::{LexitrieError, Result};

/// [`SourceReader`] for directories of XML dictionary files.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlSourceReader;

impl SourceReader for XmlSourceReader {
    fn last_modified(&self, dir: &Path) -> Result<DateTime<Utc>> {
        let files_dir = source_files_dir(dir);
        let files = list_source_files(&files_dir)?;
        latest_modification(&files_dir, &files)
    }

    fn read(&self, dir: &Path) -> Result<SourceData> {
        let files_dir = source_files_dir(dir);
        let files = list_source_files(&files_dir)?;
        let last_modified = latest_modification(&files_dir, &files)?;

        let meta = match find_meta_file(dir, &files_dir) {
            Some(path) => Some(read_meta_file(&path)?),
            None => None,
        };

        let mut records = Vec::new();
        for file in &files {
            let stats = read_dictionary_file(file, &mut records)?;
            debug!(
                "read {} ({} entries, {} dropped)",
                file.display(),
                stats.entries,
                stats.dropped
            );
        }

        Ok(SourceData {
            last_modified,
            meta,
            records,
        })
    }
}

fn find_meta_file(dir: &Path, files_dir: &Path) -> Option<PathBuf> {
    [files_dir.join(META_FILENAME), dir.join(META_FILENAME)]
        .into_iter()
        .find(|path| path.is_file())
}

/// Counters for one dictionary file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FileStats {
    pub entries: usize,
    pub dropped: usize,
}

/// Appends the records of one XML file to `records`.
///
/// Malformed entries are dropped with a warning; malformed XML fails the
/// whole file.
pub fn read_dictionary_file(path: &Path, records: &mut Vec<LemmaRecord>) -> Result<FileStats> {
    let file = File::open(path)?;
    let mut reader = Reader::from_reader(BufReader::new(file));
    let mut collector = EntryCollector::new(path, records);
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|error| {
            LexitrieError::Xml(format!(
                "{} at byte {}: {error}",
                path.display(),
                reader.buffer_position()
            ))
        })?;
        match event {
            Event::Start(start) => {
                collector.open(&start);
                collector.path.push(start.local_name().as_ref().to_vec());
            }
            Event::Empty(start) => {
                collector.open(&start);
                collector.close(start.local_name().as_ref());
            }
            Event::End(end) => {
                collector.path.pop();
                collector.close(end.local_name().as_ref());
            }
            Event::Text(text) => match text.unescape() {
                Ok(value) => collector.text(&value),
                Err(error) => collector.fail(format!("bad text: {error}")),
            },
            Event::CData(data) => collector.text(&String::from_utf8_lossy(&data)),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(collector.stats)
}

enum CaptureKind {
    Lemma { pos: Option<String> },
    Translation,
}

/// Text of the captured element itself, up to its first child element.
struct Capture {
    kind: CaptureKind,
    text: String,
    /// Path length while inside the captured element.
    depth: usize,
    seen_child: bool,
}

impl Capture {
    fn new(kind: CaptureKind, depth: usize) -> Self {
        Self {
            kind,
            text: String::new(),
            depth,
            seen_child: false,
        }
    }
}

#[derive(Default)]
struct PendingEntry {
    lemmas: Vec<(String, Option<String>)>,
    translations: Vec<String>,
    error: Option<String>,
}

struct EntryCollector<'a> {
    file: &'a Path,
    records: &'a mut Vec<LemmaRecord>,
    path: Vec<Vec<u8>>,
    entry: Option<PendingEntry>,
    capture: Option<Capture>,
    stats: FileStats,
}

impl<'a> EntryCollector<'a> {
    fn new(file: &'a Path, records: &'a mut Vec<LemmaRecord>) -> Self {
        Self {
            file,
            records,
            path: Vec::new(),
            entry: None,
            capture: None,
            stats: FileStats::default(),
        }
    }

    fn parent_is(&self, names: &[&str]) -> bool {
        self.path.len() >= names.len()
            && self.path[self.path.len() - names.len()..]
                .iter()
                .zip(names)
                .all(|(have, want)| have.as_slice() == want.as_bytes())
    }

    fn open(&mut self, start: &BytesStart<'_>) {
        if let Some(capture) = self.capture.as_mut() {
            capture.seen_child = true;
            return;
        }
        let depth = self.path.len() + 1;
        match start.local_name().as_ref() {
            b"e" => {
                self.entry = Some(PendingEntry::default());
                self.stats.entries += 1;
            }
            b"l" if self.entry.is_some() && self.parent_is(&["lg"]) => {
                let pos = match attribute(start, b"pos") {
                    Ok(pos) => pos,
                    Err(error) => {
                        self.fail(error);
                        None
                    }
                };
                self.capture = Some(Capture::new(CaptureKind::Lemma { pos }, depth));
            }
            b"t" if self.entry.is_some() && self.parent_is(&["mg", "tg"]) => {
                self.capture = Some(Capture::new(CaptureKind::Translation, depth));
            }
            _ => {}
        }
    }

    fn text(&mut self, value: &str) {
        let depth = self.path.len();
        if let Some(capture) = self.capture.as_mut() {
            if capture.depth == depth && !capture.seen_child {
                capture.text.push_str(value);
            }
        }
    }

    fn fail(&mut self, reason: String) {
        if let Some(entry) = self.entry.as_mut() {
            entry.error.get_or_insert(reason);
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"l" | b"t" => {
                // Ignore ends of nested elements that share the captured name.
                if self
                    .capture
                    .as_ref()
                    .map_or(true, |capture| capture.depth != self.path.len() + 1)
                {
                    return;
                }
                let (Some(capture), Some(entry)) = (self.capture.take(), self.entry.as_mut())
                else {
                    return;
                };
                let text = capture.text.trim().to_string();
                match capture.kind {
                    CaptureKind::Lemma { pos } => entry.lemmas.push((text, pos)),
                    CaptureKind::Translation if !text.is_empty() => entry.translations.push(text),
                    CaptureKind::Translation => {}
                }
            }
            b"e" => {
                if let Some(entry) = self.entry.take() {
                    self.finish_entry(entry);
                }
            }
            _ => {}
        }
    }

    fn finish_entry(&mut self, entry: PendingEntry) {
        let index = self.stats.entries;
        let parsed = match entry.error {
            Some(reason) => Err(reason),
            None if entry.lemmas.len() != 1 => Err(format!(
                "expected exactly one <lg>/<l>, found {}",
                entry.lemmas.len()
            )),
            None => Ok(()),
        };
        if let Err(reason) = parsed {
            let error = LexitrieError::EntryParse(format!(
                "{} entry #{index}: {reason}",
                self.file.display()
            ));
            warn!("dropping entry: {error}");
            self.stats.dropped += 1;
            return;
        }
        if entry.translations.is_empty() {
            debug!("{} entry #{index} has no translations", self.file.display());
            self.stats.dropped += 1;
            return;
        }

        let (lemma, pos) = entry.lemmas.into_iter().next().unwrap_or_default();
        self.records.push(LemmaRecord {
            lemma: (!lemma.is_empty()).then_some(lemma),
            pos,
            translation: entry.translations.join(", "),
        });
    }
}

fn attribute(start: &BytesStart<'_>, key: &[u8]) -> std::result::Result<Option<String>, String> {
    for attr in start.attributes() {
        let attr = attr.map_err(|error| format!("bad attribute: {error}"))?;
        if attr.key.local_name().as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|error| format!("bad attribute value: {error}"))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Parses a metadata file:
///
/// ```text
/// <meta public="yes">
///   <description lang="eng">North Sámi - Norwegian</description>
/// </meta>
/// ```
pub fn read_meta_file(path: &Path) -> Result<DictMeta> {
    let mut reader = Reader::from_file(path)?;
    let mut buf = Vec::new();
    let mut meta = DictMeta::default();
    let mut description: Option<(String, String)> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => match start.local_name().as_ref() {
                b"meta" => meta.public = public_flag(&start)?,
                b"description" => description = Some((description_lang(&start)?, String::new())),
                _ => {}
            },
            Event::Empty(start) => match start.local_name().as_ref() {
                b"meta" => meta.public = public_flag(&start)?,
                b"description" => {
                    meta.descriptions.insert(description_lang(&start)?, String::new());
                }
                _ => {}
            },
            Event::Text(text) => {
                if let Some((_, value)) = description.as_mut() {
                    value.push_str(&text.unescape()?);
                }
            }
            Event::End(end) if end.local_name().as_ref() == b"description" => {
                if let Some((lang, value)) = description.take() {
                    meta.descriptions.insert(lang, value.trim().to_string());
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(meta)
}

fn public_flag(start: &BytesStart<'_>) -> Result<Option<bool>> {
    Ok(attribute(start, b"public")
        .map_err(LexitrieError::Xml)?
        .and_then(|value| parse_flag(&value)))
}

fn description_lang(start: &BytesStart<'_>) -> Result<String> {
    Ok(attribute(start, b"lang")
        .map_err(LexitrieError::Xml)?
        .unwrap_or_default())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => Some(true),
        "no" | "false" | "0" => Some(false),
        _ => None,
    }
}
