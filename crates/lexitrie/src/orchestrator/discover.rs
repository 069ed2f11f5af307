//! Finds the language-pair directories under the source root.

use std::fs;
use std::path::Path;

use super::task::BuildTask;
use crate::error::{LexitrieError, Result};
use crate::lang::LangPair;

/// Lists one task per recognised `<lang1>-<lang2>` or `dict-<lang1>-<lang2>`
/// directory, sorted by pair. Other entries are ignored.
pub fn discover_tasks(source_root: &Path) -> Result<Vec<BuildTask>> {
    let entries = fs::read_dir(source_root).map_err(|error| {
        LexitrieError::InvalidInput(format!(
            "cannot read source root {}: {error}",
            source_root.display()
        ))
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();

    let mut tasks: Vec<BuildTask> = Vec::new();
    for dir in dirs {
        let Some(name) = dir.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let Some(pair) = LangPair::from_dir_name(name) else {
            log::debug!("ignoring {}: not a language pair directory", dir.display());
            continue;
        };
        if let Some(existing) = tasks.iter().find(|task| task.pair == pair) {
            log::warn!(
                "ignoring {}: {pair} is already provided by {}",
                dir.display(),
                existing.dir.display()
            );
            continue;
        }
        tasks.push(BuildTask::new(pair, dir));
    }

    tasks.sort_by(|a, b| a.pair.cmp(&b.pair));
    Ok(tasks)
}
