use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::thread::available_parallelism;

use crate::error::{LexitrieError, Result};
use crate::lang::LangPair;

pub const DEFAULT_SOURCE_ROOT: &str = "dictionaries";
pub const DEFAULT_OUTPUT_DIR: &str = "static/tries";
pub const DEFAULT_CATALOG_PATH: &str = "src/lib/dict_metas.js";

/// Share of the available parallelism used when `jobs` is not set.
pub const DEFAULT_JOBS_PERCENT: usize = 75;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Directory holding one sub-directory per language pair.
    pub source_root: PathBuf,
    /// Directory the compressed tries are written to.
    pub output_dir: PathBuf,
    pub catalog_path: PathBuf,
    /// Worker pool size. `None` picks [`default_jobs`].
    pub jobs: Option<usize>,
    /// Restrict the run to these pairs. `None` builds every discovered pair.
    pub pairs: Option<Vec<LangPair>>,
    /// Rebuild every pair regardless of timestamps.
    pub force: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from(DEFAULT_SOURCE_ROOT),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            jobs: None,
            pairs: None,
            force: false,
        }
    }
}

impl BuildConfig {
    pub fn effective_jobs(&self) -> usize {
        self.jobs.unwrap_or_else(default_jobs).max(1)
    }

    pub fn wants(&self, pair: &LangPair) -> bool {
        self.pairs
            .as_ref()
            .map_or(true, |pairs| pairs.contains(pair))
    }
}

/// 75% of the available parallelism, at least one worker. Tasks are mostly
/// I/O and parsing bound, so the host keeps some headroom.
pub fn default_jobs() -> usize {
    let available = available_parallelism().map(|n| n.get()).unwrap_or(4);
    (available * DEFAULT_JOBS_PERCENT / 100).max(1)
}

/// Loads a JSON config file. Missing fields take their defaults.
pub fn load_build_config(path: &Path) -> Result<BuildConfig> {
    let data = std::fs::read_to_string(path).map_err(|error| {
        LexitrieError::InvalidInput(format!(
            "failed to read build config {}: {error}",
            path.display()
        ))
    })?;
    let config: BuildConfig = serde_json::from_str(&data).map_err(|error| {
        LexitrieError::InvalidInput(format!(
            "failed to parse build config {}: {error}",
            path.display()
        ))
    })?;
    if config.jobs == Some(0) {
        return Err(LexitrieError::InvalidInput(format!(
            "build config {}: jobs must be at least 1",
            path.display()
        )));
    }
    Ok(config)
}
