//! Incremental, parallel build of every language pair.
//!
//! A run:
//! 1. Loads the catalog (a corrupt catalog aborts before anything is built)
//! 2. Discovers the pair directories and attaches each pair's cached timestamp
//! 3. Dispatches the tasks to a rayon pool; workers report over a channel
//! 4. Merges outcomes as they complete; only the orchestrator touches the
//!    catalog
//! 5. Writes the catalog once, unless the run was cancelled

mod discover;
mod report;
mod task;


use std::fs;
use std::sync::Arc;
use std::time::Instant;

use crate::builder::IndexBuilder;
use crate::cancel::CancellationToken;
use crate::catalog::BuildCatalog;
use crate::config::BuildConfig;
use crate::error::{LexitrieError, Result};
use crate::source::{SourceReader, XmlSourceReader};

pub use discover::discover_tasks;
pub use report::{RunReport, TaskFailure};
pub use task::{is_stale, run_task, BuildTask, SkipReason, TaskContext, TaskOutcome, TaskState};

pub struct Orchestrator {
    config: BuildConfig,
    reader: Arc<dyn SourceReader>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("reader", &"<source reader>")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl Orchestrator {
    /// Creates an orchestrator that reads XML sources.
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            reader: Arc::new(XmlSourceReader),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_reader(mut self, reader: Arc<dyn SourceReader>) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Runs every wanted task and persists the merged catalog.
    ///
    /// Per-task problems end up in the report. Catalog load/save errors and
    /// cancellation are returned as errors; in those cases the catalog file
    /// is left as it was.
    pub fn run(&self) -> Result<RunReport> {
        let started = Instant::now();
        let config = &self.config;

        let mut catalog = BuildCatalog::load(&config.catalog_path)?;
        let tasks = self.plan(&catalog)?;
        let jobs = config.effective_jobs();
        log::info!(
            "building {} language pairs with {jobs} workers{}",
            tasks.len(),
            if config.force { " (forced)" } else { "" }
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .thread_name(|index| format!("lexitrie-worker-{index}"))
            .build()
            .map_err(|error| {
                LexitrieError::Internal(format!("failed to start worker pool: {error}"))
            })?;

        let ctx = Arc::new(TaskContext {
            reader: self.reader.clone(),
            builder: IndexBuilder::new(&config.output_dir),
            force: config.force,
            cancel: self.cancel.clone(),
        });

        let (sender, receiver) = crossbeam_channel::unbounded();
        for task in tasks {
            let sender = sender.clone();
            let ctx = ctx.clone();
            pool.spawn(move || {
                let outcome = run_task(&task, &ctx);
                // The receiver outlives every worker; a failed send means the
                // orchestrator itself is gone.
                let _ = sender.send((task.pair, outcome));
            });
        }
        drop(sender);

        let mut report = RunReport::default();
        for (pair, outcome) in receiver.iter() {
            let state = outcome.state().as_str();
            match outcome {
                TaskOutcome::Built(descriptor) => {
                    log::info!(
                        "{pair} {state}: {} lemmas, {} -> {} bytes",
                        descriptor.lemma_count,
                        descriptor.uncompressed_size,
                        descriptor.compressed_size
                    );
                    catalog.merge(Some(descriptor));
                    report.built.push(pair);
                }
                TaskOutcome::Skipped(reason) => {
                    match &reason {
                        SkipReason::UpToDate => log::debug!("{pair} {state}: {reason}"),
                        _ => log::warn!("{pair} {state}: {reason}"),
                    }
                    catalog.merge(None);
                    report.skipped.push((pair, reason));
                }
                TaskOutcome::Failed(detail) => {
                    log::warn!("{pair} {state}: {detail}");
                    report.failed.push(TaskFailure { pair, detail });
                }
                TaskOutcome::Cancelled => report.cancelled.push(pair),
            }
        }

        report.sort();
        report.elapsed = started.elapsed();

        if self.cancel.is_cancelled() {
            log::warn!(
                "build cancelled after {} of {} tasks; catalog not written",
                report.total() - report.cancelled.len(),
                report.total()
            );
            return Err(LexitrieError::Cancelled);
        }

        catalog.save(&config.catalog_path)?;
        Ok(report)
    }

    /// Discovered tasks, filtered by the configured pairs, with cached
    /// timestamps attached.
    fn plan(&self, catalog: &BuildCatalog) -> Result<Vec<BuildTask>> {
        let mut tasks = discover_tasks(&self.config.source_root)?;
        tasks.retain(|task| self.config.wants(&task.pair));

        if let Some(pairs) = &self.config.pairs {
            for pair in pairs {
                if !tasks.iter().any(|task| &task.pair == pair) {
                    log::warn!(
                        "{pair}: no source directory under {}",
                        self.config.source_root.display()
                    );
                }
            }
        }

        for task in &mut tasks {
            task.cached = catalog
                .get(&task.pair)
                .map(|descriptor| descriptor.source_last_modified);
        }
        Ok(tasks)
    }
}

/// Removes generated artifacts and the catalog. Returns how many files were
/// deleted.
pub fn clean_outputs(config: &BuildConfig) -> Result<usize> {
    let mut removed = 0;

    match fs::read_dir(&config.output_dir) {
        Ok(entries) => {
            for entry in entries {
                let path = entry?.path();
                let name = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or_default();
                if path.is_file() && (name.ends_with(".json.gz") || name.ends_with(".tmp")) {
                    fs::remove_file(&path)?;
                    log::debug!("removed {}", path.display());
                    removed += 1;
                }
            }
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
        Err(error) => return Err(error.into()),
    }

    match fs::remove_file(&config.catalog_path) {
        Ok(()) => removed += 1,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
        Err(error) => return Err(error.into()),
    }

    log::info!("removed {removed} generated files");
    Ok(removed)
}
