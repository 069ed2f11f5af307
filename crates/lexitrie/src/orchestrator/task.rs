//! Per-task execution and outcomes.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::builder::IndexBuilder;
use crate::cancel::CancellationToken;
use crate::catalog::ResultDescriptor;
use crate::error::{LexitrieError, Result};
use crate::lang::LangPair;
use crate::source::SourceReader;

/// Lifecycle of a build task.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TaskState {
    Pending,
    Skipped,
    Running,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Skipped => "skipped",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// One language pair to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTask {
    pub pair: LangPair,
    /// The pair's directory under the source root.
    pub dir: PathBuf,
    /// `sourceLastModified` of the catalog entry for this pair, if any.
    pub cached: Option<DateTime<Utc>>,
}

impl BuildTask {
    pub fn new(pair: LangPair, dir: PathBuf) -> Self {
        Self {
            pair,
            dir,
            cached: None,
        }
    }
}

/// A pair is stale only when its source is strictly newer than the catalog.
pub fn is_stale(cached: Option<DateTime<Utc>>, latest: DateTime<Utc>) -> bool {
    cached.map_or(true, |cached| latest > cached)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UpToDate,
    /// The source produced no lemmas.
    Empty,
    SourceUnavailable(PathBuf),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpToDate => write!(f, "up to date"),
            Self::Empty => write!(f, "no lemmas"),
            Self::SourceUnavailable(path) => write!(f, "source unavailable: {}", path.display()),
        }
    }
}

/// What a worker sends back to the orchestrator.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Built(ResultDescriptor),
    Skipped(SkipReason),
    Failed(String),
    /// The run was cancelled before the task wrote anything.
    Cancelled,
}

impl TaskOutcome {
    pub fn state(&self) -> TaskState {
        match self {
            Self::Built(_) => TaskState::Succeeded,
            Self::Skipped(_) => TaskState::Skipped,
            Self::Failed(_) => TaskState::Failed,
            Self::Cancelled => TaskState::Pending,
        }
    }
}

/// Read-only state shared by all workers of a run.
pub struct TaskContext {
    pub reader: Arc<dyn SourceReader>,
    pub builder: IndexBuilder,
    pub force: bool,
    pub cancel: CancellationToken,
}

/// Runs one task to completion. Never panics and never returns an error:
/// everything that goes wrong is folded into the outcome.
pub fn run_task(task: &BuildTask, ctx: &TaskContext) -> TaskOutcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| execute(task, ctx)));
    match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(LexitrieError::Cancelled)) => TaskOutcome::Cancelled,
        Ok(Err(LexitrieError::SourceUnavailable(path))) => {
            TaskOutcome::Skipped(SkipReason::SourceUnavailable(path))
        }
        Ok(Err(error)) => TaskOutcome::Failed(error.to_string()),
        Err(payload) => TaskOutcome::Failed(panic_message(payload.as_ref())),
    }
}

fn execute(task: &BuildTask, ctx: &TaskContext) -> Result<TaskOutcome> {
    ctx.cancel.check()?;
    let latest = ctx.reader.last_modified(&task.dir)?;
    if !ctx.force && !is_stale(task.cached, latest) {
        return Ok(TaskOutcome::Skipped(SkipReason::UpToDate));
    }

    log::debug!(
        "{} {} (source modified {latest})",
        task.pair,
        TaskState::Running.as_str()
    );
    let source = ctx.reader.read(&task.dir)?;
    // No artifact is written once the run is cancelled.
    ctx.cancel.check()?;
    match ctx.builder.build(&task.pair, source)? {
        Some(descriptor) => Ok(TaskOutcome::Built(descriptor)),
        None => Ok(TaskOutcome::Skipped(SkipReason::Empty)),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
