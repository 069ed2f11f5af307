use std::fmt;
use std::time::Duration;

use super::task::SkipReason;
use crate::lang::LangPair;

/// A task that failed, kept for the final summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub pair: LangPair,
    pub detail: String,
}

/// What happened to every task of a run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub built: Vec<LangPair>,
    pub skipped: Vec<(LangPair, SkipReason)>,
    pub failed: Vec<TaskFailure>,
    pub cancelled: Vec<LangPair>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.built.len() + self.skipped.len() + self.failed.len() + self.cancelled.len()
    }

    /// Sorts every list by pair so the report does not depend on completion
    /// order.
    pub(crate) fn sort(&mut self) {
        self.built.sort();
        self.skipped.sort_by(|a, b| a.0.cmp(&b.0));
        self.failed.sort_by(|a, b| a.pair.cmp(&b.pair));
        self.cancelled.sort();
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} tasks in {:.2}s: {} built, {} skipped, {} failed",
            self.total(),
            self.elapsed.as_secs_f64(),
            self.built.len(),
            self.skipped.len(),
            self.failed.len()
        )?;
        for pair in &self.built {
            writeln!(f, "  built    {pair}")?;
        }
        for (pair, reason) in &self.skipped {
            writeln!(f, "  skipped  {pair} ({reason})")?;
        }
        for failure in &self.failed {
            writeln!(f, "  FAILED   {}: {}", failure.pair, failure.detail)?;
        }
        if !self.cancelled.is_empty() {
            writeln!(f, "  {} tasks cancelled", self.cancelled.len())?;
        }
        Ok(())
    }
}
