//! Backfilling scores that no source has.
//!
//! For every repository that is still unscored after all sources have been
//! consulted, the generator runs a [`ScoreCheck`] once, appends the result
//! to the private table, and fills the score into every result for that
//! repository. Per-repository failures are collected in a
//! [`GenerationReport`] rather than aborting the run.

mod scorecard_cli;

pub use scorecard_cli::{ScorecardCli, DEFAULT_SCORECARD_BINARY};

use crate::context::RunContext;
use crate::error::{Result, TallyError};
use crate::model::{ScoreOrigin, ScoreResult};
use crate::pipeline::{merge, MergePolicy};
use crate::scorecard::{ScoreRow, ScoreTable};
use indexmap::IndexSet;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Computes a fresh score for one repository.
pub trait ScoreCheck: Send + Sync {
    /// Score `repository` now. Must return promptly with
    /// [`TallyError::Cancelled`] once `ctx` is done.
    fn check(&self, ctx: &RunContext, repository: &str) -> Result<ScoreRow>;
}

/// Outcome of a generation pass.
#[derive(Debug, Default)]
pub struct GenerationReport {
    /// Distinct repositories the check ran for
    pub checked: usize,
    /// Repositories that received a score
    pub generated: usize,
    /// Rows appended to the table
    pub persisted: usize,
    /// Results that received a generated score
    pub results_scored: usize,
    /// Per-repository failures, in the order they happened
    pub errors: Vec<TallyError>,
    /// Generation stopped early because the run was cancelled
    pub interrupted: bool,
    /// Wall time of the pass
    pub duration: Duration,
}

impl GenerationReport {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Repositories whose check failed.
    pub fn failed_repositories(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().filter_map(|e| match e {
            TallyError::Generation { repository, .. } => Some(repository.as_str()),
            _ => None,
        })
    }

    /// Log a summary of the generation pass
    pub fn log_summary(&self) {
        tracing::info!(
            "Generation complete: {} checked, {} scored, {} saved in {:?}",
            self.checked,
            self.generated,
            self.persisted,
            self.duration
        );

        for err in &self.errors {
            tracing::warn!("{}", err);
        }
    }
}

/// Runs checks for unscored repositories and persists the results.
pub struct ScoreGenerator {
    check: Arc<dyn ScoreCheck>,
    table: Arc<dyn ScoreTable>,
}

impl ScoreGenerator {
    pub fn new(check: Arc<dyn ScoreCheck>, table: Arc<dyn ScoreTable>) -> Self {
        Self { check, table }
    }

    /// The table generated rows are appended to.
    #[must_use]
    pub fn table(&self) -> &dyn ScoreTable {
        self.table.as_ref()
    }

    /// Fill the gaps in `results`.
    ///
    /// Results that already have a score, or have no repository, are never
    /// touched. A successful check whose insert fails still scores the
    /// results; the insert failure is reported as a [`TallyError::Persist`].
    pub fn generate(
        &self,
        ctx: &RunContext,
        mut results: Vec<ScoreResult>,
    ) -> (Vec<ScoreResult>, GenerationReport) {
        let start = Instant::now();
        let mut report = GenerationReport::default();

        let pending: IndexSet<String> = results
            .iter()
            .filter(|r| !r.has_score())
            .filter_map(|r| r.repository().map(str::to_string))
            .collect();

        let mut generated: HashMap<String, ScoreRow> = HashMap::with_capacity(pending.len());
        for (i, repository) in pending.iter().enumerate() {
            if ctx.is_done() {
                report.interrupted = true;
                break;
            }

            tracing::info!(
                "Generating score for {} ({}/{})...",
                repository,
                i + 1,
                pending.len()
            );
            report.checked += 1;

            let row = match self.check.check(ctx, repository) {
                Ok(row) => ScoreRow::new(repository.clone(), row.score, row.date),
                Err(TallyError::Cancelled) => {
                    report.interrupted = true;
                    break;
                }
                Err(err) => {
                    let err = generation_error(repository, err);
                    tracing::warn!("{}", err);
                    report.errors.push(err);
                    continue;
                }
            };

            match self.table.insert(ctx, &row) {
                Ok(()) => report.persisted += 1,
                Err(TallyError::Cancelled) => {
                    report.interrupted = true;
                    break;
                }
                Err(err) => {
                    let err = TallyError::Persist {
                        repository: repository.clone(),
                        table: self.table.to_string(),
                        message: err.to_string(),
                    };
                    tracing::warn!("{}", err);
                    report.errors.push(err);
                }
            }

            report.generated += 1;
            generated.insert(repository.clone(), row);
        }

        report.results_scored = merge(
            &mut results,
            &generated,
            MergePolicy::FillGaps,
            ScoreOrigin::Generated,
        );
        report.duration = start.elapsed();
        (results, report)
    }
}

fn generation_error(repository: &str, err: TallyError) -> TallyError {
    match err {
        TallyError::Generation { .. } => err,
        other => TallyError::Generation {
            repository: repository.to_string(),
            message: other.to_string(),
        },
    }
}
