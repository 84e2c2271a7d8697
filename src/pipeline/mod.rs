//! Result aggregation.
//!
//! A [`Pipeline`] threads the whole result list through each stage in turn:
//! resolve → each score source (in precedence order) → generation. Every
//! stage receives and returns the complete list; package order is preserved
//! from input to output.

mod merge;
mod report;

pub use merge::{merge, MergePolicy};
pub use report::{PipelineReport, SourceStats, StateCounts};

use crate::context::RunContext;
use crate::error::{Result, TallyError};
use crate::generate::ScoreGenerator;
use crate::model::{Package, ScoreResult};
use crate::resolve::RepositoryResolver;
use crate::sources::ScoreSource;
use indexmap::IndexSet;
use std::time::Instant;

/// Exit codes for the command line
pub mod exit_codes {
    /// Results were produced
    pub const SUCCESS: i32 = 0;
    /// A fatal error aborted the run
    pub const ERROR: i32 = 1;
}

/// The result list and statistics of a completed run.
#[derive(Debug)]
pub struct PipelineOutput {
    pub results: Vec<ScoreResult>,
    pub report: PipelineReport,
}

struct SourceStage {
    source: Box<dyn ScoreSource>,
    policy: MergePolicy,
}

/// Resolve packages, merge scores from ranked sources, then backfill.
pub struct Pipeline {
    resolver: RepositoryResolver,
    sources: Vec<SourceStage>,
    generator: Option<ScoreGenerator>,
}

impl Pipeline {
    pub fn new(resolver: RepositoryResolver) -> Self {
        Self {
            resolver,
            sources: Vec::new(),
            generator: None,
        }
    }

    /// Append a source. Sources apply in the order they are added, so a
    /// later [`MergePolicy::Overwrite`] source takes precedence over every
    /// earlier one.
    #[must_use]
    pub fn with_source(mut self, source: impl ScoreSource + 'static, policy: MergePolicy) -> Self {
        self.sources.push(SourceStage {
            source: Box::new(source),
            policy,
        });
        self
    }

    /// Backfill remaining gaps with `generator` after every source ran.
    #[must_use]
    pub fn with_generator(mut self, generator: ScoreGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Number of configured sources.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Run every stage over `packages`.
    ///
    /// Source and lookup failures abort the run. Generation failures are
    /// per repository and end up in the report. Cancellation aborts the run
    /// with [`TallyError::Cancelled`], even mid-generation; rows already
    /// appended by then stay in the table.
    pub fn run(&self, ctx: &RunContext, packages: &[Package]) -> Result<PipelineOutput> {
        let start = Instant::now();
        ctx.check()?;

        let mut report = PipelineReport {
            packages: packages.len(),
            ..PipelineReport::default()
        };

        tracing::info!("Resolving repositories for {} packages...", packages.len());
        let (mut results, resolve) = self.resolver.resolve(ctx, packages)?;
        tracing::info!(
            "Resolved {} packages ({} unresolved)",
            resolve.derived + resolve.looked_up,
            resolve.unresolved
        );
        report.resolve = resolve;

        let repositories = distinct_repositories(&results);

        for stage in &self.sources {
            ctx.check()?;
            let name = stage.source.name();
            tracing::info!("Fetching scores from {}...", name);

            let rows = stage.source.fetch(ctx, &repositories)?;
            let applied = merge(&mut results, &rows, stage.policy, stage.source.origin());
            tracing::info!("{} had scores for {} repositories", name, rows.len());

            report.sources.push(SourceStats {
                name,
                queried: repositories.len(),
                found: rows.len(),
                applied,
            });
        }

        if let Some(generator) = &self.generator {
            ctx.check()?;
            tracing::info!("Generating missing scores into {}...", generator.table());
            let (generated, generation) = generator.generate(ctx, results);
            results = generated;
            let interrupted = generation.interrupted;
            report.generation = Some(generation);
            if interrupted {
                if let Some(generation) = &report.generation {
                    generation.log_summary();
                }
                return Err(TallyError::Cancelled);
            }
        }

        report.states = StateCounts::tally(&results);
        report.duration = start.elapsed();
        Ok(PipelineOutput { results, report })
    }
}

/// Non-empty repositories of `results`, deduplicated, in first-seen order.
fn distinct_repositories(results: &[ScoreResult]) -> Vec<String> {
    results
        .iter()
        .filter_map(ScoreResult::repository)
        .map(str::to_string)
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}
