//! Pipeline run statistics.

use crate::generate::GenerationReport;
use crate::model::{ResultState, ScoreResult};
use crate::resolve::ResolveStats;
use serde::Serialize;
use std::time::Duration;

/// What one score source contributed.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStats {
    /// Source name (the table reference)
    pub name: String,
    /// Distinct repositories the source was asked about
    pub queried: usize,
    /// Repositories the source had a score for
    pub found: usize,
    /// Results whose score came from this source's merge
    pub applied: usize,
}

/// Statistics from a full pipeline run.
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// Packages that entered the pipeline
    pub packages: usize,
    /// Repository resolution counts
    pub resolve: ResolveStats,
    /// One entry per source, in the order they were applied
    pub sources: Vec<SourceStats>,
    /// Present when generation ran
    pub generation: Option<GenerationReport>,
    /// Per-state tally once every stage has run
    pub states: StateCounts,
    /// Wall time of the run
    pub duration: Duration,
}

/// Number of results in each terminal lifecycle state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateCounts {
    pub unresolved: usize,
    pub unscored: usize,
    pub scored_from_public: usize,
    pub scored_from_private: usize,
    pub scored_generated: usize,
}

impl StateCounts {
    /// Count the final states of `results`.
    pub fn tally<'a>(results: impl IntoIterator<Item = &'a ScoreResult>) -> Self {
        let mut counts = Self::default();
        for result in results {
            match result.final_state() {
                ResultState::Unresolved => counts.unresolved += 1,
                ResultState::RepositoryKnown | ResultState::Unscored => counts.unscored += 1,
                ResultState::ScoredFromPublic => counts.scored_from_public += 1,
                ResultState::ScoredFromPrivate => counts.scored_from_private += 1,
                ResultState::ScoredGenerated => counts.scored_generated += 1,
            }
        }
        counts
    }

    /// Results holding a score.
    #[must_use]
    pub const fn scored(&self) -> usize {
        self.scored_from_public + self.scored_from_private + self.scored_generated
    }
}

impl PipelineReport {
    /// Whether any per-repository failures were recorded
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.generation
            .as_ref()
            .is_some_and(GenerationReport::has_errors)
    }

    /// Log a summary of the run
    pub fn log_summary(&self) {
        tracing::info!(
            "Scored {} of {} packages ({} public, {} private, {} generated), \
             {} unscored, {} without repository in {:?}",
            self.states.scored(),
            self.packages,
            self.states.scored_from_public,
            self.states.scored_from_private,
            self.states.scored_generated,
            self.states.unscored,
            self.states.unresolved,
            self.duration
        );

        if let Some(generation) = &self.generation {
            generation.log_summary();
        }
    }
}
