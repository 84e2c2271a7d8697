//! Score sources consulted by the pipeline.
//!
//! A source answers "what is the latest score for each of these
//! repositories" in bulk. Large repository sets are split into batches that
//! run concurrently on a bounded rayon pool; a failure in any batch fails the
//! whole source.

use crate::context::RunContext;
use crate::error::{ErrorContext, Result, TallyError};
use crate::model::ScoreOrigin;
use crate::scorecard::{latest_by_repository, ScoreRow, ScoreTable};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Batch shaping for bulk reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sharding {
    /// Maximum repositories per query
    pub batch_size: usize,
    /// Maximum queries in flight
    pub max_parallel: usize,
}

impl Default for Sharding {
    fn default() -> Self {
        Self {
            batch_size: 5000,
            max_parallel: 4,
        }
    }
}

impl Sharding {
    /// Number of batches `count` repositories split into.
    #[must_use]
    pub const fn batches(&self, count: usize) -> usize {
        count.div_ceil(self.effective_batch_size())
    }

    const fn effective_batch_size(&self) -> usize {
        if self.batch_size == 0 {
            1
        } else {
            self.batch_size
        }
    }
}

/// A bulk provider of repository scores.
pub trait ScoreSource: Send + Sync {
    /// Name used in progress messages and errors.
    fn name(&self) -> String;

    /// The origin recorded on results this source scores.
    fn origin(&self) -> ScoreOrigin;

    /// Latest known score for each repository the source has, keyed by
    /// repository. Repositories without a score are simply absent.
    fn fetch(&self, ctx: &RunContext, repositories: &[String])
        -> Result<HashMap<String, ScoreRow>>;
}

/// A [`ScoreSource`] reading from a [`ScoreTable`].
pub struct TableScoreSource {
    table: Arc<dyn ScoreTable>,
    origin: ScoreOrigin,
    sharding: Sharding,
}

impl TableScoreSource {
    pub fn new(table: Arc<dyn ScoreTable>, origin: ScoreOrigin) -> Self {
        Self {
            table,
            origin,
            sharding: Sharding::default(),
        }
    }

    #[must_use]
    pub const fn with_sharding(mut self, sharding: Sharding) -> Self {
        self.sharding = sharding;
        self
    }

    fn select_batches(
        &self,
        ctx: &RunContext,
        repositories: &[String],
    ) -> Result<Vec<Vec<ScoreRow>>> {
        let batch_size = self.sharding.effective_batch_size();
        if repositories.len() <= batch_size {
            return Ok(vec![self
                .table
                .select_where_repository_in(ctx, repositories)?]);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.sharding.max_parallel.max(1))
            .build()
            .map_err(|e| TallyError::config(format!("building query pool: {e}")))?;

        pool.install(|| {
            repositories
                .par_chunks(batch_size)
                .map(|batch| {
                    ctx.check()?;
                    self.table.select_where_repository_in(ctx, batch)
                })
                .collect()
        })
    }
}

impl ScoreSource for TableScoreSource {
    fn name(&self) -> String {
        self.table.to_string()
    }

    fn origin(&self) -> ScoreOrigin {
        self.origin
    }

    fn fetch(
        &self,
        ctx: &RunContext,
        repositories: &[String],
    ) -> Result<HashMap<String, ScoreRow>> {
        if repositories.is_empty() {
            return Ok(HashMap::new());
        }

        tracing::debug!(
            "Querying {} for {} repositories in {} batch(es)",
            self.table,
            repositories.len(),
            self.sharding.batches(repositories.len())
        );

        let batches = self
            .select_batches(ctx, repositories)
            .with_context(|| format!("reading {} scores", self.origin))?;
        Ok(latest_by_repository(batches.into_iter().flatten()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorecard::{MemoryTable, TableRef};
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn repos(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("github.com/org/repo{i}")).collect()
    }

    #[test]
    fn test_batches() {
        let sharding = Sharding {
            batch_size: 10,
            max_parallel: 2,
        };
        assert_eq!(sharding.batches(0), 0);
        assert_eq!(sharding.batches(10), 1);
        assert_eq!(sharding.batches(11), 2);
        assert_eq!(Sharding::default().batches(5000), 1);
    }

    #[test]
    fn test_empty_input_issues_no_query() {
        let table = Arc::new(MemoryTable::new(TableRef::new("p", "d", "t")));
        let source = TableScoreSource::new(table.clone(), ScoreOrigin::PublicLatest);
        assert!(source.fetch(&RunContext::new(), &[]).unwrap().is_empty());
        assert_eq!(table.select_count(), 0);
    }

    #[test]
    fn test_large_sets_are_sharded() {
        let all = repos(25);
        let table = Arc::new(
            MemoryTable::new(TableRef::new("p", "d", "t")).with_rows(
                all.iter()
                    .enumerate()
                    .map(|(i, r)| ScoreRow::new(r.clone(), i as f64 / 10.0, day(1))),
            ),
        );
        let source = TableScoreSource::new(table.clone(), ScoreOrigin::PrivateTable).with_sharding(
            Sharding {
                batch_size: 10,
                max_parallel: 2,
            },
        );

        let found = source.fetch(&RunContext::new(), &all).unwrap();
        assert_eq!(found.len(), 25);
        assert_eq!(table.select_count(), 3);
        assert!((found["github.com/org/repo24"].score - 2.4).abs() < 1e-9);
    }

    #[test]
    fn test_batch_failure_fails_the_source() {
        let table = Arc::new(MemoryTable::new(TableRef::new("p", "d", "t")).failing_selects());
        let source = TableScoreSource::new(table, ScoreOrigin::PublicLatest).with_sharding(Sharding {
            batch_size: 2,
            max_parallel: 2,
        });
        let err = source.fetch(&RunContext::new(), &repos(5)).unwrap_err();
        match err {
            TallyError::SourceQuery { context, .. } => {
                assert!(context.starts_with("reading public-latest scores"), "{context}");
            }
            other => panic!("expected SourceQuery, got {other:?}"),
        }
    }

    #[test]
    fn test_cancelled_context_stops_fetch() {
        let table = Arc::new(MemoryTable::new(TableRef::new("p", "d", "t")));
        let source = TableScoreSource::new(table, ScoreOrigin::PublicLatest);
        let ctx = RunContext::new();
        ctx.cancel();
        assert!(matches!(
            source.fetch(&ctx, &repos(3)),
            Err(TallyError::Cancelled)
        ));
    }
}
