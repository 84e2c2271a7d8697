//! Scorecard score storage.
//!
//! A score table is an append-only log of [`ScoreRow`]s. The current score of
//! a repository is always derived as its most recent row by date.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use scorecard_tally::context::RunContext;
//! use scorecard_tally::scorecard::{ScoreTable, WarehouseTable};
//! use scorecard_tally::warehouse::{AccessToken, BigQueryClient, BigQueryConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BigQueryConfig {
//!         project_id: Some("my-project".to_string()),
//!         ..Default::default()
//!     };
//!     let client = Arc::new(BigQueryClient::new(config, AccessToken::discover()?)?);
//!     let table = WarehouseTable::from_reference(client, "scores.scorecard")?;
//!
//!     let ctx = RunContext::new();
//!     let rows = table.select_where_repository_in(&ctx, &["github.com/foo/bar".to_string()])?;
//!     println!("{} has {} rows", table, rows.len());
//!     Ok(())
//! }
//! ```

mod memory;
mod table;
mod table_ref;

pub use memory::MemoryTable;
pub use table::{WarehouseTable, PUBLIC_LATEST_TABLE};
pub use table_ref::TableRef;

use crate::context::RunContext;
use crate::error::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One scorecard result for a repository on a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub repository: String,
    pub score: f64,
    pub date: NaiveDate,
}

impl ScoreRow {
    pub fn new(repository: impl Into<String>, score: f64, date: NaiveDate) -> Self {
        Self {
            repository: repository.into(),
            score,
            date,
        }
    }
}

/// A table holding scorecard rows.
pub trait ScoreTable: Send + Sync + fmt::Display {
    /// Latest row for each of `repositories` that has one.
    ///
    /// An empty input returns an empty result without touching the backend.
    fn select_where_repository_in(
        &self,
        ctx: &RunContext,
        repositories: &[String],
    ) -> Result<Vec<ScoreRow>>;

    /// Append one row. Never updates or deduplicates.
    fn insert(&self, ctx: &RunContext, row: &ScoreRow) -> Result<()>;
}

/// Reduce rows to the most recent one per repository.
///
/// On equal dates the first row seen wins.
#[must_use]
pub fn latest_by_repository(rows: impl IntoIterator<Item = ScoreRow>) -> HashMap<String, ScoreRow> {
    let mut latest: HashMap<String, ScoreRow> = HashMap::new();
    for row in rows {
        match latest.get(&row.repository) {
            Some(existing) if existing.date >= row.date => {}
            _ => {
                latest.insert(row.repository.clone(), row);
            }
        }
    }
    latest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_latest_by_repository_picks_newest() {
        let rows = vec![
            ScoreRow::new("github.com/a/a", 3.0, day(1)),
            ScoreRow::new("github.com/a/a", 5.0, day(9)),
            ScoreRow::new("github.com/a/a", 4.0, day(5)),
            ScoreRow::new("github.com/b/b", 8.0, day(2)),
        ];
        let latest = latest_by_repository(rows);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["github.com/a/a"].score, 5.0);
        assert_eq!(latest["github.com/b/b"].date, day(2));
    }

    #[test]
    fn test_latest_by_repository_tie_keeps_first() {
        let rows = vec![
            ScoreRow::new("github.com/a/a", 1.0, day(3)),
            ScoreRow::new("github.com/a/a", 2.0, day(3)),
        ];
        assert_eq!(latest_by_repository(rows)["github.com/a/a"].score, 1.0);
    }
}
