//! Score tables backed by the warehouse.

use super::{ScoreRow, ScoreTable, TableRef};
use crate::context::RunContext;
use crate::error::{ErrorContext, Result};
use crate::warehouse::{row_date, row_f64, row_str, Query, QueryParameter, Warehouse};
use serde_json::json;
use std::fmt;
use std::sync::Arc;

/// The public OpenSSF snapshot, refreshed weekly.
pub const PUBLIC_LATEST_TABLE: &str = "openssf.scorecardcron.scorecard-v2_latest";

/// A scorecard table (`repo.name`, `score`, `date`) in the warehouse.
pub struct WarehouseTable {
    warehouse: Arc<dyn Warehouse>,
    reference: TableRef,
}

impl WarehouseTable {
    pub fn new(warehouse: Arc<dyn Warehouse>, reference: TableRef) -> Self {
        Self {
            warehouse,
            reference,
        }
    }

    /// Build a table from a reference string, taking the project of two-part
    /// references from the warehouse client.
    pub fn from_reference(warehouse: Arc<dyn Warehouse>, reference: &str) -> Result<Self> {
        let reference = TableRef::parse(reference, warehouse.project_id())?;
        Ok(Self::new(warehouse, reference))
    }

    /// The public latest-scores snapshot.
    pub fn public_latest(warehouse: Arc<dyn Warehouse>) -> Result<Self> {
        Self::from_reference(warehouse, PUBLIC_LATEST_TABLE)
    }

    #[must_use]
    pub const fn reference(&self) -> &TableRef {
        &self.reference
    }

    /// The latest-row-per-repository query. Repositories are bound through
    /// `@repositories`; only the validated table name is part of the text.
    #[must_use]
    pub fn select_query(&self, repositories: &[String]) -> Query {
        Query::new(format!(
            "SELECT repo.name AS repo_name, score, date
FROM `{}`
WHERE repo.name IN UNNEST(@repositories)
QUALIFY ROW_NUMBER() OVER (PARTITION BY repo.name ORDER BY date DESC) = 1",
            self.reference
        ))
        .bind(QueryParameter::string_array(
            "repositories",
            repositories.iter().cloned(),
        ))
    }
}

impl fmt::Display for WarehouseTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.reference, f)
    }
}

impl ScoreTable for WarehouseTable {
    fn select_where_repository_in(
        &self,
        ctx: &RunContext,
        repositories: &[String],
    ) -> Result<Vec<ScoreRow>> {
        if repositories.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .warehouse
            .query(ctx, &self.select_query(repositories))
            .with_context(|| format!("selecting scores from {}", self.reference))?;

        rows.iter()
            .map(|row| {
                Ok(ScoreRow {
                    repository: row_str(row, "repo_name")?.to_string(),
                    score: row_f64(row, "score")?,
                    date: row_date(row, "date")?,
                })
            })
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("reading scores from {}", self.reference))
    }

    fn insert(&self, ctx: &RunContext, row: &ScoreRow) -> Result<()> {
        let value = json!({
            "repo": { "name": row.repository },
            "score": row.score,
            "date": row.date.format("%Y-%m-%d").to_string(),
        });
        self.warehouse
            .insert_rows(ctx, &self.reference, &[value])
            .with_context(|| format!("inserting into {}", self.reference))
    }
}
