//! In-memory score table.

use super::{latest_by_repository, ScoreRow, ScoreTable, TableRef};
use crate::context::RunContext;
use crate::error::{QueryErrorKind, Result, TallyError};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// An append-only score table held in memory.
///
/// Behaves like the warehouse table (latest row per repository, append-only
/// inserts) and counts backend calls so callers can assert on batching.
pub struct MemoryTable {
    reference: TableRef,
    rows: Mutex<Vec<ScoreRow>>,
    selects: AtomicUsize,
    fail_selects: bool,
    reject_inserts: HashSet<String>,
}

impl MemoryTable {
    #[must_use]
    pub fn new(reference: TableRef) -> Self {
        Self {
            reference,
            rows: Mutex::new(Vec::new()),
            selects: AtomicUsize::new(0),
            fail_selects: false,
            reject_inserts: HashSet::new(),
        }
    }

    /// Seed the table with existing rows.
    #[must_use]
    pub fn with_rows(self, rows: impl IntoIterator<Item = ScoreRow>) -> Self {
        self.lock_rows().extend(rows);
        self
    }

    /// Make every non-empty select fail.
    #[must_use]
    pub const fn failing_selects(mut self) -> Self {
        self.fail_selects = true;
        self
    }

    /// Make inserts for `repository` fail.
    #[must_use]
    pub fn rejecting_inserts_for(mut self, repository: impl Into<String>) -> Self {
        self.reject_inserts.insert(repository.into());
        self
    }

    /// Every row appended so far, oldest first.
    #[must_use]
    pub fn rows(&self) -> Vec<ScoreRow> {
        self.lock_rows().clone()
    }

    /// Number of selects that reached the backend.
    #[must_use]
    pub fn select_count(&self) -> usize {
        self.selects.load(Ordering::Relaxed)
    }

    fn lock_rows(&self) -> std::sync::MutexGuard<'_, Vec<ScoreRow>> {
        // A panic while holding the lock cannot leave a Vec half-pushed.
        self.rows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl fmt::Display for MemoryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.reference, f)
    }
}

impl ScoreTable for MemoryTable {
    fn select_where_repository_in(
        &self,
        ctx: &RunContext,
        repositories: &[String],
    ) -> Result<Vec<ScoreRow>> {
        if repositories.is_empty() {
            return Ok(Vec::new());
        }
        ctx.check()?;
        self.selects.fetch_add(1, Ordering::Relaxed);

        if self.fail_selects {
            return Err(TallyError::query(
                format!("selecting scores from {}", self.reference),
                QueryErrorKind::ApiError("backend unavailable".to_string()),
            ));
        }

        let wanted: HashSet<&str> = repositories.iter().map(String::as_str).collect();
        let matching = self
            .lock_rows()
            .iter()
            .filter(|row| wanted.contains(row.repository.as_str()))
            .cloned()
            .collect::<Vec<_>>();
        Ok(latest_by_repository(matching).into_values().collect())
    }

    fn insert(&self, ctx: &RunContext, row: &ScoreRow) -> Result<()> {
        ctx.check()?;
        if self.reject_inserts.contains(&row.repository) {
            return Err(TallyError::query(
                format!("inserting into {}", self.reference),
                QueryErrorKind::ApiError(format!("row for {} rejected", row.repository)),
            ));
        }
        self.lock_rows().push(row.clone());
        Ok(())
    }
}
