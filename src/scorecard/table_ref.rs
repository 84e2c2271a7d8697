//! Qualified table references.

use crate::error::{Result, TallyError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fully qualified `project.dataset.table` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    /// Parse `dataset.table` or `project.dataset.table`.
    ///
    /// Two-part references take their project from `default_project`, which
    /// is normally the project of the active warehouse client.
    pub fn parse(reference: &str, default_project: Option<&str>) -> Result<Self> {
        let parts: Vec<&str> = reference.split('.').collect();
        if parts.iter().any(|p| !is_valid_segment(p)) {
            return Err(TallyError::table_reference(reference));
        }

        match parts.as_slice() {
            [dataset, table] => {
                let project = default_project.filter(|p| !p.is_empty()).ok_or_else(|| {
                    TallyError::config(format!(
                        "project id is not provided in '{reference}' and can't be retrieved from the client"
                    ))
                })?;
                Ok(Self::new(project, *dataset, *table))
            }
            [project, dataset, table] => Ok(Self::new(*project, *dataset, *table)),
            _ => Err(TallyError::table_reference(reference)),
        }
    }
}

/// Segments end up inside a quoted identifier, so they must not be able to
/// close the quote.
fn is_valid_segment(segment: &str) -> bool {
    !segment.trim().is_empty() && !segment.contains('`') && !segment.contains(char::is_whitespace)
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}
