//! Analytical warehouse access.
//!
//! The pipeline never builds SQL from data: every statement is a fixed text
//! with named parameters, executed through the [`Warehouse`] trait. The only
//! production implementation is [`BigQueryClient`].

mod auth;
mod bigquery;
mod params;

pub use auth::AccessToken;
pub use bigquery::{BigQueryClient, BigQueryConfig};
pub use params::{ParameterType, ParameterValue, Query, QueryParameter, StructFieldType};

use crate::context::RunContext;
use crate::error::{QueryErrorKind, Result, TallyError};
use crate::scorecard::TableRef;
use chrono::NaiveDate;
use serde_json::{Map, Value};

/// A result row keyed by column name. Scalars arrive as JSON strings.
pub type Row = Map<String, Value>;

/// Narrow capability over the warehouse: parameterized reads and appends.
pub trait Warehouse: Send + Sync {
    /// Project that queries are billed to, and the default project for
    /// two-part table references.
    fn project_id(&self) -> Option<&str>;

    /// Run a query to completion and return every row.
    fn query(&self, ctx: &RunContext, query: &Query) -> Result<Vec<Row>>;

    /// Append JSON rows to a table.
    fn insert_rows(&self, ctx: &RunContext, table: &TableRef, rows: &[Value]) -> Result<()>;
}

// ============================================================================
// Row decoding helpers
// ============================================================================

fn invalid(message: String) -> TallyError {
    TallyError::query("decoding row", QueryErrorKind::InvalidResponse(message))
}

/// Read a non-null string column.
pub fn row_str<'a>(row: &'a Row, column: &str) -> Result<&'a str> {
    row.get(column)
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(format!("missing string column '{column}'")))
}

/// Read a FLOAT column. Accepts numbers and numeric strings.
pub fn row_f64(row: &Row, column: &str) -> Result<f64> {
    match row.get(column) {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| invalid(format!("column '{column}' is not a float"))),
        Some(Value::String(s)) => s
            .parse()
            .map_err(|_| invalid(format!("column '{column}' is not a float: {s}"))),
        _ => Err(invalid(format!("missing float column '{column}'"))),
    }
}

/// Read a DATE column (`YYYY-MM-DD`).
pub fn row_date(row: &Row, column: &str) -> Result<NaiveDate> {
    let raw = row_str(row, column)?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| invalid(format!("column '{column}' is not a date: {raw} ({e})")))
}
