//! Unified error types for scorecard-tally.
//!
//! Fatal errors (configuration, format, source queries, cancellation) unwind
//! the run. Per-repository generation and persistence failures are carried
//! as values in the generation report instead.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for scorecard-tally operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TallyError {
    /// Missing or inconsistent configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Malformed table reference or BOM
    #[error("Invalid format: {context}")]
    Format {
        context: String,
        #[source]
        source: FormatErrorKind,
    },

    /// A batched warehouse read failed
    #[error("Query failed: {context}")]
    SourceQuery {
        context: String,
        #[source]
        source: QueryErrorKind,
    },

    /// The scoring check failed for one repository
    #[error("Failed to generate score for {repository}: {message}")]
    Generation { repository: String, message: String },

    /// A generated row could not be appended to the table
    #[error("Failed to save score for {repository} to {table}: {message}")]
    Persist {
        repository: String,
        table: String,
        message: String,
    },

    /// The run context was cancelled or its deadline passed
    #[error("Operation cancelled")]
    Cancelled,

    /// IO errors with context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Specific format error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FormatErrorKind {
    #[error("invalid table reference '{0}': expected dataset.table or project.dataset.table")]
    TableReference(String),

    #[error("Unknown BOM format '{0}'")]
    UnknownBomFormat(String),

    #[error("Invalid JSON structure: {0}")]
    InvalidJson(String),

    #[error("Missing required field: {field} in {context}")]
    MissingField { field: String, context: String },
}

/// Specific warehouse query error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum QueryErrorKind {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Query job failed: {0}")]
    JobFailed(String),
}

// ============================================================================
// Result type alias
// ============================================================================

/// Convenient Result type for scorecard-tally operations
pub type Result<T> = std::result::Result<T, TallyError>;

// ============================================================================
// Error construction helpers
// ============================================================================

impl TallyError {
    /// Create a format error with context
    pub fn format(context: impl Into<String>, source: FormatErrorKind) -> Self {
        Self::Format {
            context: context.into(),
            source,
        }
    }

    /// Create a format error for a malformed table reference
    pub fn table_reference(reference: impl Into<String>) -> Self {
        let reference = reference.into();
        Self::format(
            "parsing table reference",
            FormatErrorKind::TableReference(reference),
        )
    }

    /// Create a format error for a missing BOM field
    pub fn missing_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::format(
            "missing required field",
            FormatErrorKind::MissingField {
                field: field.into(),
                context: context.into(),
            },
        )
    }

    /// Create a source query error
    pub fn query(context: impl Into<String>, source: QueryErrorKind) -> Self {
        Self::SourceQuery {
            context: context.into(),
            source,
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let message = format!("{source}");
        Self::Io {
            path: Some(path.into()),
            message,
            source,
        }
    }

    /// Whether this error aborts the run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Generation { .. } | Self::Persist { .. })
    }
}

// ============================================================================
// Conversions from existing error types
// ============================================================================

impl From<std::io::Error> for TallyError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

impl From<serde_json::Error> for TallyError {
    fn from(err: serde_json::Error) -> Self {
        Self::format(
            "JSON deserialization",
            FormatErrorKind::InvalidJson(err.to_string()),
        )
    }
}

// ============================================================================
// Error context extension trait
// ============================================================================

/// Extension trait for adding context to errors.
///
/// The context string is prepended to the error's existing context so the
/// final message reads outermost-first.
///
/// ```ignore
/// use scorecard_tally::error::ErrorContext;
///
/// let rows = table
///     .select_where_repository_in(&ctx, &repos)
///     .with_context(|| format!("reading {table}"))?;
/// ```
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context from a closure, only evaluated on error.
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: Into<TallyError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        let ctx: String = context.into();
        self.map_err(|e| add_context_to_error(e.into(), &ctx))
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| {
            let ctx: String = f().into();
            add_context_to_error(e.into(), &ctx)
        })
    }
}

/// Add context to an error, chaining with any existing context.
fn add_context_to_error(err: TallyError, new_ctx: &str) -> TallyError {
    match err {
        TallyError::Format {
            context: existing,
            source,
        } => TallyError::Format {
            context: chain_context(new_ctx, &existing),
            source,
        },
        TallyError::SourceQuery {
            context: existing,
            source,
        } => TallyError::SourceQuery {
            context: chain_context(new_ctx, &existing),
            source,
        },
        TallyError::Io {
            path,
            message,
            source,
        } => TallyError::Io {
            path,
            message: chain_context(new_ctx, &message),
            source,
        },
        TallyError::Config(msg) => TallyError::Config(chain_context(new_ctx, &msg)),
        // Per-repository errors and cancellation already carry their subject
        other => other,
    }
}

/// Chain two context strings together.
///
/// Returns "`new_context`: `existing_context`", or just the new context when
/// nothing exists yet.
fn chain_context(new: &str, existing: &str) -> String {
    if existing.is_empty() {
        new.to_string()
    } else {
        format!("{new}: {existing}")
    }
}

/// Extension trait for Option types to convert to errors with context.
pub trait OptionContext<T> {
    /// Convert None to a configuration error with the given message.
    fn context_none(self, context: impl Into<String>) -> Result<T>;

    /// Convert None to a configuration error with a lazily built message.
    fn with_context_none<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T> OptionContext<T> for Option<T> {
    fn context_none(self, context: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| TallyError::Config(context.into()))
    }

    fn with_context_none<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.ok_or_else(|| TallyError::Config(f().into()))
    }
}
