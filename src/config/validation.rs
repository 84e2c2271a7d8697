//! Configuration validation.

use super::types::{GenerationConfig, TallyConfig, WarehouseConfig, GITHUB_TOKEN_ENV_VARS};
use crate::error::{Result, TallyError};
use crate::scorecard::TableRef;

// ============================================================================
// Configuration Error
// ============================================================================

/// A single invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// The field that failed validation
    pub field: String,
    /// Description of the validation error
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Validation Trait
// ============================================================================

/// Trait for validatable configuration types.
pub trait Validatable {
    /// Validate the configuration, returning any errors found.
    fn validate(&self) -> Vec<ConfigError>;

    /// Check if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

impl Validatable for TallyConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.warehouse.validate());
        errors.extend(self.generation.validate());
        if self.timeout_secs == Some(0) {
            errors.push(ConfigError::new("timeout_secs", "must be greater than 0"));
        }
        errors
    }
}

impl Validatable for WarehouseConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.batch_size == 0 {
            errors.push(ConfigError::new("warehouse.batch_size", "must be greater than 0"));
        }
        if !(1..=64).contains(&self.max_parallel) {
            errors.push(ConfigError::new(
                "warehouse.max_parallel",
                format!("must be between 1 and 64, got {}", self.max_parallel),
            ));
        }
        if self.request_timeout_secs == 0 {
            errors.push(ConfigError::new(
                "warehouse.request_timeout_secs",
                "must be greater than 0",
            ));
        }

        // Shape only; the project of two-part names is filled in later
        if let Some(table) = self.private_table() {
            if let Err(e) = TableRef::parse(table, Some("_")) {
                errors.push(ConfigError::new("warehouse.table", e.to_string()));
            }
        }

        errors
    }
}

impl Validatable for GenerationConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if let Some(bin) = &self.scorecard_bin {
            if bin.as_os_str().is_empty() {
                errors.push(ConfigError::new(
                    "generation.scorecard_bin",
                    "must not be empty",
                ));
            }
        }
        errors
    }
}

// ============================================================================
// Preflight
// ============================================================================

impl TallyConfig {
    /// Check everything a run needs before any I/O happens.
    ///
    /// A malformed table reference surfaces as the [`TallyError::Format`]
    /// that parsing it produced. Every other problem is a
    /// [`TallyError::Config`]: invalid values, a missing billing project, or
    /// generation without a table or GitHub credential.
    pub fn preflight(&self) -> Result<()> {
        if let Some(table) = self.warehouse.private_table() {
            TableRef::parse(table, Some("_"))?;
        }

        let errors = self.validate();
        if !errors.is_empty() {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(TallyError::config(joined));
        }

        if self.warehouse.project().is_none() {
            return Err(TallyError::config(
                "a project id is required (--project-id or SCORECARD_TALLY_PROJECT)",
            ));
        }

        if self.generation.enabled {
            if self.warehouse.private_table().is_none() {
                return Err(TallyError::config(
                    "generating scores requires a table to store them in (--table)",
                ));
            }
            if !self.generation.has_token() {
                return Err(TallyError::config(format!(
                    "generating scores requires a GitHub token in {}",
                    GITHUB_TOKEN_ENV_VARS.join(" or ")
                )));
            }
        }

        Ok(())
    }
}
