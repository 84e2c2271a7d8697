//! Configuration types for scorecard-tally runs.

use crate::bom::BomFormat;
use crate::output::OutputFormat;
use crate::sources::Sharding;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variables checked, in order, for the GitHub credential.
pub const GITHUB_TOKEN_ENV_VARS: &[&str] = &["GITHUB_TOKEN", "GITHUB_AUTH_TOKEN"];

/// Default number of repositories per warehouse query.
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Default number of shard queries in flight.
pub const DEFAULT_MAX_PARALLEL: usize = 4;

// ============================================================================
// Top-level configuration
// ============================================================================

/// Everything a run needs, from file, environment, and command line.
///
/// Passed explicitly to the pipeline builder; nothing reads global state
/// after this value is assembled.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TallyConfig {
    /// BOM input settings
    pub input: InputConfig,
    /// Warehouse access and tables
    pub warehouse: WarehouseConfig,
    /// Score generation
    pub generation: GenerationConfig,
    /// Result rendering
    pub output: OutputConfig,
    /// Overall run deadline in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl TallyConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overall deadline, if configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

// ============================================================================
// Sections
// ============================================================================

/// BOM input settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct InputConfig {
    /// Document format of the BOM
    pub format: BomFormat,
}

/// Warehouse access settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Billing project for queries, and the project of two-part table names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Job location (e.g. `US`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Private score table (`dataset.table` or `project.dataset.table`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Repositories per query
    pub batch_size: usize,
    /// Concurrent shard queries
    pub max_parallel: usize,
    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,
    /// Retries for transient API failures
    pub max_retries: u8,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            location: None,
            table: None,
            batch_size: DEFAULT_BATCH_SIZE,
            max_parallel: DEFAULT_MAX_PARALLEL,
            request_timeout_secs: 60,
            max_retries: 3,
        }
    }
}

impl WarehouseConfig {
    /// The configured private table, ignoring blank values.
    #[must_use]
    pub fn private_table(&self) -> Option<&str> {
        self.table.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// The configured billing project, ignoring blank values.
    #[must_use]
    pub fn project(&self) -> Option<&str> {
        self.project_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    #[must_use]
    pub const fn sharding(&self) -> Sharding {
        Sharding {
            batch_size: self.batch_size,
            max_parallel: self.max_parallel,
        }
    }
}

/// Score generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GenerationConfig {
    /// Generate scores for repositories no source has
    pub enabled: bool,
    /// Path to the scorecard binary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scorecard_bin: Option<PathBuf>,
    /// Extra arguments passed to scorecard
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scorecard_args: Vec<String>,
    /// GitHub credential. Only ever read from the environment.
    #[serde(skip)]
    #[schemars(skip)]
    pub github_token: Option<String>,
}

impl GenerationConfig {
    /// Pick up the GitHub credential from the environment.
    pub fn load_token_from_env(&mut self) {
        self.github_token = GITHUB_TOKEN_ENV_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()));
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.github_token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// Result rendering settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormat,
    /// Include packages without a score
    pub all: bool,
}
