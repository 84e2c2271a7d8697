//! Configuration for scorecard-tally.
//!
//! - Typed configuration sections with defaults
//! - Validation of every value, plus a preflight check for run prerequisites
//! - YAML config file loading and discovery
//!
//! # Configuration File
//!
//! Place a `.scorecard-tally.yaml` file in your project root or
//! `~/.config/scorecard-tally/`:
//!
//! ```yaml
//! warehouse:
//!   project_id: my-project
//!   table: scores.scorecard
//! output:
//!   format: wide
//! ```

pub mod file;
mod types;
mod validation;

pub use types::{
    GenerationConfig, InputConfig, OutputConfig, TallyConfig, WarehouseConfig,
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_PARALLEL, GITHUB_TOKEN_ENV_VARS,
};
pub use validation::{ConfigError, Validatable};

pub use file::{
    default_config_path, discover_config_file, generate_example_config, load_config_file,
    load_or_default, ConfigFileError,
};

/// JSON Schema for the configuration file format.
pub fn generate_json_schema() -> crate::error::Result<String> {
    let schema = schemars::schema_for!(TallyConfig);
    Ok(serde_json::to_string_pretty(&schema)?)
}
