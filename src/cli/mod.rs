//! CLI command handlers.
//!
//! Testable command handlers invoked by main.rs. Each handler returns the
//! process exit code; the caller is responsible for exiting with it.

mod config;
mod run;

pub use config::{run_config_init, run_config_path, run_config_schema, run_config_show};
pub use run::{build_pipeline, run_tally};
