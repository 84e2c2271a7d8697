//! **OpenSSF Scorecard scores for the packages in a bill of materials.**
//!
//! `scorecard-tally` reads a BOM, works out the source repository of every
//! package, and gathers the latest Scorecard score for each repository from
//! a warehouse: the public Scorecard snapshot, an optional private score
//! table, and optionally scores it generates itself by running `scorecard`.
//!
//! ## Core Concepts & Modules
//!
//! - **[`bom`]**: Reads CycloneDX and Syft JSON documents into [`Package`]s.
//! - **[`resolve`]**: Derives repositories from package identities and looks
//!   up the rest in the deps.dev dataset.
//! - **[`sources`]**: Score sources, queried in bounded parallel shards.
//! - **[`generate`]**: Runs Scorecard for repositories nothing has scored and
//!   persists the result.
//! - **[`pipeline`]**: Ties the stages together and merges source results by
//!   precedence.
//! - **[`output`]**: Renders results as a short list, a wide table, or JSON.
//!
//! ## Getting Started
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use scorecard_tally::{
//!     bom::{read_packages_from_path, BomFormat},
//!     cli::build_pipeline,
//!     config::TallyConfig,
//!     context::RunContext,
//!     warehouse::{AccessToken, BigQueryClient, BigQueryConfig, Warehouse},
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = TallyConfig::default();
//!     config.warehouse.project_id = Some("my-project".to_string());
//!
//!     let packages = read_packages_from_path(Path::new("bom.cdx.json"), BomFormat::CycloneDxJson)?;
//!     let bq = BigQueryConfig {
//!         project_id: config.warehouse.project_id.clone(),
//!         ..BigQueryConfig::default()
//!     };
//!     let warehouse: Arc<dyn Warehouse> =
//!         Arc::new(BigQueryClient::new(bq, AccessToken::discover()?)?);
//!
//!     let pipeline = build_pipeline(&config, warehouse, None)?;
//!     let output = pipeline.run(&RunContext::new(), &packages)?;
//!     for result in output.results.iter().filter(|r| r.score.is_some()) {
//!         println!("{} {:?}", result.repository.as_deref().unwrap_or("-"), result.score);
//!     }
//!     Ok(())
//! }
//! ```

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
#![allow(
    // Scores and counts are small; f64/usize casts are bounded in practice
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::similar_names
)]

pub mod bom;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod generate;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod resolve;
pub mod scorecard;
pub mod sources;
pub mod warehouse;

// Re-export main types for convenience
pub use config::{ConfigError, TallyConfig, Validatable};
pub use context::RunContext;
pub use error::{ErrorContext, OptionContext, Result, TallyError};
pub use model::{Package, PackageType, ResultState, ScoreOrigin, ScoreResult};
pub use pipeline::{MergePolicy, Pipeline, PipelineOutput, PipelineReport};
