//! Core data model: packages from the BOM and the per-package score results
//! that flow through the pipeline.

mod package;
mod result;

pub use package::{Package, PackageType};
pub use result::{ResultState, ScoreOrigin, ScoreResult};
