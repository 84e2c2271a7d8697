//! Repository lookup against the deps.dev public dataset.

use super::RepositoryLookup;
use crate::context::RunContext;
use crate::error::{ErrorContext, Result};
use crate::model::{Package, PackageType};
use crate::warehouse::{row_str, Query, QueryParameter, Warehouse};
use std::collections::HashMap;
use std::sync::Arc;

/// deps.dev table mapping package versions to source projects.
pub const DEPS_DEV_PROJECTS_TABLE: &str = "bigquery-public-data.deps_dev_v1.PackageVersionToProject";

const DEPS_DEV_SNAPSHOTS_TABLE: &str = "bigquery-public-data.deps_dev_v1.Snapshots";

/// Resolves repositories through deps.dev's package → project mapping.
///
/// Only GitHub projects from the newest snapshot are considered. An exact
/// version match wins over other versions of the same package; among equals
/// the lexicographically smallest project is chosen.
pub struct DepsDevLookup {
    warehouse: Arc<dyn Warehouse>,
}

impl DepsDevLookup {
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self { warehouse }
    }

    /// The lookup statement for `packages`, bound through `@packages`.
    #[must_use]
    pub fn lookup_query(packages: &[Package]) -> Query {
        Query::new(format!(
            "SELECT system, name, version, project_name FROM (
  SELECT q.system AS system, q.name AS name, q.version AS version, p.ProjectName AS project_name,
    ROW_NUMBER() OVER (
      PARTITION BY q.system, q.name, q.version
      ORDER BY IF(p.Version = q.version, 0, 1), p.ProjectName
    ) AS preference
  FROM `{DEPS_DEV_PROJECTS_TABLE}` AS p
  JOIN UNNEST(@packages) AS q
    ON p.System = q.system AND p.Name = q.name
  WHERE p.SnapshotAt = (SELECT MAX(Time) FROM `{DEPS_DEV_SNAPSHOTS_TABLE}`)
    AND p.ProjectType = 'GITHUB'
)
WHERE preference = 1"
        ))
        .bind(QueryParameter::string_struct_array(
            "packages",
            &["system", "name", "version"],
            packages.iter().map(|pkg| {
                vec![
                    pkg.package_type.deps_dev_system().to_string(),
                    pkg.name.clone(),
                    pkg.version.clone(),
                ]
            }),
        ))
    }
}

impl RepositoryLookup for DepsDevLookup {
    fn lookup(&self, ctx: &RunContext, packages: &[Package]) -> Result<HashMap<Package, String>> {
        if packages.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = self
            .warehouse
            .query(ctx, &Self::lookup_query(packages))
            .context("looking up repositories on deps.dev")?;

        let mut found = HashMap::with_capacity(rows.len());
        for row in &rows {
            let system = row_str(row, "system")?;
            let Some(package_type) = PackageType::from_deps_dev_system(system) else {
                continue;
            };
            let package = Package::new(package_type, row_str(row, "name")?, row_str(row, "version")?);
            let project = row_str(row, "project_name")?;
            if !project.is_empty() {
                found.insert(package, normalize_project(project));
            }
        }

        tracing::debug!(
            "deps.dev resolved {} of {} packages",
            found.len(),
            packages.len()
        );
        Ok(found)
    }

    fn name(&self) -> &'static str {
        "deps.dev"
    }
}

/// deps.dev project names are `github.com/owner/repo`; older snapshots
/// sometimes omit the host.
fn normalize_project(project: &str) -> String {
    let project = project.trim_end_matches('/');
    if project.starts_with("github.com/") {
        project.to_string()
    } else {
        format!("github.com/{project}")
    }
}
