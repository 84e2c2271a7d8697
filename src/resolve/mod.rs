//! Package → source repository resolution.
//!
//! Repositories are derived locally where the package name embeds them (Go
//! modules under `github.com/`). Everything else goes to a
//! [`RepositoryLookup`] in a single batch. Packages that neither path can
//! resolve stay unresolved; that is not an error.

mod deps_dev;

pub use deps_dev::{DepsDevLookup, DEPS_DEV_PROJECTS_TABLE};

use crate::context::RunContext;
use crate::error::Result;
use crate::model::{Package, ScoreResult};
use indexmap::IndexSet;
use std::collections::HashMap;
use std::sync::Arc;

/// Batch lookup of repositories by package identity.
pub trait RepositoryLookup: Send + Sync {
    /// Repositories for whichever of `packages` the source knows.
    fn lookup(&self, ctx: &RunContext, packages: &[Package]) -> Result<HashMap<Package, String>>;

    /// Name used in progress messages.
    fn name(&self) -> &'static str;
}

/// Counts from one resolution pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolveStats {
    /// Packages whose repository came from their name
    pub derived: usize,
    /// Packages resolved through the lookup
    pub looked_up: usize,
    /// Packages left without a repository
    pub unresolved: usize,
    /// Lookup calls issued (0 or 1)
    pub lookups: usize,
}

/// Maps packages to repositories.
#[derive(Clone, Default)]
pub struct RepositoryResolver {
    lookup: Option<Arc<dyn RepositoryLookup>>,
}

impl RepositoryResolver {
    /// A resolver that only derives repositories from package names.
    #[must_use]
    pub fn derive_only() -> Self {
        Self { lookup: None }
    }

    /// A resolver that falls back to `lookup` for packages it can't derive.
    pub fn with_lookup(lookup: Arc<dyn RepositoryLookup>) -> Self {
        Self {
            lookup: Some(lookup),
        }
    }

    /// Create one result per package, in package order, with repositories
    /// filled in where known.
    pub fn resolve(
        &self,
        ctx: &RunContext,
        packages: &[Package],
    ) -> Result<(Vec<ScoreResult>, ResolveStats)> {
        let mut stats = ResolveStats::default();
        let mut results: Vec<ScoreResult> = packages
            .iter()
            .map(|pkg| {
                let result = ScoreResult::new(pkg.clone());
                match pkg.derived_repository() {
                    Some(repo) => {
                        stats.derived += 1;
                        result.with_repository(repo)
                    }
                    None => result,
                }
            })
            .collect();

        let pending: IndexSet<Package> = results
            .iter()
            .filter(|r| r.repository().is_none())
            .map(|r| r.package.clone())
            .collect();

        if let Some(lookup) = &self.lookup {
            if !pending.is_empty() {
                let pending: Vec<Package> = pending.into_iter().collect();
                tracing::debug!(
                    "Looking up repositories for {} packages via {}",
                    pending.len(),
                    lookup.name()
                );
                let found = lookup.lookup(ctx, &pending)?;
                stats.lookups = 1;

                for result in results.iter_mut().filter(|r| r.repository().is_none()) {
                    if let Some(repo) = found.get(&result.package).filter(|r| !r.is_empty()) {
                        result.repository = Some(repo.clone());
                        stats.looked_up += 1;
                    }
                }
            }
        }

        stats.unresolved = results.iter().filter(|r| r.repository().is_none()).count();
        Ok((results, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{QueryErrorKind, TallyError};
    use crate::model::PackageType;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeLookup {
        known: HashMap<Package, String>,
        calls: Mutex<Vec<Vec<Package>>>,
        fail: bool,
    }

    impl RepositoryLookup for FakeLookup {
        fn lookup(
            &self,
            _ctx: &RunContext,
            packages: &[Package],
        ) -> Result<HashMap<Package, String>> {
            self.calls.lock().unwrap().push(packages.to_vec());
            if self.fail {
                return Err(TallyError::query(
                    "lookup",
                    QueryErrorKind::NetworkError("down".into()),
                ));
            }
            Ok(packages
                .iter()
                .filter_map(|p| self.known.get(p).map(|r| (p.clone(), r.clone())))
                .collect())
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    fn npm(name: &str) -> Package {
        Package::new(PackageType::Npm, name, "1.0.0")
    }

    fn go(name: &str) -> Package {
        Package::new(PackageType::Golang, name, "v1.0.0")
    }

    #[test]
    fn test_derive_only() {
        let packages = vec![go("github.com/foo/bar/baz"), npm("lodash")];
        let (results, stats) = RepositoryResolver::derive_only()
            .resolve(&RunContext::new(), &packages)
            .unwrap();
        assert_eq!(results[0].repository(), Some("github.com/foo/bar"));
        assert_eq!(results[1].repository(), None);
        assert_eq!(stats.derived, 1);
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.lookups, 0);
    }

    #[test]
    fn test_single_batched_lookup_for_remaining_packages() {
        let lookup = Arc::new(FakeLookup {
            known: HashMap::from([(npm("lodash"), "github.com/lodash/lodash".to_string())]),
            ..Default::default()
        });
        let packages = vec![
            npm("lodash"),
            go("github.com/foo/bar"),
            npm("left-pad"),
            npm("lodash"),
        ];
        let (results, stats) = RepositoryResolver::with_lookup(lookup.clone())
            .resolve(&RunContext::new(), &packages)
            .unwrap();

        let calls = lookup.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        // Deduplicated, derived packages excluded
        assert_eq!(calls[0], vec![npm("lodash"), npm("left-pad")]);

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].repository(), Some("github.com/lodash/lodash"));
        assert_eq!(results[1].repository(), Some("github.com/foo/bar"));
        assert_eq!(results[2].repository(), None);
        assert_eq!(results[3].repository(), Some("github.com/lodash/lodash"));
        assert_eq!(stats.looked_up, 2);
        assert_eq!(stats.unresolved, 1);
    }

    #[test]
    fn test_no_lookup_when_everything_is_derived() {
        let lookup = Arc::new(FakeLookup::default());
        let packages = vec![go("github.com/a/b"), go("github.com/c/d")];
        RepositoryResolver::with_lookup(lookup.clone())
            .resolve(&RunContext::new(), &packages)
            .unwrap();
        assert!(lookup.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_lookup_failure_is_fatal() {
        let lookup = Arc::new(FakeLookup {
            fail: true,
            ..Default::default()
        });
        let result = RepositoryResolver::with_lookup(lookup).resolve(&RunContext::new(), &[npm("x")]);
        assert!(matches!(result, Err(TallyError::SourceQuery { .. })));
    }
}
