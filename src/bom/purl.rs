//! Package URL → [`Package`] mapping.
//!
//! Names are rewritten into the form the deps.dev dataset uses for each
//! system, so that lookups match without further normalization.

use crate::model::{Package, PackageType};
use packageurl::PackageUrl;
use std::str::FromStr;

/// Convert a package URL into a supported package.
///
/// Returns `None` for malformed URLs and for ecosystems the repository
/// lookup does not cover. `fallback_version` is used when the URL carries
/// no version.
pub fn package_from_purl(purl: &str, fallback_version: Option<&str>) -> Option<Package> {
    let parsed = match PackageUrl::from_str(purl) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!("Skipping malformed package URL '{}': {}", purl, e);
            return None;
        }
    };

    let package_type = PackageType::from_purl_type(parsed.ty())?;
    let namespace = parsed.namespace().filter(|ns| !ns.is_empty());
    let name = parsed.name();

    let name = match (package_type, namespace) {
        (PackageType::Maven, Some(group)) => format!("{group}:{name}"),
        (PackageType::Npm | PackageType::Golang, Some(ns)) => format!("{ns}/{name}"),
        (PackageType::Pypi, _) => normalize_pypi_name(name),
        (_, _) => name.to_string(),
    };
    if name.is_empty() {
        return None;
    }

    let version = parsed
        .version()
        .or(fallback_version)
        .unwrap_or_default()
        .to_string();

    Some(Package::new(package_type, name, version))
}

/// PEP 503 normalization: lowercase, runs of `-`, `_`, `.` become `-`.
fn normalize_pypi_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                normalized.push('-');
            }
            in_separator = true;
        } else {
            normalized.extend(c.to_lowercase());
            in_separator = false;
        }
    }
    normalized
}
