//! Package extraction from BOM documents.
//!
//! Only the package URLs matter here: each supported document is reduced to
//! the ordered, deduplicated list of [`Package`]s in ecosystems the
//! repository lookup understands. Everything else in the document is
//! ignored.

mod purl;

pub use purl::package_from_purl;

use crate::error::{ErrorContext, FormatErrorKind, Result, TallyError};
use crate::model::Package;
use clap::ValueEnum;
use indexmap::IndexSet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Supported BOM document formats
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum BomFormat {
    /// CycloneDX JSON
    #[default]
    #[serde(rename = "cyclonedx-json")]
    #[value(name = "cyclonedx-json")]
    CycloneDxJson,
    /// Syft native JSON
    #[value(name = "syft-json")]
    SyftJson,
}

impl fmt::Display for BomFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CycloneDxJson => write!(f, "cyclonedx-json"),
            Self::SyftJson => write!(f, "syft-json"),
        }
    }
}

impl FromStr for BomFormat {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cyclonedx-json" => Ok(Self::CycloneDxJson),
            "syft-json" => Ok(Self::SyftJson),
            other => Err(TallyError::format(
                "selecting BOM format",
                FormatErrorKind::UnknownBomFormat(other.to_string()),
            )),
        }
    }
}

// ============================================================================
// Document structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct CycloneDxBom {
    #[serde(default)]
    components: Vec<CdxComponent>,
}

#[derive(Debug, Deserialize)]
struct CdxComponent {
    purl: Option<String>,
    version: Option<String>,
    #[serde(default)]
    components: Vec<CdxComponent>,
}

#[derive(Debug, Deserialize)]
struct SyftDocument {
    #[serde(default)]
    artifacts: Vec<SyftArtifact>,
}

#[derive(Debug, Deserialize)]
struct SyftArtifact {
    purl: Option<String>,
    version: Option<String>,
}

// ============================================================================
// Reading
// ============================================================================

/// Read packages from a BOM document.
pub fn read_packages<R: Read>(reader: R, format: BomFormat) -> Result<Vec<Package>> {
    let mut packages = IndexSet::new();
    match format {
        BomFormat::CycloneDxJson => {
            let bom: CycloneDxBom =
                serde_json::from_reader(reader).context("parsing CycloneDX JSON")?;
            collect_cyclonedx(&bom.components, &mut packages);
        }
        BomFormat::SyftJson => {
            let doc: SyftDocument = serde_json::from_reader(reader).context("parsing Syft JSON")?;
            for artifact in &doc.artifacts {
                add_purl(artifact.purl.as_deref(), artifact.version.as_deref(), &mut packages);
            }
        }
    }

    tracing::debug!("Read {} supported packages from {} BOM", packages.len(), format);
    Ok(packages.into_iter().collect())
}

/// Read packages from a file, or stdin when `path` is `-`.
pub fn read_packages_from_path(path: &Path, format: BomFormat) -> Result<Vec<Package>> {
    if path.as_os_str() == "-" {
        return read_packages(std::io::stdin().lock(), format);
    }
    let file = std::fs::File::open(path).map_err(|e| TallyError::io(path, e))?;
    read_packages(std::io::BufReader::new(file), format)
        .with_context(|| format!("reading {}", path.display()))
}

fn collect_cyclonedx(components: &[CdxComponent], packages: &mut IndexSet<Package>) {
    for component in components {
        add_purl(component.purl.as_deref(), component.version.as_deref(), packages);
        collect_cyclonedx(&component.components, packages);
    }
}

fn add_purl(purl: Option<&str>, version: Option<&str>, packages: &mut IndexSet<Package>) {
    if let Some(package) = purl.and_then(|p| package_from_purl(p, version)) {
        packages.insert(package);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PackageType;

    #[test]
    fn test_cyclonedx_nested_components_in_order() {
        let bom = r#"{
            "bomFormat": "CycloneDX",
            "specVersion": "1.5",
            "components": [
                {"type": "library", "name": "lodash", "purl": "pkg:npm/lodash@4.17.21"},
                {"type": "library", "name": "curl", "purl": "pkg:deb/debian/curl@7.68.0"},
                {"type": "library", "name": "no-purl"},
                {"type": "library", "name": "app", "purl": "pkg:pypi/requests@2.31.0",
                 "components": [
                    {"type": "library", "name": "inner", "purl": "pkg:golang/github.com/a/b@v1.0.0"}
                 ]},
                {"type": "library", "name": "lodash", "purl": "pkg:npm/lodash@4.17.21"}
            ]
        }"#;
        let packages = read_packages(bom.as_bytes(), BomFormat::CycloneDxJson).unwrap();
        let names: Vec<_> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["lodash", "requests", "github.com/a/b"]);
        assert_eq!(packages[1].package_type, PackageType::Pypi);
    }

    #[test]
    fn test_syft_artifacts() {
        let doc = r#"{
            "artifacts": [
                {"name": "serde", "version": "1.0.0", "type": "rust-crate", "purl": "pkg:cargo/serde@1.0.0"},
                {"name": "Newtonsoft.Json", "version": "13.0.1", "purl": "pkg:nuget/Newtonsoft.Json"}
            ],
            "source": {},
            "distro": {}
        }"#;
        let packages = read_packages(doc.as_bytes(), BomFormat::SyftJson).unwrap();
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[1].version, "13.0.1");
    }

    #[test]
    fn test_empty_documents() {
        assert!(read_packages("{}".as_bytes(), BomFormat::CycloneDxJson)
            .unwrap()
            .is_empty());
        assert!(read_packages("{}".as_bytes(), BomFormat::SyftJson)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_invalid_json_is_format_error() {
        let err = read_packages("{not json".as_bytes(), BomFormat::CycloneDxJson).unwrap_err();
        match err {
            TallyError::Format {
                context,
                source: FormatErrorKind::InvalidJson(_),
            } => assert!(context.starts_with("parsing CycloneDX JSON"), "{context}"),
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(
            "syft-json".parse::<BomFormat>().unwrap(),
            BomFormat::SyftJson
        );
        assert!(matches!(
            "spdx-json".parse::<BomFormat>(),
            Err(TallyError::Format {
                source: FormatErrorKind::UnknownBomFormat(_),
                ..
            })
        ));
        assert_eq!(BomFormat::default().to_string(), "cyclonedx-json");
    }
}
