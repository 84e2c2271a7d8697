//! Package identities extracted from a BOM.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Package ecosystems the repository lookup understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    Cargo,
    Golang,
    Maven,
    Npm,
    Nuget,
    Pypi,
}

impl PackageType {
    /// Map a package URL type to a supported ecosystem.
    #[must_use]
    pub fn from_purl_type(purl_type: &str) -> Option<Self> {
        match purl_type.to_lowercase().as_str() {
            "cargo" => Some(Self::Cargo),
            "golang" | "go" => Some(Self::Golang),
            "maven" => Some(Self::Maven),
            "npm" => Some(Self::Npm),
            "nuget" => Some(Self::Nuget),
            "pypi" => Some(Self::Pypi),
            _ => None,
        }
    }

    /// The system name used by the deps.dev dataset.
    #[must_use]
    pub const fn deps_dev_system(&self) -> &'static str {
        match self {
            Self::Cargo => "CARGO",
            Self::Golang => "GO",
            Self::Maven => "MAVEN",
            Self::Npm => "NPM",
            Self::Nuget => "NUGET",
            Self::Pypi => "PYPI",
        }
    }

    /// Inverse of [`PackageType::deps_dev_system`].
    #[must_use]
    pub fn from_deps_dev_system(system: &str) -> Option<Self> {
        Self::from_purl_type(system)
    }

    /// Lowercase name, as written in package URLs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cargo => "cargo",
            Self::Golang => "golang",
            Self::Maven => "maven",
            Self::Npm => "npm",
            Self::Nuget => "nuget",
            Self::Pypi => "pypi",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_purl_type(s).ok_or_else(|| format!("unsupported package type: {s}"))
    }
}

/// A package listed in a BOM.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Package {
    #[serde(rename = "type")]
    pub package_type: PackageType,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

impl Package {
    /// Create a package.
    pub fn new(
        package_type: PackageType,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            package_type,
            name: name.into(),
            version: version.into(),
        }
    }

    /// The repository implied by the package name, when the ecosystem's
    /// naming convention embeds it.
    ///
    /// Go modules hosted on GitHub carry `github.com/<owner>/<repo>` as their
    /// first three path segments.
    #[must_use]
    pub fn derived_repository(&self) -> Option<String> {
        if self.package_type != PackageType::Golang || !self.name.starts_with("github.com/") {
            return None;
        }
        let segments: Vec<&str> = self.name.split('/').take(3).collect();
        if segments.len() < 3 || segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        Some(segments.join("/"))
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            write!(f, "{}/{}", self.package_type, self.name)
        } else {
            write!(f, "{}/{}@{}", self.package_type, self.name, self.version)
        }
    }
}
