//! BOM reading and rendering tests over real fixture files.

use chrono::NaiveDate;
use scorecard_tally::bom::{read_packages, read_packages_from_path, BomFormat};
use scorecard_tally::context::RunContext;
use scorecard_tally::error::TallyError;
use scorecard_tally::model::{Package, PackageType};
use scorecard_tally::output::{write_results, OutputFormat};
use scorecard_tally::pipeline::{MergePolicy, Pipeline};
use scorecard_tally::resolve::RepositoryResolver;
use scorecard_tally::scorecard::{MemoryTable, ScoreRow, ScoreTable, TableRef};
use scorecard_tally::sources::TableScoreSource;
use scorecard_tally::ScoreOrigin;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ============================================================================
// Test Fixtures
// ============================================================================

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture_path(name: &str) -> PathBuf {
    Path::new(FIXTURES_DIR).join(name)
}

// ============================================================================
// Reading
// ============================================================================

mod reading {
    use super::*;

    #[test]
    fn cyclonedx_fixture() {
        let packages = read_packages_from_path(
            &fixture_path("cyclonedx/sample.cdx.json"),
            BomFormat::CycloneDxJson,
        )
        .expect("fixture should parse");

        assert_eq!(
            packages,
            vec![
                Package::new(PackageType::Golang, "github.com/sirupsen/logrus", "v1.9.3"),
                Package::new(PackageType::Maven, "com.google.guava:guava", "32.1.2-jre"),
                Package::new(PackageType::Pypi, "flask-sqlalchemy", "3.1.1"),
                Package::new(PackageType::Npm, "express", "4.18.2"),
                Package::new(PackageType::Npm, "body-parser", "1.20.1"),
            ]
        );
    }

    #[test]
    fn syft_fixture() {
        let packages =
            read_packages_from_path(&fixture_path("syft/sample.syft.json"), BomFormat::SyftJson)
                .expect("fixture should parse");

        assert_eq!(
            packages,
            vec![
                Package::new(PackageType::Cargo, "serde", "1.0.193"),
                Package::new(PackageType::Golang, "golang.org/x/net", "v0.17.0"),
                Package::new(PackageType::Nuget, "Newtonsoft.Json", "13.0.3"),
            ]
        );
    }

    #[test]
    fn wrong_format_reads_nothing() {
        // A Syft document has no `components`; a CycloneDX one has no `artifacts`
        let packages = read_packages_from_path(
            &fixture_path("syft/sample.syft.json"),
            BomFormat::CycloneDxJson,
        )
        .unwrap();
        assert!(packages.is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_packages_from_path(
            &fixture_path("does-not-exist.json"),
            BomFormat::CycloneDxJson,
        )
        .unwrap_err();
        assert!(matches!(err, TallyError::Io { .. }), "got {err:?}");
    }

    #[test]
    fn malformed_purls_are_skipped() {
        let bom = r#"{"components": [
            {"name": "x", "purl": "not a purl"},
            {"name": "y", "purl": "pkg:npm/ok@1.0.0"}
        ]}"#;
        let packages = read_packages(bom.as_bytes(), BomFormat::CycloneDxJson).unwrap();
        assert_eq!(packages, vec![Package::new(PackageType::Npm, "ok", "1.0.0")]);
    }
}

// ============================================================================
// End to end
// ============================================================================

mod end_to_end {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn tally(all: bool, format: OutputFormat) -> String {
        let packages = read_packages_from_path(
            &fixture_path("cyclonedx/sample.cdx.json"),
            BomFormat::CycloneDxJson,
        )
        .unwrap();

        let public: Arc<dyn ScoreTable> = Arc::new(
            MemoryTable::new(TableRef::new("openssf", "scorecardcron", "scorecard-v2_latest"))
                .with_rows([ScoreRow::new("github.com/sirupsen/logrus", 6.4, day(2))]),
        );
        let output = Pipeline::new(RepositoryResolver::derive_only())
            .with_source(
                TableScoreSource::new(public, ScoreOrigin::PublicLatest),
                MergePolicy::FillGaps,
            )
            .run(&RunContext::new(), &packages)
            .unwrap();

        let mut buf = Vec::new();
        write_results(&mut buf, &output.results, format, all).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn short_output_lists_scored_repositories() {
        let out = tally(false, OutputFormat::Short);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2, "{out}");
        assert!(lines[0].starts_with("REPOSITORY"));
        assert!(lines[1].starts_with("github.com/sirupsen/logrus"));
        assert!(lines[1].ends_with("6.4"));
    }

    #[test]
    fn all_includes_unscored_packages() {
        let out = tally(true, OutputFormat::Wide);
        // header + five packages
        assert_eq!(out.lines().count(), 6, "{out}");
        assert!(out.contains("com.google.guava:guava"));
        assert!(out.contains("public-latest"));
    }

    #[test]
    fn json_output_is_an_array() {
        let out = tally(false, OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["repository"], "github.com/sirupsen/logrus");
        assert_eq!(items[0]["source"], "public-latest");
        assert_eq!(items[0]["package"]["type"], "golang");
    }
}
