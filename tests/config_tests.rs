//! Configuration loading and preflight tests.

use scorecard_tally::bom::BomFormat;
use scorecard_tally::config::{
    load_config_file, load_or_default, ConfigFileError, TallyConfig, Validatable,
};
use scorecard_tally::error::TallyError;
use scorecard_tally::output::OutputFormat;
use std::path::Path;

fn write_config(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join(".scorecard-tally.yaml");
    std::fs::write(&path, content).unwrap();
    path
}

fn runnable() -> TallyConfig {
    let mut config = TallyConfig::default();
    config.warehouse.project_id = Some("billing-project".to_string());
    config
}

// ============================================================================
// Loading
// ============================================================================

mod loading {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "input:\n  format: syft-json\nwarehouse:\n  project_id: p\n  table: d.t\noutput:\n  format: wide\n",
        );

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.input.format, BomFormat::SyftJson);
        assert_eq!(config.warehouse.project(), Some("p"));
        assert_eq!(config.warehouse.private_table(), Some("d.t"));
        assert_eq!(config.warehouse.batch_size, 5000);
        assert_eq!(config.output.format, OutputFormat::Wide);
        assert!(!config.output.all);
    }

    #[test]
    fn empty_file_is_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "\n");
        let config = load_config_file(&path).unwrap();
        assert_eq!(config.warehouse.max_parallel, 4);
    }

    #[test]
    fn explicit_path_is_reported_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "timeout_secs: 30\n");
        let (config, loaded_from) = load_or_default(Some(&path)).unwrap();
        assert_eq!(loaded_from.as_deref(), Some(path.as_path()));
        assert_eq!(config.timeout_secs, Some(30));
    }

    #[test]
    fn bad_value_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "output:\n  format: xml\n");
        assert!(matches!(
            load_config_file(&path),
            Err(ConfigFileError::Parse(_))
        ));
    }

    #[test]
    fn token_in_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "generation:\n  enabled: true\n  github_token: nope\n");
        let config = load_config_file(&path).unwrap();
        assert!(config.generation.enabled);
        assert!(!config.generation.has_token());
    }
}

// ============================================================================
// Preflight
// ============================================================================

mod preflight {
    use super::*;

    #[test]
    fn minimal_config_passes() {
        assert!(runnable().preflight().is_ok());
    }

    #[test]
    fn missing_project_fails() {
        let err = TallyConfig::default().preflight().unwrap_err();
        assert!(matches!(err, TallyError::Config(_)));
        assert!(err.to_string().contains("project"));
    }

    #[test]
    fn invalid_values_are_all_reported() {
        let mut config = runnable();
        config.warehouse.batch_size = 0;
        config.warehouse.max_parallel = 0;
        config.warehouse.table = Some("too.many.parts.here".to_string());

        let errors = config.validate();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "warehouse.batch_size",
                "warehouse.max_parallel",
                "warehouse.table"
            ]
        );
        assert!(config.preflight().is_err());
    }

    #[test]
    fn generation_needs_a_table() {
        let mut config = runnable();
        config.generation.enabled = true;
        config.generation.github_token = Some("ghp_token".to_string());

        let err = config.preflight().unwrap_err();
        assert!(err.to_string().contains("--table"), "{err}");

        config.warehouse.table = Some("scores.scorecard".to_string());
        assert!(config.preflight().is_ok());
    }

    #[test]
    fn generation_needs_a_token() {
        let mut config = runnable();
        config.generation.enabled = true;
        config.warehouse.table = Some("scores.scorecard".to_string());

        let err = config.preflight().unwrap_err();
        assert!(err.to_string().contains("GITHUB_TOKEN"), "{err}");
    }
}
