//! Configuration file loading and discovery.

use super::types::TallyConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Configuration File Discovery
// ============================================================================

/// Standard config file names to search for.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    ".scorecard-tally.yaml",
    ".scorecard-tally.yml",
    "scorecard-tally.yaml",
];

/// Directory under the user config dir that may hold a config file.
const CONFIG_DIR_NAME: &str = "scorecard-tally";

/// Discover a config file by searching standard locations.
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Current directory
/// 3. Git repository root (if in a repo)
/// 4. User config directory (~/.config/scorecard-tally/)
/// 5. Home directory
#[must_use]
pub fn discover_config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    let cwd = std::env::current_dir().ok();
    let candidates = [
        cwd.clone(),
        cwd.as_deref().and_then(find_git_root),
        dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME)),
        dirs::home_dir(),
    ];

    candidates
        .iter()
        .flatten()
        .find_map(|dir| find_config_in_dir(dir))
}

/// Find a config file in a specific directory.
#[must_use]
pub fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Find the git repository root by walking up from `start`.
fn find_git_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

/// Default location for `config init`.
#[must_use]
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(CONFIG_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_FILE_NAMES[0])
}

// ============================================================================
// Configuration File Loading
// ============================================================================

/// Error type for config file operations.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Load a [`TallyConfig`] from a YAML file.
pub fn load_config_file(path: &Path) -> Result<TallyConfig, ConfigFileError> {
    if !path.exists() {
        return Err(ConfigFileError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(TallyConfig::default());
    }
    Ok(serde_yaml::from_str(&content)?)
}

/// Load the explicit or discovered config file.
///
/// An explicit path that does not exist is an error; a discovered file that
/// fails to parse is also an error, so a typo never silently falls back to
/// defaults. With no file anywhere, defaults are returned.
pub fn load_or_default(
    explicit_path: Option<&Path>,
) -> Result<(TallyConfig, Option<PathBuf>), ConfigFileError> {
    if let Some(path) = explicit_path {
        return load_config_file(path).map(|config| (config, Some(path.to_path_buf())));
    }

    match discover_config_file(None) {
        Some(path) => {
            tracing::debug!("Loading config from {}", path.display());
            let config = load_config_file(&path)?;
            Ok((config, Some(path)))
        }
        None => Ok((TallyConfig::default(), None)),
    }
}

/// An annotated example configuration file.
#[must_use]
pub fn generate_example_config() -> String {
    r"# scorecard-tally configuration
#
# Command line flags override every value here.

input:
  # cyclonedx-json | syft-json
  format: cyclonedx-json

warehouse:
  # Billing project for queries (or SCORECARD_TALLY_PROJECT)
  # project_id: my-project
  # location: US
  # Private score table: dataset.table or project.dataset.table
  # table: scores.scorecard
  batch_size: 5000
  max_parallel: 4
  request_timeout_secs: 60
  max_retries: 3

generation:
  # Needs GITHUB_TOKEN and warehouse.table
  enabled: false
  # scorecard_bin: /usr/local/bin/scorecard

output:
  # short | wide | json
  format: short
  all: false
"
    .to_string()
}
