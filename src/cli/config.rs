//! `config` subcommand handlers.

use crate::config::{
    default_config_path, discover_config_file, generate_example_config, generate_json_schema,
    load_or_default, file::CONFIG_FILE_NAMES,
};
use crate::pipeline::exit_codes;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Print the effective configuration (defaults merged with the config file).
pub fn run_config_show(explicit: Option<&Path>) -> anyhow::Result<i32> {
    let (config, loaded_from) = load_or_default(explicit)?;
    match &loaded_from {
        Some(path) => eprintln!("# Loaded from: {}", path.display()),
        None => eprintln!("# No config file found; showing defaults"),
    }
    let yaml = serde_yaml::to_string(&config).context("failed to serialize config")?;
    print!("{yaml}");
    Ok(exit_codes::SUCCESS)
}

/// Print the config file search paths and the file that would be used.
pub fn run_config_path(explicit: Option<&Path>) -> anyhow::Result<i32> {
    let search_paths: [Option<String>; 3] = [
        std::env::current_dir()
            .ok()
            .map(|p| p.display().to_string()),
        dirs::config_dir().map(|p| p.join("scorecard-tally").display().to_string()),
        dirs::home_dir().map(|p| p.display().to_string()),
    ];
    eprintln!("Config file search paths (in order, plus the git root):");
    for path in search_paths.into_iter().flatten() {
        eprintln!("  {path}");
    }
    eprintln!();
    eprintln!("Recognized file names:");
    for name in CONFIG_FILE_NAMES {
        eprintln!("  {name}");
    }
    eprintln!();
    match discover_config_file(explicit) {
        Some(path) => println!("{}", path.display()),
        None => eprintln!("No config file found."),
    }
    Ok(exit_codes::SUCCESS)
}

/// Write an example config file, refusing to overwrite an existing one.
pub fn run_config_init(target: Option<PathBuf>) -> anyhow::Result<i32> {
    let target = target.unwrap_or_else(default_config_path);
    if target.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first to re-initialize.",
            target.display()
        );
    }
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&target, generate_example_config())
        .with_context(|| format!("failed to write {}", target.display()))?;
    eprintln!("Created {}", target.display());
    Ok(exit_codes::SUCCESS)
}

/// Print (or write) the JSON Schema of the config file.
pub fn run_config_schema(output: Option<&Path>) -> anyhow::Result<i32> {
    let schema = generate_json_schema()?;
    match output {
        Some(path) => {
            std::fs::write(path, &schema)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Schema written to {}", path.display());
        }
        None => println!("{schema}"),
    }
    Ok(exit_codes::SUCCESS)
}
