//! scorecard-tally: OpenSSF Scorecard scores for the packages in a BOM.

#![allow(clippy::needless_pass_by_value)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use scorecard_tally::{
    bom::BomFormat,
    cli,
    config::{load_or_default, TallyConfig},
    output::OutputFormat,
    pipeline::exit_codes,
};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "scorecard-tally")]
#[command(version)]
#[command(about = "Find OpenSSF Scorecard scores for the packages in a BOM", long_about = None)]
#[command(after_help = "EXIT CODES:
    0  Results printed
    1  Error occurred (nothing printed to stdout)

EXAMPLES:
    # Scores from the public dataset
    scorecard-tally -p my-project bom.cdx.json

    # Read a Syft document from stdin, every package, all columns
    syft -o json alpine:3 | scorecard-tally -p my-project -f syft-json -a -o wide -

    # Merge a private table and generate what is still missing
    GITHUB_TOKEN=... scorecard-tally -p my-project -t scores.scorecard -g bom.cdx.json")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    tally: TallyArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Arguments for the default tally command
#[derive(Args)]
struct TallyArgs {
    /// BOM file, or '-' for stdin
    bom: Option<PathBuf>,

    /// Project to bill warehouse queries to
    #[arg(short = 'p', long, env = "SCORECARD_TALLY_PROJECT")]
    project_id: Option<String>,

    /// BOM format
    #[arg(short, long, value_enum)]
    format: Option<BomFormat>,

    /// Output format
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Print packages without a score too
    #[arg(short, long)]
    all: bool,

    /// Private score table (dataset.table or project.dataset.table)
    #[arg(short, long)]
    table: Option<String>,

    /// Generate missing scores into --table (needs GITHUB_TOKEN)
    #[arg(short, long)]
    generate: bool,

    /// Repositories per warehouse query
    #[arg(long)]
    batch_size: Option<usize>,

    /// Concurrent warehouse queries
    #[arg(long)]
    max_parallel: Option<usize>,

    /// Overall deadline in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Path to the scorecard binary
    #[arg(long)]
    scorecard_bin: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show, discover, or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Sub-subcommands for the `config` command
#[derive(Subcommand)]
enum ConfigAction {
    /// Print current effective configuration (merged from defaults + file)
    Show,
    /// Print config file search paths and discovered config file
    Path,
    /// Write an example config file
    Init {
        /// Where to write it (default: user config directory)
        path: Option<PathBuf>,
    },
    /// Print the JSON Schema of the config file format
    Schema {
        /// Write schema to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl TallyArgs {
    /// Layer command line values over file configuration.
    fn apply(self, config: &mut TallyConfig) {
        if let Some(project) = self.project_id {
            config.warehouse.project_id = Some(project);
        }
        if let Some(format) = self.format {
            config.input.format = format;
        }
        if let Some(output) = self.output {
            config.output.format = output;
        }
        if self.all {
            config.output.all = true;
        }
        if let Some(table) = self.table {
            config.warehouse.table = Some(table);
        }
        if self.generate {
            config.generation.enabled = true;
        }
        if let Some(batch_size) = self.batch_size {
            config.warehouse.batch_size = batch_size;
        }
        if let Some(max_parallel) = self.max_parallel {
            config.warehouse.max_parallel = max_parallel;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = Some(timeout);
        }
        if let Some(bin) = self.scorecard_bin {
            config.generation.scorecard_bin = Some(bin);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; progress goes to stderr so stdout stays parseable
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .init();

    let exit_code = match cli.command {
        Some(Commands::Completions { shell }) => {
            generate(shell, &mut Cli::command(), "scorecard-tally", &mut io::stdout());
            exit_codes::SUCCESS
        }

        Some(Commands::Config { action }) => match action {
            ConfigAction::Show => cli::run_config_show(cli.config.as_deref())?,
            ConfigAction::Path => cli::run_config_path(cli.config.as_deref())?,
            ConfigAction::Init { path } => cli::run_config_init(path)?,
            ConfigAction::Schema { output } => cli::run_config_schema(output.as_deref())?,
        },

        None => {
            let Some(bom) = cli.tally.bom.clone() else {
                Cli::command()
                    .error(
                        clap::error::ErrorKind::MissingRequiredArgument,
                        "a BOM path (or '-' for stdin) is required",
                    )
                    .exit();
            };

            let (mut config, loaded_from) =
                load_or_default(cli.config.as_deref()).context("loading configuration")?;
            if let Some(path) = loaded_from {
                tracing::debug!("Using config file {}", path.display());
            }
            cli.tally.apply(&mut config);
            config.generation.load_token_from_env();

            cli::run_tally(config, &bom)?
        }
    };

    if exit_code != exit_codes::SUCCESS {
        std::process::exit(exit_code);
    }
    Ok(())
}
