//! The main `scorecard-tally <BOM>` command.

use crate::bom;
use crate::config::TallyConfig;
use crate::context::RunContext;
use crate::error::{Result, TallyError};
use crate::generate::{ScoreCheck, ScoreGenerator, ScorecardCli};
use crate::model::ScoreOrigin;
use crate::output::write_results;
use crate::pipeline::{exit_codes, MergePolicy, Pipeline};
use crate::resolve::{DepsDevLookup, RepositoryResolver};
use crate::scorecard::{ScoreTable, WarehouseTable};
use crate::sources::TableScoreSource;
use crate::warehouse::{AccessToken, BigQueryClient, BigQueryConfig, Warehouse};
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Run the tally over the BOM at `bom_path` (or stdin for `-`), printing
/// results to stdout. Returns the process exit code.
#[allow(clippy::needless_pass_by_value)]
pub fn run_tally(config: TallyConfig, bom_path: &Path) -> anyhow::Result<i32> {
    config.preflight()?;

    let ctx = config
        .timeout()
        .map_or_else(RunContext::new, RunContext::with_timeout);
    ctx.cancel_on_interrupt();

    let packages = bom::read_packages_from_path(bom_path, config.input.format)?;
    tracing::info!(
        "Read {} packages from {}",
        packages.len(),
        bom_path.display()
    );

    let token = AccessToken::discover().context("authenticating to BigQuery")?;
    let warehouse: Arc<dyn Warehouse> = Arc::new(BigQueryClient::new(bigquery_config(&config), token)?);

    let check: Option<Arc<dyn ScoreCheck>> = config.generation.enabled.then(|| {
        let cli = config
            .generation
            .scorecard_bin
            .clone()
            .map_or_else(ScorecardCli::default, ScorecardCli::new)
            .with_args(config.generation.scorecard_args.clone());
        Arc::new(cli) as Arc<dyn ScoreCheck>
    });

    let pipeline = build_pipeline(&config, warehouse, check)?;
    let output = pipeline.run(&ctx, &packages)?;
    output.report.log_summary();

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    write_results(
        &mut handle,
        &output.results,
        config.output.format,
        config.output.all,
    )
    .context("writing results")?;

    Ok(exit_codes::SUCCESS)
}

/// Assemble the pipeline a configuration describes.
///
/// Sources apply in fixed precedence: the public snapshot fills gaps, then
/// the private table (if any) overwrites. Generation is added when `check`
/// is given; it needs the private table.
pub fn build_pipeline(
    config: &TallyConfig,
    warehouse: Arc<dyn Warehouse>,
    check: Option<Arc<dyn ScoreCheck>>,
) -> Result<Pipeline> {
    let sharding = config.warehouse.sharding();
    let resolver = RepositoryResolver::with_lookup(Arc::new(DepsDevLookup::new(Arc::clone(
        &warehouse,
    ))));

    let public = TableScoreSource::new(
        Arc::new(WarehouseTable::public_latest(Arc::clone(&warehouse))?),
        ScoreOrigin::PublicLatest,
    )
    .with_sharding(sharding);
    let mut pipeline = Pipeline::new(resolver).with_source(public, MergePolicy::FillGaps);

    let private = config
        .warehouse
        .private_table()
        .map(|reference| WarehouseTable::from_reference(Arc::clone(&warehouse), reference))
        .transpose()?
        .map(|table| Arc::new(table) as Arc<dyn ScoreTable>);

    if let Some(table) = &private {
        let source = TableScoreSource::new(Arc::clone(table), ScoreOrigin::PrivateTable)
            .with_sharding(sharding);
        pipeline = pipeline.with_source(source, MergePolicy::Overwrite);
    }

    match (check, private) {
        (Some(check), Some(table)) => {
            pipeline = pipeline.with_generator(ScoreGenerator::new(check, table));
        }
        (Some(_), None) => {
            return Err(TallyError::config(
                "generating scores requires a table to store them in (--table)",
            ));
        }
        (None, _) => {}
    }

    Ok(pipeline)
}

fn bigquery_config(config: &TallyConfig) -> BigQueryConfig {
    BigQueryConfig {
        project_id: config.warehouse.project().map(str::to_string),
        location: config.warehouse.location.clone(),
        timeout: Duration::from_secs(config.warehouse.request_timeout_secs),
        max_retries: config.warehouse.max_retries,
        ..BigQueryConfig::default()
    }
}
