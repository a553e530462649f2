#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the NBA scoreboard ingestion tool.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use nba_stats_cli_utils::IndicatifProgress;
use nba_stats_ingest::config::{AppConfig, MappingConfig};
use nba_stats_ingest::{RunPlan, Stores, run};
use nba_stats_scoreboard::stats_api::StatsApiClient;

#[derive(Parser)]
#[command(
    name = "nba_stats_ingest",
    about = "NBA scoreboard ingestion tool",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, merge, and upload scoreboard data (the default)
    Run(RunArgs),
    /// List configured upload batches
    Batches,
    /// List item to table mappings
    Items,
}

#[derive(Args, Clone, Default)]
struct RunArgs {
    /// First day to fetch (YYYY-MM-DD). Defaults to yesterday.
    #[arg(long = "NBA_STARTDATE", alias = "start-date", value_name = "YYYY-MM-DD")]
    start_date: Option<NaiveDate>,
    /// Last day to fetch (YYYY-MM-DD). Defaults to yesterday.
    #[arg(long = "NBA_ENDDATE", alias = "end-date", value_name = "YYYY-MM-DD")]
    end_date: Option<NaiveDate>,
    /// Batch to upload (overrides `NBA_BATCH`)
    #[arg(long)]
    batch: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = nba_stats_cli_utils::init_logger();
    let cli = Cli::parse();
    let mapping = MappingConfig::embedded()?;

    match cli.command.unwrap_or(Commands::Run(cli.run)) {
        Commands::Batches => {
            println!("{:<16} ITEMS", "BATCH");
            println!("{}", "-".repeat(60));
            for (name, items) in mapping.batches() {
                println!("{name:<16} {}", items.join(", "));
            }
        }
        Commands::Items => {
            println!("{:<26} {:<22} ACTION", "ITEM", "TABLE");
            println!("{}", "-".repeat(60));
            for m in mapping.items() {
                println!("{:<26} {:<22} {}", m.item, m.table, m.action);
            }
            println!(
                "{:<26} {:<22} {}",
                "(monitor)", mapping.monitor.table, mapping.monitor.action
            );
        }
        Commands::Run(args) => {
            let config = AppConfig::from_env()?;
            log::info!("Running app: {}", config.app_name);
            for key in config.extra.keys() {
                log::info!("Extra config variable: {key}");
            }

            if args.start_date.is_none() && args.end_date.is_none() {
                log::info!("Defaulting to yesterday as start and end date.");
            }

            let plan = RunPlan::new(
                &config,
                &mapping,
                args.batch.as_deref(),
                args.start_date.map(Into::into),
                args.end_date.map(Into::into),
            )?;
            let provider = StatsApiClient::new()?;
            let mut stores = Stores::open(&config)?;
            let progress = IndicatifProgress::days_bar(&multi, "Fetching scoreboards");

            let summary = run(&provider, &mut stores, &plan, progress).await?;
            if summary.failed > 0 {
                log::warn!(
                    "{} of {} upload(s) failed; see the {} table",
                    summary.failed,
                    summary.uploaded,
                    plan.monitor.table
                );
            }
        }
    }

    Ok(())
}
