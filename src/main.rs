use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

mod cli;

use cli::Cli;
use snapkeep::config::Config;
use snapkeep::domain::RunSummary;
use snapkeep::gateway::{AwsCliGateway, FixedDelay, Throttled};
use snapkeep::lifecycle::{Orchestrator, RunOptions};

fn setup_logging(verbose: bool, level: &str) -> Result<()> {
    let env = env_logger::Env::default().default_filter_or(level);
    let mut builder = env_logger::Builder::from_env(env);

    if verbose {
        builder.target(env_logger::Target::Stderr);
        builder.init();
        return Ok(());
    }

    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("snapkeep")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("snapkeep.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn print_plan(options: &RunOptions) {
    println!("{} {}", "Selected region:".green(), options.region);
    println!("{} {}", "Current date and time:".green(), chrono::Utc::now());
    for line in options.describe() {
        let line = if options.dry_run && line.starts_with("Dry run") {
            line.yellow()
        } else {
            line.normal()
        };
        println!("  {}", line);
    }
}

fn print_summary(summary: &RunSummary) {
    println!("{} snapshots deleted.", summary.snapshots_deleted.to_string().cyan());
    println!("{} volume snapshots created.", summary.volumes_snapshotted.to_string().cyan());
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    let region = config
        .resolve_region(cli.region.as_deref())
        .context("Failed to select region")?;
    let options = cli.run_options(region);
    let gateway = Throttled::new(
        AwsCliGateway::new(config.aws.cli_config(&options.region)),
        FixedDelay(config.aws.call_delay()),
    );
    let orchestrator = Orchestrator::new(Arc::new(gateway), options);
    print_plan(orchestrator.options());

    if orchestrator.options().stages().is_empty() {
        println!("{}", "Nothing to do: no backup or purge stage enabled".yellow());
        return Ok(());
    }

    let summary = orchestrator.run().await.context("Snapshot lifecycle run failed")?;
    print_summary(&summary);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    let level = config.log_level.clone().unwrap_or_else(|| "info".to_string());
    setup_logging(cli.is_verbose(), &level).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
