//! TWAMM pool simulator - replays a scenario file against an in-memory custodian
//!
//! Usage:
//!   twamm-simulator --pool-config config/pool.toml --scenario services/simulator/scenarios/single_order.toml
//!   twamm-simulator --pool-config config/pool.toml --scenario scenario.toml --fail-fast --json-logs

mod scenario;

use anyhow::{Context, Result};
use clap::Parser;
use scenario::{Scenario, ScenarioRunner};
use serde_json::json;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use twamm_config::PoolConfig;
use twamm_pool::TwammPool;

#[derive(Parser, Debug)]
#[command(name = "twamm-simulator")]
#[command(about = "Replay TWAMM pool scenarios against an in-memory custodian")]
#[command(version)]
struct Args {
    /// Path to pool configuration file
    #[arg(short, long)]
    pool_config: PathBuf,

    /// Path to scenario file
    #[arg(short, long)]
    scenario: PathBuf,

    /// Stop at the first rejected step
    #[arg(long)]
    fail_fast: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    info!("Starting TWAMM simulator");
    info!("Pool configuration: {:?}", args.pool_config);

    let config = PoolConfig::load(&args.pool_config).map_err(|e| {
        error!("Failed to load pool configuration: {:#}", e);
        e
    })?;
    let scenario = Scenario::load(&args.scenario)?;
    info!(
        "Loaded scenario {:?}: {} accounts, {} steps",
        args.scenario,
        scenario.accounts.len(),
        scenario.steps.len()
    );

    let pool = TwammPool::from_config(&config, scenario.start_block)
        .context("Invalid pool configuration")?;
    let mut runner = ScenarioRunner::new(pool, &scenario)?;
    let records = runner.run(&scenario.steps, args.fail_fast)?;

    let rejected = records.iter().filter(|record| !record.succeeded()).count();
    info!(
        "Replayed {} steps ({} rejected), final block {}",
        records.len(),
        rejected,
        runner.simulation().block()
    );

    let report = json!({
        "steps": records,
        "final": runner.state()?,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    // RUST_LOG takes precedence over --log-level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string().to_lowercase()));

    // logs go to stderr so stdout stays a clean JSON report
    if args.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    Ok(())
}
