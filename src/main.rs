use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;
use polaris_audit::config::{parse_date, HarnessConfig};
use polaris_audit::engine::EngineBridge;
use polaris_audit::orchestrator::{Orchestrator, RunOptions, SilentReporter};
use polaris_audit::report::ConsoleReporter;
use std::path::PathBuf;
use std::sync::Arc;

/// Polaris Audit: global Maghrib stress test for the Polaris engine.
///
/// Samples 30 cities deterministically from the run date, sweeps them for
/// today and the solstices, re-checks a few under the strict strategy and
/// fuzzes random coordinates. Exits 1 if any check FAILs.
///
/// Examples:
///   polaris-audit
///   polaris-audit --engine ./target/release/polaris --today 2026-03-20
///   polaris-audit --seed "2026-02-14polaris" --skip-fuzz
///   polaris-audit --json > audit.json
#[derive(Parser)]
#[command(name = "polaris-audit", version, about, long_about = None)]
struct Cli {
    /// Path to the engine binary. Overrides the config file.
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Config file (JSON). Defaults to ~/.polaris/audit.json when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of cities to sample.
    #[arg(long)]
    cities: Option<usize>,

    /// Number of fuzz samples.
    #[arg(long)]
    fuzz_samples: Option<usize>,

    /// Date for the "today" sweep (YYYY-MM-DD). Defaults to the local date.
    #[arg(long, value_parser = parse_today)]
    today: Option<NaiveDate>,

    /// Full seed string. Defaults to the run date followed by the salt.
    #[arg(long)]
    seed: Option<String>,

    /// Print the run summary as JSON instead of the console report.
    #[arg(long)]
    json: bool,

    /// Skip the coordinate fuzz phase.
    #[arg(long)]
    skip_fuzz: bool,
}

fn parse_today(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = HarnessConfig::load(cli.config.as_deref()).context("loading harness config")?;
    if let Some(engine) = cli.engine {
        config.engine = engine;
    }
    if let Some(n) = cli.cities {
        config.selection.target_count = n;
    }
    if let Some(n) = cli.fuzz_samples {
        config.fuzz.samples = n;
    }

    let bridge = EngineBridge::new(config.engine.clone()).with_timeouts(config.timeouts());
    log::info!("engine binary: {}", bridge.binary().display());

    let options = RunOptions {
        today: cli.today.unwrap_or_else(|| Local::now().date_naive()),
        seed: cli.seed,
        fuzz: !cli.skip_fuzz,
    };

    let orchestrator = Orchestrator::new(Arc::new(bridge), config);
    let summary = if cli.json {
        let summary = orchestrator.run(&options, &mut SilentReporter).await;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        summary
    } else {
        orchestrator.run(&options, &mut ConsoleReporter).await
    };

    std::process::exit(summary.exit_code());
}
