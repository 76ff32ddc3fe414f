use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;

use backcast::config::RunConfig;
use backcast::ensemble::run_sweep;
use backcast::impute::DeathEvent;
use backcast::output::{create_timestamped_output_dir, write_run_artifacts};

#[derive(Debug, Parser)]
#[command(author, version, about = "Outbreak size back-calculation from death reports")]
struct Cli {
    /// TOML run configuration; defaults describe one death reported today
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output base directory
    #[arg(long, default_value = "output-backcast")]
    outdir: PathBuf,

    /// Evaluation date (YYYY-MM-DD)
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Deaths reported on the evaluation date (replaces configured deaths)
    #[arg(long)]
    deaths: Option<u32>,

    /// Monte Carlo iterations per (R, CFR) combination
    #[arg(long)]
    n_sim: Option<usize>,

    /// Base random seed
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => RunConfig::from_toml_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RunConfig::default(),
    };
    if let Some(v) = cli.today {
        cfg.today = v;
    }
    if let Some(v) = cli.deaths {
        cfg.deaths = vec![DeathEvent {
            date: cfg.today,
            deaths: v,
        }];
    }
    if let Some(v) = cli.n_sim {
        cfg.n_sim = v;
    }
    if let Some(v) = cli.seed {
        cfg.seed = v;
    }

    let result = run_sweep(&cfg)?;

    let output_dir = create_timestamped_output_dir(&cli.outdir)?;
    write_run_artifacts(&output_dir, &cfg, &result)?;

    println!(
        "Circulating infections by {} ({} deaths reported, {} iterations per combination)",
        cfg.today,
        cfg.effective_deaths()
            .iter()
            .map(|d| u64::from(d.deaths))
            .sum::<u64>(),
        cfg.n_sim
    );
    println!(
        "{:>5} {:>6} {:>9} {:>9} {:>9} {:>9} {:>9}",
        "R", "cfr", "average", "lower_95", "lower_50", "upper_50", "upper_95"
    );
    for row in &result.rows {
        println!(
            "{:>5.2} {:>6.3} {:>9} {:>9} {:>9} {:>9} {:>9}",
            row.r, row.cfr, row.average, row.lower_95, row.lower_50, row.upper_50, row.upper_95
        );
    }
    for failure in &result.failures {
        println!(
            "R={:.2} cfr={:.3} failed: {}",
            failure.r, failure.cfr, failure.error
        );
    }
    println!("Run directory: {}", output_dir.display());

    Ok(())
}
