//! Run artifacts: timestamped output directories, summary tables, run manifest.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::Writer;
use serde::Serialize;

use crate::config::RunConfig;
use crate::ensemble::{SweepFailure, SweepResult};
use crate::summary::SummaryRow;
use crate::BackcastError;

/// Manifest written alongside the tables so a run can be re-created.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub generated_utc: String,
    pub config: RunConfig,
    pub n_combinations: usize,
    pub n_failures: usize,
}

pub fn create_timestamped_output_dir(base: &Path) -> Result<PathBuf, BackcastError> {
    fs::create_dir_all(base)?;

    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let mut output_dir = base.join(&timestamp);
    let mut counter = 1_u32;

    while output_dir.exists() {
        output_dir = base.join(format!("{timestamp}-{counter:02}"));
        counter += 1;
    }

    fs::create_dir_all(&output_dir)?;
    Ok(output_dir)
}

pub fn write_summary_csv(path: &Path, rows: &[SummaryRow]) -> Result<(), BackcastError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record([
        "R",
        "cfr",
        "average",
        "lower_95",
        "lower_50",
        "upper_50",
        "upper_95",
    ])?;

    for row in rows {
        writer.write_record([
            format!("{:.3}", row.r),
            format!("{:.4}", row.cfr),
            row.average.to_string(),
            row.lower_95.to_string(),
            row.lower_50.to_string(),
            row.upper_50.to_string(),
            row.upper_95.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_failures_csv(path: &Path, failures: &[SweepFailure]) -> Result<(), BackcastError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["R", "cfr", "error"])?;

    for failure in failures {
        writer.write_record([
            format!("{:.3}", failure.r),
            format!("{:.4}", failure.cfr),
            failure.error.clone(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes `summary.csv`, `failures.csv` (only when something failed) and
/// `run.json` into `output_dir`.
pub fn write_run_artifacts(
    output_dir: &Path,
    config: &RunConfig,
    result: &SweepResult,
) -> Result<(), BackcastError> {
    write_summary_csv(&output_dir.join("summary.csv"), &result.rows)?;

    if !result.failures.is_empty() {
        write_failures_csv(&output_dir.join("failures.csv"), &result.failures)?;
    }

    let manifest = RunManifest {
        generated_utc: Utc::now().to_rfc3339(),
        config: config.clone(),
        n_combinations: result.rows.len() + result.failures.len(),
        n_failures: result.failures.len(),
    };
    fs::write(
        output_dir.join("run.json"),
        serde_json::to_string_pretty(&manifest)?,
    )?;

    Ok(())
}
