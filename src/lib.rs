//! backcast - outbreak size back-calculation from death reports
//!
//! Estimates the number of circulating infections on an evaluation date from
//! a handful of recently reported deaths. Each Monte Carlo iteration imputes
//! plausible symptom-onset dates backwards through the onset-to-death delay,
//! seeds a branching-process forward simulation per onset cohort, and sums
//! the resulting trajectories; the ensemble of iterations yields mean and
//! interval estimates per (R, CFR) parameter combination.

pub mod branching;
pub mod config;
pub mod delay;
pub mod ensemble;
pub mod impute;
pub mod output;
pub mod summary;

use thiserror::Error;

pub use branching::{simulate_outbreak, Trajectory};
pub use config::{OnsetToDeathConfig, RunConfig, SerialIntervalConfig};
pub use delay::{DelayDistribution, DelayFamily, MAX_REJECTION_ROUNDS};
pub use ensemble::{run_ensemble, run_sweep, Ensemble, EnsembleInputs, SweepFailure, SweepResult};
pub use impute::{impute_onsets, DeathEvent, OnsetCohort};
pub use summary::{cumulative, extract, SummaryRow};

#[derive(Debug, Error)]
pub enum BackcastError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(
        "rejection sampling exhausted after {attempts} draws for a delay in [{min_delay}, {max_delay}]"
    )]
    SamplingExhaustion {
        attempts: usize,
        min_delay: u32,
        max_delay: u32,
    },
    #[error("date alignment error: {0}")]
    DateAlignment(String),
}
