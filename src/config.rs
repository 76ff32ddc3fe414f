//! Run configuration: scenario, delay parameters, and the (R, CFR) sweep grid.

use std::fs;
use std::path::Path;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::delay::DelayDistribution;
use crate::impute::DeathEvent;
use crate::BackcastError;

pub const DEFAULT_N_SIM: usize = 200;

/// Serial interval quoted as natural-scale log-normal moments.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialIntervalConfig {
    /// Mean of the serial interval [days]
    pub mean: f64,
    /// Standard deviation of the serial interval [days]
    pub sd: f64,
}

impl Default for SerialIntervalConfig {
    fn default() -> Self {
        Self { mean: 4.7, sd: 2.9 }
    }
}

/// Onset-to-death delay: gamma with truncation bounds in whole days.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct OnsetToDeathConfig {
    pub shape: f64,
    pub rate: f64,
    /// Shortest admissible delay [days]
    pub min_delay: u32,
    /// Longest admissible delay [days]
    pub max_delay: u32,
}

impl Default for OnsetToDeathConfig {
    fn default() -> Self {
        Self {
            shape: 4.726,
            rate: 0.3151,
            min_delay: 1,
            max_delay: 40,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Evaluation date; estimates are "infections circulating by this day"
    pub today: NaiveDate,
    /// Reported deaths; empty means one death reported on `today`
    pub deaths: Vec<DeathEvent>,
    pub serial_interval: SerialIntervalConfig,
    pub onset_to_death: OnsetToDeathConfig,
    /// Reproduction numbers to sweep
    pub r_grid: Vec<f64>,
    /// Case fatality ratios to sweep
    pub cfr_grid: Vec<f64>,
    /// Monte Carlo iterations per (R, CFR) combination
    pub n_sim: usize,
    /// Base RNG seed; each combination runs on its own stream
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            today: Utc::now().date_naive(),
            deaths: Vec::new(),
            serial_interval: SerialIntervalConfig::default(),
            onset_to_death: OnsetToDeathConfig::default(),
            r_grid: vec![1.5, 2.0, 2.5, 3.0],
            cfr_grid: vec![0.01, 0.02, 0.05, 0.10],
            n_sim: DEFAULT_N_SIM,
            seed: 0xBC45_2020_0001_u64,
        }
    }
}

impl RunConfig {
    pub fn from_toml_path(path: &Path) -> Result<Self, BackcastError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BackcastError> {
        if self.n_sim == 0 {
            return Err(BackcastError::InvalidParameter(
                "n_sim must be greater than zero".to_string(),
            ));
        }

        if self.r_grid.is_empty() {
            return Err(BackcastError::InvalidParameter(
                "r_grid must not be empty".to_string(),
            ));
        }
        if let Some(r) = self.r_grid.iter().find(|r| !r.is_finite() || **r < 0.0) {
            return Err(BackcastError::InvalidParameter(format!(
                "r_grid entries must be finite and >= 0, got {r}"
            )));
        }

        if self.cfr_grid.is_empty() {
            return Err(BackcastError::InvalidParameter(
                "cfr_grid must not be empty".to_string(),
            ));
        }
        if let Some(cfr) = self
            .cfr_grid
            .iter()
            .find(|cfr| !cfr.is_finite() || **cfr <= 0.0 || **cfr > 1.0)
        {
            return Err(BackcastError::InvalidParameter(format!(
                "cfr_grid entries must lie in (0, 1], got {cfr}"
            )));
        }

        if self.onset_to_death.min_delay > self.onset_to_death.max_delay {
            return Err(BackcastError::InvalidParameter(format!(
                "onset_to_death delay bounds are inverted: [{}, {}]",
                self.onset_to_death.min_delay, self.onset_to_death.max_delay
            )));
        }

        // Distribution parameters fail fast here rather than mid-simulation.
        self.serial_interval_dist()?;
        self.onset_to_death_dist()?;

        for event in &self.effective_deaths() {
            if event.deaths == 0 {
                return Err(BackcastError::InvalidParameter(format!(
                    "death event on {} has zero deaths",
                    event.date
                )));
            }
            if event.date > self.today {
                return Err(BackcastError::DateAlignment(format!(
                    "death reported on {} falls after the evaluation date {}",
                    event.date, self.today
                )));
            }
        }

        Ok(())
    }

    /// Reported deaths, defaulting to a single death on `today`.
    pub fn effective_deaths(&self) -> Vec<DeathEvent> {
        if self.deaths.is_empty() {
            vec![DeathEvent {
                date: self.today,
                deaths: 1,
            }]
        } else {
            self.deaths.clone()
        }
    }

    pub fn serial_interval_dist(&self) -> Result<DelayDistribution, BackcastError> {
        DelayDistribution::lognormal_from_mean_sd(self.serial_interval.mean, self.serial_interval.sd)
    }

    pub fn onset_to_death_dist(&self) -> Result<DelayDistribution, BackcastError> {
        DelayDistribution::new(crate::delay::DelayFamily::Gamma {
            shape: self.onset_to_death.shape,
            rate: self.onset_to_death.rate,
        })
    }

    /// The sweep grid in row-major (R outer, CFR inner) order.
    pub fn combinations(&self) -> Vec<(f64, f64)> {
        self.r_grid
            .iter()
            .flat_map(|&r| self.cfr_grid.iter().map(move |&cfr| (r, cfr)))
            .collect()
    }
}
