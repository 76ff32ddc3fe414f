//! Monte Carlo ensemble aggregation and the (R, CFR) parameter sweep.
//!
//! One iteration = fresh onset imputation, one branching simulation per
//! cohort, date-aligned sum into a realization. Combinations of the sweep
//! grid are independent units of work: each runs on its own rayon worker
//! with its own ChaCha stream, so no generator is ever shared.

use chrono::{Duration, NaiveDate};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::branching::simulate_outbreak;
use crate::config::RunConfig;
use crate::delay::DelayDistribution;
use crate::impute::{impute_onsets, DeathEvent};
use crate::summary::{cumulative, extract, SummaryRow};
use crate::BackcastError;

/// Everything one ensemble run needs besides (R, CFR).
pub struct EnsembleInputs<'a> {
    pub deaths: &'a [DeathEvent],
    pub onset_to_death: &'a DelayDistribution,
    pub min_delay: u32,
    pub max_delay: u32,
    pub serial_interval: &'a DelayDistribution,
    pub today: NaiveDate,
}

/// `n_sim` realizations aligned to one shared date range, zero-filled where
/// a trajectory has no mass. Built once, then read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct Ensemble {
    start: NaiveDate,
    len_days: usize,
    realizations: Vec<Vec<f64>>,
}

impl Ensemble {
    pub(crate) fn new(start: NaiveDate, len_days: usize, realizations: Vec<Vec<f64>>) -> Self {
        debug_assert!(realizations.iter().all(|r| r.len() == len_days));
        Self {
            start,
            len_days,
            realizations,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn len_days(&self) -> usize {
        self.len_days
    }

    pub fn n_realizations(&self) -> usize {
        self.realizations.len()
    }

    pub fn realizations(&self) -> &[Vec<f64>] {
        &self.realizations
    }

    pub fn date_index(&self, date: NaiveDate) -> Option<usize> {
        let offset = (date - self.start).num_days();
        if offset < 0 || offset as usize >= self.len_days {
            None
        } else {
            Some(offset as usize)
        }
    }

    /// The value of every realization at `date`.
    pub fn values_at(&self, date: NaiveDate) -> Result<Vec<f64>, BackcastError> {
        let idx = self.date_index(date).ok_or_else(|| {
            BackcastError::DateAlignment(format!(
                "{date} lies outside the ensemble range starting {}",
                self.start
            ))
        })?;
        Ok(self.realizations.iter().map(|r| r[idx]).collect())
    }
}

/// Runs `n_sim` independent imputation + branching iterations for one
/// (R, CFR) combination.
pub fn run_ensemble(
    inputs: &EnsembleInputs<'_>,
    r: f64,
    cfr: f64,
    n_sim: usize,
    rng: &mut ChaCha8Rng,
) -> Result<Ensemble, BackcastError> {
    if n_sim == 0 {
        return Err(BackcastError::InvalidParameter(
            "n_sim must be greater than zero".to_string(),
        ));
    }
    let earliest_death = inputs
        .deaths
        .iter()
        .map(|d| d.date)
        .min()
        .ok_or_else(|| {
            BackcastError::InvalidParameter("at least one death event is required".to_string())
        })?;

    // Fixed alignment: the earliest possible onset through the evaluation
    // date. Every trajectory lands inside this range.
    let start = earliest_death - Duration::days(i64::from(inputs.max_delay));
    if inputs.today < start {
        return Err(BackcastError::DateAlignment(format!(
            "evaluation date {} precedes the earliest possible onset {start}",
            inputs.today
        )));
    }
    let len_days = (inputs.today - start).num_days() as usize + 1;

    let mut realizations = Vec::with_capacity(n_sim);
    for _ in 0..n_sim {
        let cohorts = impute_onsets(
            inputs.deaths,
            inputs.onset_to_death,
            inputs.min_delay,
            inputs.max_delay,
            cfr,
            rng,
        )?;

        let mut realization = vec![0.0; len_days];
        for cohort in &cohorts {
            let trajectory = simulate_outbreak(
                cohort.onset,
                cohort.cases,
                r,
                inputs.serial_interval,
                inputs.today,
                rng,
            )?;
            let offset = (trajectory.start - start).num_days() as usize;
            for (day, &count) in trajectory.cases.iter().enumerate() {
                realization[offset + day] += count;
            }
        }
        realizations.push(realization);
    }

    Ok(Ensemble::new(start, len_days, realizations))
}

/// A combination that failed, flagged rather than silently dropped.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SweepFailure {
    pub r: f64,
    pub cfr: f64,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepResult {
    pub rows: Vec<SummaryRow>,
    pub failures: Vec<SweepFailure>,
}

/// Sweeps the full (R, CFR) grid, one rayon task per combination.
///
/// Combination `i` draws from stream `i + 1` of the base seed, so results
/// are reproducible and any single combination can be re-run in isolation.
pub fn run_sweep(config: &RunConfig) -> Result<SweepResult, BackcastError> {
    config.validate()?;

    let deaths = config.effective_deaths();
    let onset_to_death = config.onset_to_death_dist()?;
    let serial_interval = config.serial_interval_dist()?;
    let inputs = EnsembleInputs {
        deaths: &deaths,
        onset_to_death: &onset_to_death,
        min_delay: config.onset_to_death.min_delay,
        max_delay: config.onset_to_death.max_delay,
        serial_interval: &serial_interval,
        today: config.today,
    };

    let outcomes: Vec<Result<SummaryRow, SweepFailure>> = config
        .combinations()
        .par_iter()
        .enumerate()
        .map(|(idx, &(r, cfr))| {
            let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
            rng.set_stream(idx as u64 + 1);

            run_ensemble(&inputs, r, cfr, config.n_sim, &mut rng)
                .and_then(|ensemble| extract(&cumulative(&ensemble), config.today, r, cfr))
                .map_err(|error| SweepFailure {
                    r,
                    cfr,
                    error: error.to_string(),
                })
        })
        .collect();

    let mut rows = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(row) => rows.push(row),
            Err(failure) => failures.push(failure),
        }
    }

    Ok(SweepResult { rows, failures })
}
