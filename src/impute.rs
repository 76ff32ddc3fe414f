//! Backward imputation of symptom-onset dates from death reports.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::delay::DelayDistribution;
use crate::BackcastError;

/// Deaths reported on one calendar date; multiplicity is explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathEvent {
    pub date: NaiveDate,
    pub deaths: u32,
}

/// An imputed onset-date bucket scaled to infections.
///
/// `cases` is the death count divided by the case fatality ratio and stays
/// fractional; rounding happens only when final statistics are reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnsetCohort {
    pub onset: NaiveDate,
    pub cases: f64,
}

/// Draws one onset-to-death delay per individual death, buckets the
/// resulting onset dates, and scales each bucket by `1 / cfr`.
///
/// Every Monte Carlo iteration calls this afresh: the onset-date ambiguity
/// is itself a major source of output uncertainty.
pub fn impute_onsets<R: Rng + ?Sized>(
    deaths: &[DeathEvent],
    onset_to_death: &DelayDistribution,
    min_delay: u32,
    max_delay: u32,
    cfr: f64,
    rng: &mut R,
) -> Result<Vec<OnsetCohort>, BackcastError> {
    if !cfr.is_finite() || cfr <= 0.0 || cfr > 1.0 {
        return Err(BackcastError::InvalidParameter(format!(
            "cfr must be in (0, 1], got {cfr}"
        )));
    }

    let mut buckets: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for event in deaths {
        for _ in 0..event.deaths {
            let delay = onset_to_death.draw_bounded(min_delay, max_delay, rng)?;
            let onset = event.date - Duration::days(i64::from(delay));
            *buckets.entry(onset).or_insert(0) += 1;
        }
    }

    Ok(buckets
        .into_iter()
        .map(|(onset, count)| OnsetCohort {
            onset,
            cases: f64::from(count) / cfr,
        })
        .collect())
}
