//! Discrete-time branching-process forward simulation.
//!
//! Population-level approximation: the expected number of new cases on a day
//! is the reproduction number times the serial-interval-weighted sum of past
//! daily case counts, and the realized count is a single Poisson draw with
//! that mean rather than one draw per parent case.

use chrono::NaiveDate;
use rand::Rng;
use rand_distr::{Distribution, Poisson};

use crate::delay::DelayDistribution;
use crate::BackcastError;

/// Daily new-case counts from a cohort onset date through the evaluation
/// date. Day 0 carries the seed, which may be fractional.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub start: NaiveDate,
    pub cases: Vec<f64>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Simulates one trajectory seeded with `seed_cases` on `onset`.
///
/// New infections on day d are Poisson with mean
/// `r * sum over d0 < d of cases[d0] * density(d - d0)`; a non-positive mean
/// yields a deterministic zero. Transmission at lag 0 is excluded: day d's
/// mean must not depend on day d's own draw.
pub fn simulate_outbreak<R: Rng + ?Sized>(
    onset: NaiveDate,
    seed_cases: f64,
    r: f64,
    serial_interval: &DelayDistribution,
    eval_date: NaiveDate,
    rng: &mut R,
) -> Result<Trajectory, BackcastError> {
    if !r.is_finite() || r < 0.0 {
        return Err(BackcastError::InvalidParameter(format!(
            "reproduction number must be finite and >= 0, got {r}"
        )));
    }
    if !seed_cases.is_finite() || seed_cases < 0.0 {
        return Err(BackcastError::InvalidParameter(format!(
            "seed cases must be finite and >= 0, got {seed_cases}"
        )));
    }
    if eval_date < onset {
        return Err(BackcastError::DateAlignment(format!(
            "evaluation date {eval_date} precedes cohort onset {onset}"
        )));
    }

    let horizon = (eval_date - onset).num_days() as usize + 1;
    let kernel: Vec<f64> = (0..horizon as u32).map(|lag| serial_interval.density(lag)).collect();

    let mut cases = Vec::with_capacity(horizon);
    cases.push(seed_cases);

    for day in 1..horizon {
        let mean: f64 = (0..day)
            .map(|past| cases[past] * kernel[day - past])
            .sum::<f64>()
            * r;
        cases.push(poisson_draw(mean.max(0.0), rng));
    }

    Ok(Trajectory {
        start: onset,
        cases,
    })
}

fn poisson_draw<R: Rng + ?Sized>(mean: f64, rng: &mut R) -> f64 {
    if mean <= 0.0 {
        return 0.0;
    }
    // Poisson::new only rejects non-positive and non-finite means, which are
    // excluded above, so this cannot fail for the inputs we feed it.
    match Poisson::new(mean) {
        Ok(dist) => dist.sample(rng),
        Err(_) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::simulate_outbreak;
    use crate::delay::DelayDistribution;
    use crate::BackcastError;

    fn serial_interval() -> DelayDistribution {
        DelayDistribution::lognormal_from_mean_sd(4.7, 2.9).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn zero_reproduction_number_never_grows() {
        let si = serial_interval();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let trajectory = simulate_outbreak(
            date("2020-01-01"),
            37.5,
            0.0,
            &si,
            date("2020-02-01"),
            &mut rng,
        )
        .unwrap();

        assert_eq!(trajectory.cases[0], 37.5);
        assert!(trajectory.cases[1..].iter().all(|&c| c == 0.0));
    }

    #[test]
    fn horizon_spans_onset_through_eval_date() {
        let si = serial_interval();
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let trajectory = simulate_outbreak(
            date("2020-01-01"),
            1.0,
            2.0,
            &si,
            date("2020-01-15"),
            &mut rng,
        )
        .unwrap();
        assert_eq!(trajectory.len(), 15);
        assert_eq!(trajectory.start, date("2020-01-01"));
    }

    #[test]
    fn first_day_mean_follows_the_serial_kernel() {
        let si = serial_interval();
        let r = 2.0;
        let expected = r * si.density(1);

        let n = 20_000;
        let mut rng = ChaCha8Rng::seed_from_u64(25);
        let mut total = 0.0;
        for _ in 0..n {
            let trajectory = simulate_outbreak(
                date("2020-01-01"),
                1.0,
                r,
                &si,
                date("2020-01-02"),
                &mut rng,
            )
            .unwrap();
            total += trajectory.cases[1];
        }

        let observed = total / f64::from(n);
        assert!(
            (observed - expected).abs() < 0.03,
            "observed {observed}, expected {expected}"
        );
    }

    #[test]
    fn eval_date_before_onset_is_a_date_alignment_error() {
        let si = serial_interval();
        let mut rng = ChaCha8Rng::seed_from_u64(27);
        let result = simulate_outbreak(
            date("2020-02-01"),
            1.0,
            2.0,
            &si,
            date("2020-01-01"),
            &mut rng,
        );
        assert!(matches!(result, Err(BackcastError::DateAlignment(_))));
    }

    #[test]
    fn negative_reproduction_number_is_rejected() {
        let si = serial_interval();
        let mut rng = ChaCha8Rng::seed_from_u64(29);
        let result = simulate_outbreak(
            date("2020-01-01"),
            1.0,
            -0.5,
            &si,
            date("2020-01-10"),
            &mut rng,
        );
        assert!(matches!(result, Err(BackcastError::InvalidParameter(_))));
    }
}
