//! Discretized delay distributions
//!
//! Continuous delay distributions (serial interval, onset-to-death) reduced
//! to daily probability masses, with truncated sampling by rejection so the
//! conditional distribution on the support is preserved.

use rand::Rng;
use rand_distr::Distribution;
use serde::{Deserialize, Serialize};
use statrs::distribution::ContinuousCDF;

use crate::BackcastError;

/// Rejection rounds allowed per requested draw before `sample_bounded`
/// reports `SamplingExhaustion` instead of looping.
pub const MAX_REJECTION_ROUNDS: usize = 10_000;

/// Distribution family and parameters, on the natural parametrization of
/// each family: (meanlog, sdlog) for log-normal, (shape, rate) for gamma.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum DelayFamily {
    LogNormal { meanlog: f64, sdlog: f64 },
    Gamma { shape: f64, rate: f64 },
}

#[derive(Clone)]
enum Sampler {
    LogNormal(rand_distr::LogNormal<f64>),
    Gamma(rand_distr::Gamma<f64>),
}

#[derive(Clone)]
enum Cdf {
    LogNormal(statrs::distribution::LogNormal),
    Gamma(statrs::distribution::Gamma),
}

/// A delay distribution discretized to whole days.
///
/// The daily mass uses a one-day interval with no continuity correction:
/// `density(k) = F(k + 1) - F(k)`, and continuous draws are floored to the
/// same grid, so `sample` and `density` describe the same integer law.
#[derive(Clone)]
pub struct DelayDistribution {
    family: DelayFamily,
    sampler: Sampler,
    cdf: Cdf,
}

impl DelayDistribution {
    pub fn new(family: DelayFamily) -> Result<Self, BackcastError> {
        let (sampler, cdf) = match family {
            DelayFamily::LogNormal { meanlog, sdlog } => {
                if !meanlog.is_finite() || !sdlog.is_finite() || sdlog <= 0.0 {
                    return Err(BackcastError::InvalidParameter(format!(
                        "log-normal requires finite meanlog and sdlog > 0, got ({meanlog}, {sdlog})"
                    )));
                }
                let sampler = rand_distr::LogNormal::new(meanlog, sdlog)
                    .map_err(|e| BackcastError::InvalidParameter(e.to_string()))?;
                let cdf = statrs::distribution::LogNormal::new(meanlog, sdlog)
                    .map_err(|e| BackcastError::InvalidParameter(e.to_string()))?;
                (Sampler::LogNormal(sampler), Cdf::LogNormal(cdf))
            }
            DelayFamily::Gamma { shape, rate } => {
                if !shape.is_finite() || !rate.is_finite() || shape <= 0.0 || rate <= 0.0 {
                    return Err(BackcastError::InvalidParameter(format!(
                        "gamma requires shape > 0 and rate > 0, got ({shape}, {rate})"
                    )));
                }
                // rand_distr parametrizes gamma by scale, statrs by rate.
                let sampler = rand_distr::Gamma::new(shape, 1.0 / rate)
                    .map_err(|e| BackcastError::InvalidParameter(e.to_string()))?;
                let cdf = statrs::distribution::Gamma::new(shape, rate)
                    .map_err(|e| BackcastError::InvalidParameter(e.to_string()))?;
                (Sampler::Gamma(sampler), Cdf::Gamma(cdf))
            }
        };

        Ok(Self {
            family,
            sampler,
            cdf,
        })
    }

    /// Log-normal from natural-scale mean and standard deviation, the form
    /// serial-interval estimates are quoted in.
    pub fn lognormal_from_mean_sd(mean: f64, sd: f64) -> Result<Self, BackcastError> {
        if !mean.is_finite() || !sd.is_finite() || mean <= 0.0 || sd <= 0.0 {
            return Err(BackcastError::InvalidParameter(format!(
                "log-normal moments require mean > 0 and sd > 0, got ({mean}, {sd})"
            )));
        }
        let sdlog2 = (1.0 + (sd / mean).powi(2)).ln();
        let family = DelayFamily::LogNormal {
            meanlog: mean.ln() - 0.5 * sdlog2,
            sdlog: sdlog2.sqrt(),
        };
        Self::new(family)
    }

    pub fn family(&self) -> DelayFamily {
        self.family
    }

    /// Probability mass of a delay of exactly `k` whole days.
    pub fn density(&self, k: u32) -> f64 {
        let lower = self.cdf_at(f64::from(k));
        let upper = self.cdf_at(f64::from(k) + 1.0);
        (upper - lower).max(0.0)
    }

    fn cdf_at(&self, x: f64) -> f64 {
        match &self.cdf {
            Cdf::LogNormal(d) => d.cdf(x),
            Cdf::Gamma(d) => d.cdf(x),
        }
    }

    fn draw_one<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        let value = match &self.sampler {
            Sampler::LogNormal(d) => d.sample(rng),
            Sampler::Gamma(d) => d.sample(rng),
        };
        value.max(0.0).floor() as u32
    }

    /// `n` independent integer-day draws.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<u32> {
        (0..n).map(|_| self.draw_one(rng)).collect()
    }

    /// `n` independent draws conditioned on `[min_delay, max_delay]`.
    ///
    /// Draws outside the bounds are discarded and redrawn, never clipped;
    /// both bounds are enforced on every draw including redraws. Each
    /// requested draw is allowed `MAX_REJECTION_ROUNDS` attempts.
    pub fn sample_bounded<R: Rng + ?Sized>(
        &self,
        n: usize,
        min_delay: u32,
        max_delay: u32,
        rng: &mut R,
    ) -> Result<Vec<u32>, BackcastError> {
        if min_delay > max_delay {
            return Err(BackcastError::InvalidParameter(format!(
                "delay bounds are inverted: [{min_delay}, {max_delay}]"
            )));
        }

        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.draw_bounded(min_delay, max_delay, rng)?);
        }
        Ok(out)
    }

    pub(crate) fn draw_bounded<R: Rng + ?Sized>(
        &self,
        min_delay: u32,
        max_delay: u32,
        rng: &mut R,
    ) -> Result<u32, BackcastError> {
        for _ in 0..MAX_REJECTION_ROUNDS {
            let draw = self.draw_one(rng);
            if (min_delay..=max_delay).contains(&draw) {
                return Ok(draw);
            }
        }
        Err(BackcastError::SamplingExhaustion {
            attempts: MAX_REJECTION_ROUNDS,
            min_delay,
            max_delay,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{DelayDistribution, DelayFamily};
    use crate::BackcastError;

    fn onset_to_death() -> DelayDistribution {
        DelayDistribution::new(DelayFamily::Gamma {
            shape: 4.726,
            rate: 0.3151,
        })
        .unwrap()
    }

    #[test]
    fn density_sums_to_one_over_long_support() {
        let dist = onset_to_death();
        let total: f64 = (0..400).map(|k| dist.density(k)).sum();
        assert!((total - 1.0).abs() < 1e-9, "total mass {total}");
    }

    #[test]
    fn lognormal_from_moments_recovers_mean() {
        let dist = DelayDistribution::lognormal_from_mean_sd(4.7, 2.9).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let draws = dist.sample(50_000, &mut rng);
        // Flooring shifts the sample mean down by roughly half a day.
        let mean = draws.iter().map(|&d| f64::from(d)).sum::<f64>() / draws.len() as f64;
        assert!((mean - 4.2).abs() < 0.1, "sample mean {mean}");
    }

    #[test]
    fn bounded_sampling_respects_both_bounds() {
        let dist = onset_to_death();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let draws = dist.sample_bounded(5_000, 1, 40, &mut rng).unwrap();
        assert_eq!(draws.len(), 5_000);
        assert!(draws.iter().all(|&d| (1..=40).contains(&d)));
    }

    #[test]
    fn bounded_sampling_matches_renormalized_density() {
        let dist = onset_to_death();
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let n = 40_000usize;
        let draws = dist.sample_bounded(n, 1, 40, &mut rng).unwrap();

        let support_mass: f64 = (1..=40).map(|k| dist.density(k)).sum();
        for k in [5u32, 10, 15, 20, 25] {
            let expected = dist.density(k) / support_mass;
            let observed =
                draws.iter().filter(|&&d| d == k).count() as f64 / n as f64;
            assert!(
                (observed - expected).abs() < 0.01,
                "k={k}: observed {observed}, expected {expected}"
            );
        }
    }

    #[test]
    fn unreachable_bounds_exhaust_instead_of_hanging() {
        let dist = onset_to_death();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let result = dist.sample_bounded(1, 900, 1_000, &mut rng);
        assert!(matches!(
            result,
            Err(BackcastError::SamplingExhaustion { .. })
        ));
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(DelayDistribution::new(DelayFamily::Gamma {
            shape: -1.0,
            rate: 0.3,
        })
        .is_err());
        assert!(DelayDistribution::new(DelayFamily::LogNormal {
            meanlog: 1.0,
            sdlog: 0.0,
        })
        .is_err());
        assert!(DelayDistribution::lognormal_from_mean_sd(-4.7, 2.9).is_err());
    }
}
