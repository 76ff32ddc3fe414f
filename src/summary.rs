//! Point and interval estimates from a finished ensemble.

use chrono::NaiveDate;
use serde::Serialize;

use crate::ensemble::Ensemble;
use crate::BackcastError;

/// Derived statistics for one (R, CFR) combination at one target date.
/// Counts are rounded to whole infections here and nowhere earlier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub r: f64,
    pub cfr: f64,
    pub average: u64,
    pub lower_95: u64,
    pub lower_50: u64,
    pub upper_50: u64,
    pub upper_95: u64,
}

/// Per-realization running totals along the date axis.
pub fn cumulative(ensemble: &Ensemble) -> Ensemble {
    let realizations = ensemble
        .realizations()
        .iter()
        .map(|realization| {
            let mut total = 0.0;
            realization
                .iter()
                .map(|&count| {
                    total += count;
                    total
                })
                .collect()
        })
        .collect();
    Ensemble::new(ensemble.start(), ensemble.len_days(), realizations)
}

/// Mean and {2.5, 25, 75, 97.5}% quantiles of the ensemble at `date`.
pub fn extract(
    ensemble: &Ensemble,
    date: NaiveDate,
    r: f64,
    cfr: f64,
) -> Result<SummaryRow, BackcastError> {
    let mut values = ensemble.values_at(date)?;
    values.sort_by(|a, b| a.total_cmp(b));

    let mean = values.iter().sum::<f64>() / values.len() as f64;

    Ok(SummaryRow {
        r,
        cfr,
        average: mean.round() as u64,
        lower_95: quantile_type7(&values, 0.025).round() as u64,
        lower_50: quantile_type7(&values, 0.25).round() as u64,
        upper_50: quantile_type7(&values, 0.75).round() as u64,
        upper_95: quantile_type7(&values, 0.975).round() as u64,
    })
}

/// Type-7 quantile estimator (linear interpolation of order statistics) on
/// an ascending-sorted slice.
fn quantile_type7(sorted: &[f64], p: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{cumulative, extract, quantile_type7};
    use crate::ensemble::Ensemble;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn quantiles_interpolate_between_order_statistics() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_type7(&sorted, 0.0), 1.0);
        assert_eq!(quantile_type7(&sorted, 1.0), 4.0);
        assert!((quantile_type7(&sorted, 0.25) - 1.75).abs() < 1e-12);
        assert!((quantile_type7(&sorted, 0.5) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn constant_ensemble_collapses_to_the_constant() {
        let ensemble = Ensemble::new(date("2020-01-01"), 3, vec![vec![7.0, 7.0, 7.0]; 10]);
        let row = extract(&ensemble, date("2020-01-02"), 2.0, 0.02).unwrap();
        assert_eq!(row.average, 7);
        assert_eq!(row.lower_95, 7);
        assert_eq!(row.lower_50, 7);
        assert_eq!(row.upper_50, 7);
        assert_eq!(row.upper_95, 7);
    }

    #[test]
    fn cumulative_produces_running_totals() {
        let ensemble = Ensemble::new(
            date("2020-01-01"),
            4,
            vec![vec![1.0, 0.0, 2.0, 0.5], vec![0.0, 3.0, 0.0, 1.0]],
        );
        let totals = cumulative(&ensemble);
        assert_eq!(totals.realizations()[0], vec![1.0, 1.0, 3.0, 3.5]);
        assert_eq!(totals.realizations()[1], vec![0.0, 3.0, 3.0, 4.0]);
        assert_eq!(totals.start(), ensemble.start());
        assert_eq!(totals.n_realizations(), 2);
    }

    #[test]
    fn extract_outside_the_range_fails() {
        let ensemble = Ensemble::new(date("2020-01-01"), 2, vec![vec![1.0, 2.0]]);
        assert!(extract(&ensemble, date("2020-02-01"), 2.0, 0.02).is_err());
        assert!(extract(&ensemble, date("2019-12-31"), 2.0, 0.02).is_err());
    }
}
