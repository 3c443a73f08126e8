//! Two-sample Kolmogorov-Smirnov test.

use super::distribution::{distinct_sorted, kolmogorov_survival, sorted_finite};
use crate::core::{SkipReason, StatOutcome, TestStatistic};

/// Maximum absolute difference between the empirical CDFs of two ascending samples.
pub fn ks_statistic(baseline_sorted: &[f64], current_sorted: &[f64]) -> f64 {
    let (n1, n2) = (baseline_sorted.len(), current_sorted.len());
    if n1 == 0 || n2 == 0 {
        return 0.0;
    }
    let (mut i, mut j) = (0, 0);
    let mut max_gap = 0.0_f64;
    while i < n1 && j < n2 {
        let x = baseline_sorted[i].min(current_sorted[j]);
        while i < n1 && baseline_sorted[i] <= x {
            i += 1;
        }
        while j < n2 && current_sorted[j] <= x {
            j += 1;
        }
        let gap = (i as f64 / n1 as f64 - j as f64 / n2 as f64).abs();
        max_gap = max_gap.max(gap);
    }
    max_gap
}

/// Runs the KS test on two numeric samples. Non-finite values are ignored.
///
/// The p-value uses the asymptotic Kolmogorov distribution with the
/// effective-size correction `(en + 0.12 + 0.11 / en) * D`.
pub fn ks_test(baseline: &[f64], current: &[f64]) -> StatOutcome {
    let baseline = sorted_finite(baseline);
    let current = sorted_finite(current);
    if baseline.is_empty() || current.is_empty() {
        return Err(SkipReason::EmptySample);
    }
    let distinct = distinct_sorted(&baseline).min(distinct_sorted(&current));
    if distinct < 2 {
        return Err(SkipReason::DegenerateDistribution {
            distinct_values: distinct,
        });
    }

    let d = ks_statistic(&baseline, &current);
    let (n1, n2) = (baseline.len() as f64, current.len() as f64);
    let en = (n1 * n2 / (n1 + n2)).sqrt();
    let p_value = kolmogorov_survival((en + 0.12 + 0.11 / en) * d);

    Ok(TestStatistic::with_p_value(d, p_value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_samples() {
        let sample: Vec<f64> = (0..500).map(|i| (i % 5 + 1) as f64).collect();
        let result = ks_test(&sample, &sample).unwrap();
        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.p_value(), Some(1.0));
    }

    #[test]
    fn test_disjoint_samples() {
        let a: Vec<f64> = (0..100i32).map(f64::from).collect();
        let b: Vec<f64> = (1000..1100).map(f64::from).collect();
        let result = ks_test(&a, &b).unwrap();
        assert_eq!(result.statistic, 1.0);
        assert!(result.p_value().unwrap() < 1e-10);
    }

    #[test]
    fn test_statistic_known_value() {
        // ECDFs differ by at most 0.5 (after 2.0 the baseline is at 2/4, current at 0).
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [3.0, 4.0, 5.0, 6.0];
        assert!((ks_statistic(&a, &b) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_symmetric() {
        let a = [0.1, 0.5, 0.9, 1.3, 2.2, 2.8];
        let b = [0.4, 0.6, 1.1, 3.0, 3.5];
        let ab = ks_test(&a, &b).unwrap();
        let ba = ks_test(&b, &a).unwrap();
        assert_eq!(ab.statistic, ba.statistic);
        assert_eq!(ab.p_value(), ba.p_value());
    }

    #[test]
    fn test_skips() {
        assert_eq!(ks_test(&[], &[1.0, 2.0]), Err(SkipReason::EmptySample));
        assert_eq!(
            ks_test(&[f64::NAN], &[1.0, 2.0]),
            Err(SkipReason::EmptySample)
        );
        assert_eq!(
            ks_test(&[3.0; 40], &[1.0, 2.0]),
            Err(SkipReason::DegenerateDistribution { distinct_values: 1 })
        );
    }
}
