//! Jensen-Shannon divergence (natural log, bounded by ln 2).

use std::f64::consts::LN_2;

use super::chi_square::category_counts;
use super::distribution::{smoothed_proportions, sorted_finite};
use super::psi::{bin_counts, quantile_edges};
use crate::core::{SkipReason, StatOutcome, TestStatistic};

/// JS divergence between two count vectors over the same support.
///
/// Swapping the arguments yields the bit-identical result.
pub fn jensen_shannon_from_counts(p_counts: &[u64], q_counts: &[u64], epsilon: f64) -> f64 {
    let p = smoothed_proportions(p_counts, epsilon);
    let q = smoothed_proportions(q_counts, epsilon);

    let mut kl_pm = 0.0;
    let mut kl_qm = 0.0;
    for (&pi, &qi) in p.iter().zip(&q) {
        let m = 0.5 * (pi + qi);
        kl_pm += pi * (pi / m).ln();
        kl_qm += qi * (qi / m).ln();
    }
    (0.5 * kl_pm + 0.5 * kl_qm).clamp(0.0, LN_2)
}

/// JS divergence between two categorical samples.
pub fn jensen_shannon_categorical<S: AsRef<str>>(
    baseline: &[S],
    current: &[S],
    epsilon: f64,
) -> StatOutcome {
    if baseline.is_empty() || current.is_empty() {
        return Err(SkipReason::EmptySample);
    }
    let (b, c) = category_counts(baseline, current);
    Ok(TestStatistic::divergence(jensen_shannon_from_counts(
        &b, &c, epsilon,
    )))
}

/// JS divergence between two numeric samples binned on baseline quantile edges.
pub fn jensen_shannon_binned(
    baseline: &[f64],
    current: &[f64],
    bins: usize,
    epsilon: f64,
) -> StatOutcome {
    let baseline = sorted_finite(baseline);
    let current: Vec<f64> = current.iter().copied().filter(|v| v.is_finite()).collect();
    if baseline.is_empty() || current.is_empty() {
        return Err(SkipReason::EmptySample);
    }
    let edges = quantile_edges(&baseline, bins);
    Ok(TestStatistic::divergence(jensen_shannon_from_counts(
        &bin_counts(&baseline, &edges),
        &bin_counts(&current, &edges),
        epsilon,
    )))
}
