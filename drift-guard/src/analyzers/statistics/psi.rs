//! Population Stability Index over baseline-quantile bins.

use super::distribution::{quantile_sorted, smoothed_proportions, sorted_finite};
use crate::core::{SkipReason, StatOutcome, TestStatistic};

/// Interior bin edges at the baseline's `1/bins .. (bins-1)/bins` quantiles.
///
/// Repeated edges (from ties in the baseline) are collapsed, so fewer than
/// `bins` bins may result.
pub fn quantile_edges(baseline_sorted: &[f64], bins: usize) -> Vec<f64> {
    let mut edges: Vec<f64> = (1..bins)
        .map(|i| quantile_sorted(baseline_sorted, i as f64 / bins as f64))
        .collect();
    edges.dedup();
    edges
}

/// Counts values into right-closed bins `(edge[i-1], edge[i]]`; the last bin is open-ended.
pub fn bin_counts(values: &[f64], edges: &[f64]) -> Vec<u64> {
    let mut counts = vec![0u64; edges.len() + 1];
    for value in values {
        let bin = edges.partition_point(|edge| edge < value);
        counts[bin] += 1;
    }
    counts
}

/// `Σ (cur − base) · ln(cur / base)` over already-smoothed proportions.
pub fn psi_from_proportions(baseline: &[f64], current: &[f64]) -> f64 {
    let psi: f64 = baseline
        .iter()
        .zip(current)
        .map(|(b, c)| (c - b) * (c / b).ln())
        .sum();
    psi.max(0.0)
}

/// PSI between two numeric samples. Non-finite values are ignored.
pub fn psi_test(baseline: &[f64], current: &[f64], bins: usize, epsilon: f64) -> StatOutcome {
    let baseline = sorted_finite(baseline);
    let current: Vec<f64> = current.iter().copied().filter(|v| v.is_finite()).collect();
    if baseline.is_empty() || current.is_empty() {
        return Err(SkipReason::EmptySample);
    }

    let edges = quantile_edges(&baseline, bins);
    let baseline_props = smoothed_proportions(&bin_counts(&baseline, &edges), epsilon);
    let current_props = smoothed_proportions(&bin_counts(&current, &edges), epsilon);

    Ok(TestStatistic::divergence(psi_from_proportions(
        &baseline_props,
        &current_props,
    )))
}
