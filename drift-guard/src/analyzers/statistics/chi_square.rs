//! Chi-Square test of homogeneity for categorical features.

use std::collections::BTreeMap;

use super::distribution::chi_square_survival;
use crate::core::{SkipReason, StatOutcome, TestStatistic};

/// Per-category counts for both samples over the sorted union of categories.
///
/// Categories absent from one side get a zero count on that side.
pub fn category_counts<S: AsRef<str>>(baseline: &[S], current: &[S]) -> (Vec<u64>, Vec<u64>) {
    let mut table: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
    for value in baseline {
        table.entry(value.as_ref()).or_default().0 += 1;
    }
    for value in current {
        table.entry(value.as_ref()).or_default().1 += 1;
    }
    table.into_values().unzip()
}

/// Pearson statistic of the 2 x k contingency table and its p-value.
pub fn chi_square_from_counts(baseline: &[u64], current: &[u64]) -> TestStatistic {
    let k = baseline.len();
    if k < 2 {
        return TestStatistic::with_p_value(0.0, 1.0);
    }
    let n1: u64 = baseline.iter().sum();
    let n2: u64 = current.iter().sum();
    let total = (n1 + n2) as f64;

    let mut statistic = 0.0;
    for (&observed_b, &observed_c) in baseline.iter().zip(current) {
        let column = (observed_b + observed_c) as f64;
        if column == 0.0 {
            continue;
        }
        let expected_b = column * n1 as f64 / total;
        let expected_c = column * n2 as f64 / total;
        statistic += (observed_b as f64 - expected_b).powi(2) / expected_b;
        statistic += (observed_c as f64 - expected_c).powi(2) / expected_c;
    }

    TestStatistic::with_p_value(statistic, chi_square_survival(statistic, k - 1))
}

/// Chi-Square homogeneity test between two categorical samples.
pub fn chi_square_test<S: AsRef<str>>(baseline: &[S], current: &[S]) -> StatOutcome {
    if baseline.is_empty() || current.is_empty() {
        return Err(SkipReason::EmptySample);
    }
    let (b, c) = category_counts(baseline, current);
    Ok(chi_square_from_counts(&b, &c))
}
