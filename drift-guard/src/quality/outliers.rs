//! Univariate outlier check for numeric features.

use serde::{Deserialize, Serialize};

use crate::analyzers::statistics::distribution::{mean_and_std, quantile_sorted, sorted_finite};
use crate::core::{SeverityClassifier, SkipReason, TestKind, TestResult, TestStatistic};

/// Rule used to flag a value as an outlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    /// Outside `[Q1 - k*IQR, Q3 + k*IQR]`.
    #[default]
    Iqr,
    /// `|z|` above the threshold, using the sample standard deviation.
    ZScore,
    /// Flagged by either rule.
    Both,
}

/// Outlier counts for one feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierStats {
    pub outlier_count: usize,
    pub sample_size: usize,
    /// IQR fences, when the IQR rule ran.
    pub fences: Option<(f64, f64)>,
}

impl OutlierStats {
    pub fn fraction(&self) -> f64 {
        if self.sample_size == 0 {
            0.0
        } else {
            self.outlier_count as f64 / self.sample_size as f64
        }
    }
}

/// Applies one [`OutlierMethod`] to a sample.
#[derive(Debug, Clone, Copy)]
pub struct OutlierDetector {
    method: OutlierMethod,
    iqr_multiplier: f64,
    zscore_threshold: f64,
}

impl OutlierDetector {
    pub fn new(method: OutlierMethod, iqr_multiplier: f64, zscore_threshold: f64) -> Self {
        Self {
            method,
            iqr_multiplier,
            zscore_threshold,
        }
    }

    /// Counts outliers among the finite values of `values`.
    pub fn detect(&self, values: &[f64]) -> OutlierStats {
        let sorted = sorted_finite(values);
        if sorted.is_empty() {
            return OutlierStats {
                outlier_count: 0,
                sample_size: 0,
                fences: None,
            };
        }

        let fences = match self.method {
            OutlierMethod::Iqr | OutlierMethod::Both => Some(self.iqr_fences(&sorted)),
            OutlierMethod::ZScore => None,
        };
        let z_rule = match self.method {
            OutlierMethod::ZScore | OutlierMethod::Both => Some(mean_and_std(&sorted)),
            OutlierMethod::Iqr => None,
        };

        let outlier_count = sorted
            .iter()
            .filter(|&&v| {
                let outside_fences = fences.is_some_and(|(low, high)| v < low || v > high);
                let extreme_z = z_rule.is_some_and(|(mean, std)| {
                    std > 0.0 && ((v - mean) / std).abs() > self.zscore_threshold
                });
                outside_fences || extreme_z
            })
            .count();

        OutlierStats {
            outlier_count,
            sample_size: sorted.len(),
            fences,
        }
    }

    fn iqr_fences(&self, sorted: &[f64]) -> (f64, f64) {
        let q1 = quantile_sorted(sorted, 0.25);
        let q3 = quantile_sorted(sorted, 0.75);
        let spread = self.iqr_multiplier * (q3 - q1);
        (q1 - spread, q3 + spread)
    }
}

/// Outlier result for one feature. An empty sample is skipped.
pub fn outlier_result(
    feature: &str,
    stats: &OutlierStats,
    classifier: &SeverityClassifier,
) -> TestResult {
    if stats.sample_size == 0 {
        return TestResult::skipped(feature, TestKind::Outliers, SkipReason::EmptySample);
    }
    let statistic = TestStatistic::fraction_with_count(stats.fraction(), stats.outlier_count as u64);
    TestResult::executed(
        feature,
        TestKind::Outliers,
        statistic,
        classifier.classify(TestKind::Outliers, &statistic),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Severity;

    fn sample_with_spikes() -> Vec<f64> {
        let mut values: Vec<f64> = (1..=98).map(f64::from).collect();
        values.push(1_000.0);
        values.push(-1_000.0);
        values
    }

    #[test]
    fn test_iqr_fences() {
        let detector = OutlierDetector::new(OutlierMethod::Iqr, 1.5, 3.0);
        let stats = detector.detect(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0]);
        let (low, high) = stats.fences.unwrap();
        // Q1 = 2.25, Q3 = 4.75, IQR = 2.5
        assert!((low - -1.5).abs() < 1e-12);
        assert!((high - 8.5).abs() < 1e-12);
        assert_eq!(stats.outlier_count, 1);
    }

    #[test]
    fn test_zscore_rule() {
        let detector = OutlierDetector::new(OutlierMethod::ZScore, 1.5, 3.0);
        let stats = detector.detect(&sample_with_spikes());
        assert_eq!(stats.outlier_count, 2);
        assert!(stats.fences.is_none());
    }

    #[test]
    fn test_both_is_union() {
        let values = sample_with_spikes();
        let iqr = OutlierDetector::new(OutlierMethod::Iqr, 1.5, 3.0).detect(&values);
        let z = OutlierDetector::new(OutlierMethod::ZScore, 1.5, 3.0).detect(&values);
        let both = OutlierDetector::new(OutlierMethod::Both, 1.5, 3.0).detect(&values);
        assert!(both.outlier_count >= iqr.outlier_count.max(z.outlier_count));
        assert!(both.outlier_count <= iqr.outlier_count + z.outlier_count);
    }

    #[test]
    fn test_constant_sample_has_no_outliers() {
        let stats = OutlierDetector::new(OutlierMethod::Both, 1.5, 3.0).detect(&[7.0; 40]);
        assert_eq!(stats.outlier_count, 0);
    }

    #[test]
    fn test_empty_sample_is_skipped() {
        let stats = OutlierDetector::new(OutlierMethod::Iqr, 1.5, 3.0).detect(&[f64::NAN]);
        let result = outlier_result("x", &stats, &SeverityClassifier::default());
        assert!(result.is_skipped());
        assert_eq!(result.skip_reason(), Some(&SkipReason::EmptySample));
    }

    #[test]
    fn test_outlier_severity() {
        let stats = OutlierDetector::new(OutlierMethod::Iqr, 1.5, 3.0).detect(&sample_with_spikes());
        // 2 of 100
        let result = outlier_result("x", &stats, &SeverityClassifier::default());
        assert_eq!(result.severity(), Severity::Moderate);
        assert!((result.statistic().unwrap() - 0.02).abs() < 1e-12);
    }
}
