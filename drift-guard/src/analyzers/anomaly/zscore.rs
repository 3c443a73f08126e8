//! Z-score detector: a row is anomalous when any standardized feature is extreme.

use super::{AnomalyScore, DetectorSettings, FeatureMatrix, MultivariateDetector, Standardizer};
use crate::error::{DriftError, Result};

/// Flags rows with `|z| > zscore_threshold` on at least one feature, using
/// baseline mean and standard deviation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZScoreDetector;

impl MultivariateDetector for ZScoreDetector {
    fn name(&self) -> &str {
        "zscore"
    }

    fn score(
        &self,
        baseline: &FeatureMatrix,
        current: &FeatureMatrix,
        settings: &DetectorSettings,
    ) -> Result<AnomalyScore> {
        if baseline.n_features() < 2 {
            return Err(DriftError::configuration(format!(
                "zscore detector needs at least 2 features, got {}",
                baseline.n_features()
            )));
        }

        let standardizer = Standardizer::fit(baseline);
        let threshold = settings.zscore_threshold;
        let flag = |row: &Vec<f64>| row.iter().any(|z| z.abs() > threshold);

        let (baseline_fraction, baseline_rows) =
            AnomalyScore::fraction(standardizer.transform(baseline).rows().iter().map(flag));
        let (current_fraction, current_rows) =
            AnomalyScore::fraction(standardizer.transform(current).rows().iter().map(flag));

        Ok(AnomalyScore {
            baseline_fraction,
            current_fraction,
            baseline_rows,
            current_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: Vec<Vec<f64>>) -> FeatureMatrix {
        FeatureMatrix::new(vec!["a".into(), "b".into()], rows).unwrap()
    }

    #[test]
    fn test_flags_extreme_rows() {
        let baseline = matrix((0..100i32).map(|i| vec![f64::from(i % 10), f64::from(i % 5)]).collect());
        let current = matrix(vec![vec![4.0, 2.0], vec![4.0, 100.0], vec![-50.0, 2.0], vec![5.0, 1.0]]);
        let score = ZScoreDetector
            .score(&baseline, &current, &DetectorSettings::default())
            .unwrap();
        assert_eq!(score.baseline_fraction, 0.0);
        assert_eq!(score.current_fraction, 0.5);
        assert_eq!(score.current_rows, 4);
    }

    #[test]
    fn test_requires_two_features() {
        let single = FeatureMatrix::new(vec!["a".into()], vec![vec![1.0]]).unwrap();
        assert!(ZScoreDetector
            .score(&single, &single, &DetectorSettings::default())
            .is_err());
    }
}
