//! Data quality checks on the current dataset.
//!
//! Opt-in through [`QualityConfig::enabled`]. Each check produces ordinary
//! [`TestResult`]s, so quality findings share severity tiers and the
//! worst-case-wins rule with the drift tests.
//!
//! - [`missing_values`]: per-feature missing rate, read off the profiles
//! - [`duplicates`]: dataset-scope duplicate rows, as a DataFusion query
//! - [`outliers`]: per numeric feature, IQR and/or z-score
//! - [`scoring`]: a weighted 0-100 score with a grade

pub mod duplicates;
pub mod missing_values;
pub mod outliers;
pub mod scoring;

pub use duplicates::{count_duplicates, duplicate_result, DuplicateStats};
pub use missing_values::{missing_value_result, MissingValueSummary};
pub use outliers::{outlier_result, OutlierDetector, OutlierMethod, OutlierStats};
pub use scoring::{
    QualityGrade, QualityMeasurements, QualityScore, QualityScorer, QualityWeights,
    ScoreComponent,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::analyzers::profiler::{FeatureKind, FeatureProfiles};
use crate::core::{SeverityClassifier, TestResult};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::security::InputValidator;

/// Settings for the quality checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    pub enabled: bool,
    pub outlier_method: OutlierMethod,
    pub iqr_multiplier: f64,
    pub zscore_threshold: f64,
    /// Columns identifying a row for the duplicate check; all columns when `None`.
    pub key_columns: Option<Vec<String>>,
    pub weights: QualityWeights,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            outlier_method: OutlierMethod::Iqr,
            iqr_multiplier: 1.5,
            zscore_threshold: 3.0,
            key_columns: None,
            weights: QualityWeights::default(),
        }
    }
}

impl QualityConfig {
    /// Default settings with the checks switched on.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        InputValidator::validate_positive(self.iqr_multiplier, "quality.iqr_multiplier")?;
        InputValidator::validate_positive(self.zscore_threshold, "quality.zscore_threshold")?;
        self.weights.validate()
    }
}

/// Quality results plus the score they roll up to.
#[derive(Debug, Clone)]
pub struct QualityOutcome {
    /// Missing-value results in column order, then the duplicate result, then
    /// outlier results in column order.
    pub results: Vec<TestResult>,
    pub score: QualityScore,
}

/// Runs every quality check against the current dataset.
#[derive(Debug, Clone)]
pub struct QualityChecker {
    config: QualityConfig,
    outliers: OutlierDetector,
    scorer: QualityScorer,
}

impl QualityChecker {
    pub fn new(config: QualityConfig) -> Self {
        let outliers =
            OutlierDetector::new(config.outlier_method, config.iqr_multiplier, config.zscore_threshold);
        let scorer = QualityScorer::new(config.weights);
        Self {
            config,
            outliers,
            scorer,
        }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    #[instrument(skip_all, fields(dataset.id = %current.id(), features = profiles.len()))]
    pub async fn run(
        &self,
        current: &Dataset,
        profiles: &FeatureProfiles,
        classifier: &SeverityClassifier,
    ) -> Result<QualityOutcome> {
        let mut results: Vec<TestResult> = profiles
            .iter()
            .map(|profile| missing_value_result(profile, classifier))
            .collect();
        let missing = MissingValueSummary::from_profiles(profiles.iter());

        let duplicates = count_duplicates(current, self.config.key_columns.as_deref()).await?;
        results.push(duplicate_result(&duplicates, classifier));

        let mut outlier_count = 0usize;
        let mut numeric_values = 0usize;
        for profile in profiles.iter().filter(|p| p.kind == FeatureKind::Numeric) {
            let values: Vec<f64> = current
                .numeric_values(&profile.name)?
                .into_iter()
                .flatten()
                .collect();
            let stats = self.outliers.detect(&values);
            outlier_count += stats.outlier_count;
            numeric_values += stats.sample_size;
            results.push(outlier_result(&profile.name, &stats, classifier));
        }

        let populated = profiles
            .iter()
            .filter(|p| p.row_count == 0 || p.missing_count < p.row_count)
            .count();
        let measurements = QualityMeasurements {
            missing_percentage: missing.percentage(),
            duplicate_percentage: duplicates.percentage(),
            outlier_percentage: percentage(outlier_count, numeric_values),
            schema_consistency: if profiles.is_empty() {
                100.0
            } else {
                percentage(populated, profiles.len())
            },
        };
        let score = self.scorer.score(&measurements);

        debug!(
            checks = results.len(),
            score = score.overall,
            grade = %score.grade,
            "Quality checks complete"
        );
        Ok(QualityOutcome { results, score })
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
