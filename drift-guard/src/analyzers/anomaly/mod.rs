//! Multivariate anomaly detection.
//!
//! Univariate tests miss drift that only shows up in the *joint* distribution
//! of several features. This module fits an unsupervised model on the numeric
//! features of the baseline and compares how many rows it flags as anomalous
//! in the baseline versus the current dataset.
//!
//! ## Architecture
//!
//! - [`MultivariateDetector`]: capability trait, one implementation per model
//! - [`IsolationForest`]: default detector, seeded random partitioning trees
//! - [`ZScoreDetector`]: simpler per-feature standardized distance detector
//! - [`AnomalyDetector`]: prepares feature matrices, runs a detector and
//!   classifies the excess anomalous fraction
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use drift_guard::analyzers::anomaly::{AnomalyDetector, DetectorSettings, ZScoreDetector};
//! use drift_guard::core::SeverityClassifier;
//! use drift_guard::dataset::{Dataset, DatasetOrigin};
//!
//! let baseline = Dataset::builder("b", DatasetOrigin::Baseline)
//!     .float("x", (0..50i32).map(f64::from))
//!     .float("y", (0..50i32).map(|i| f64::from(i % 7)))
//!     .build()
//!     .unwrap();
//! let current = baseline.with_origin(DatasetOrigin::Current);
//!
//! let detector = AnomalyDetector::new(Arc::new(ZScoreDetector), DetectorSettings::default());
//! let result = detector
//!     .detect(&baseline, &current, &["x".into(), "y".into()], &SeverityClassifier::default())
//!     .unwrap();
//! assert_eq!(result.excess_fraction(), Some(0.0));
//! ```

mod isolation_forest;
mod zscore;

pub use isolation_forest::IsolationForest;
pub use zscore::ZScoreDetector;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::analyzers::statistics::distribution::mean_and_std;
use crate::core::{DriftConfig, Severity, SeverityClassifier, SkipReason};
use crate::dataset::Dataset;
use crate::error::{DriftError, Result};

/// Row-major matrix of complete numeric observations.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    features: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Builds a matrix, checking every row has one value per feature.
    pub fn new(features: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(bad) = rows.iter().find(|r| r.len() != features.len()) {
            return Err(DriftError::Internal(format!(
                "row has {} values but {} features were declared",
                bad.len(),
                features.len()
            )));
        }
        Ok(Self { features, rows })
    }

    /// Extracts `features` from a dataset, dropping rows with any missing or
    /// non-finite value.
    pub fn from_dataset(dataset: &Dataset, features: &[String]) -> Result<Self> {
        let columns = features
            .iter()
            .map(|name| dataset.numeric_values(name))
            .collect::<Result<Vec<_>>>()?;

        let rows = (0..dataset.row_count())
            .filter_map(|i| {
                columns
                    .iter()
                    .map(|col| col[i].filter(|v| v.is_finite()))
                    .collect::<Option<Vec<f64>>>()
            })
            .collect();

        Self::new(features.to_vec(), rows)
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }
}

/// Per-feature standardization fitted on the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl Standardizer {
    /// Fits means and sample standard deviations; a zero spread scales by 1.
    pub fn fit(matrix: &FeatureMatrix) -> Self {
        let (means, stds) = (0..matrix.n_features())
            .map(|f| {
                let column: Vec<f64> = matrix.rows.iter().map(|r| r[f]).collect();
                let (mean, std) = mean_and_std(&column);
                let std = if std.is_finite() && std > 0.0 { std } else { 1.0 };
                (if mean.is_finite() { mean } else { 0.0 }, std)
            })
            .unzip();
        Self { means, stds }
    }

    pub fn transform(&self, matrix: &FeatureMatrix) -> FeatureMatrix {
        let rows = matrix
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.means.iter().zip(&self.stds))
                    .map(|(v, (mean, std))| (v - mean) / std)
                    .collect()
            })
            .collect();
        FeatureMatrix {
            features: matrix.features.clone(),
            rows,
        }
    }
}

/// Model parameters shared by all detectors.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSettings {
    pub seed: u64,
    /// Isolation score below which a row is anomalous.
    pub threshold: f64,
    pub trees: usize,
    pub subsample: usize,
    /// Absolute z-score above which a row is anomalous.
    pub zscore_threshold: f64,
    /// Minimum complete baseline rows required to fit.
    pub min_rows: usize,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self::from_config(&DriftConfig::default())
    }
}

impl DetectorSettings {
    pub fn from_config(config: &DriftConfig) -> Self {
        Self {
            seed: config.anomaly_seed,
            threshold: config.anomaly_threshold,
            trees: config.anomaly_trees,
            subsample: config.anomaly_subsample,
            zscore_threshold: config.zscore_threshold,
            min_rows: config.anomaly_min_rows,
        }
    }
}

/// Fractions of anomalous rows on each side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyScore {
    pub baseline_fraction: f64,
    pub current_fraction: f64,
    pub baseline_rows: usize,
    pub current_rows: usize,
}

impl AnomalyScore {
    /// Fraction of `flags` that are set, or 0 for no rows.
    pub fn fraction(flags: impl Iterator<Item = bool>) -> (f64, usize) {
        let (flagged, total) = flags.fold((0usize, 0usize), |(f, t), is_anomalous| {
            (f + usize::from(is_anomalous), t + 1)
        });
        let fraction = if total == 0 {
            0.0
        } else {
            flagged as f64 / total as f64
        };
        (fraction, total)
    }
}

/// A multivariate model scoring baseline and current rows.
///
/// Implementations standardize with baseline statistics, fit on the baseline
/// only and must be deterministic for fixed settings.
pub trait MultivariateDetector: Send + Sync + fmt::Debug {
    /// Stable detector name recorded in reports.
    fn name(&self) -> &str;

    fn score(
        &self,
        baseline: &FeatureMatrix,
        current: &FeatureMatrix,
        settings: &DetectorSettings,
    ) -> Result<AnomalyScore>;
}

/// Outcome of the multivariate check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnomalyOutcome {
    Scored {
        score: AnomalyScore,
        /// `current_fraction - baseline_fraction`
        excess_fraction: f64,
        severity: Severity,
    },
    Skipped {
        reason: SkipReason,
    },
}

/// Multivariate anomaly result attached to every report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    detector: String,
    seed: u64,
    features: Vec<String>,
    outcome: AnomalyOutcome,
}

impl AnomalyResult {
    pub fn skipped(
        detector: impl Into<String>,
        seed: u64,
        features: Vec<String>,
        reason: SkipReason,
    ) -> Self {
        Self {
            detector: detector.into(),
            seed,
            features,
            outcome: AnomalyOutcome::Skipped { reason },
        }
    }

    /// A scored result; the excess is `current_fraction - baseline_fraction`.
    pub fn scored(
        detector: impl Into<String>,
        seed: u64,
        features: Vec<String>,
        score: AnomalyScore,
        severity: Severity,
    ) -> Self {
        Self {
            detector: detector.into(),
            seed,
            features,
            outcome: AnomalyOutcome::Scored {
                excess_fraction: score.current_fraction - score.baseline_fraction,
                score,
                severity,
            },
        }
    }

    pub fn detector(&self) -> &str {
        &self.detector
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn outcome(&self) -> &AnomalyOutcome {
        &self.outcome
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, AnomalyOutcome::Skipped { .. })
    }

    /// Severity when scored; `None` when skipped.
    pub fn severity(&self) -> Option<Severity> {
        match self.outcome {
            AnomalyOutcome::Scored { severity, .. } => Some(severity),
            AnomalyOutcome::Skipped { .. } => None,
        }
    }

    pub fn excess_fraction(&self) -> Option<f64> {
        match self.outcome {
            AnomalyOutcome::Scored {
                excess_fraction, ..
            } => Some(excess_fraction),
            AnomalyOutcome::Skipped { .. } => None,
        }
    }

    pub fn score(&self) -> Option<&AnomalyScore> {
        match &self.outcome {
            AnomalyOutcome::Scored { score, .. } => Some(score),
            AnomalyOutcome::Skipped { .. } => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match &self.outcome {
            AnomalyOutcome::Skipped { reason } => Some(reason),
            AnomalyOutcome::Scored { .. } => None,
        }
    }
}

/// Runs a [`MultivariateDetector`] over a dataset pair and classifies the result.
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    detector: Arc<dyn MultivariateDetector>,
    settings: DetectorSettings,
}

impl AnomalyDetector {
    pub fn new(detector: Arc<dyn MultivariateDetector>, settings: DetectorSettings) -> Self {
        Self { detector, settings }
    }

    /// Isolation forest with settings from `config`.
    pub fn from_config(config: &DriftConfig) -> Self {
        Self::new(
            Arc::new(IsolationForest),
            DetectorSettings::from_config(config),
        )
    }

    pub fn detector_name(&self) -> &str {
        self.detector.name()
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    /// Fits on `baseline[features]` and compares anomalous fractions.
    ///
    /// Fails with [`DriftError::Configuration`] for fewer than two features.
    /// Too few complete rows yield a skipped result instead of an error.
    #[instrument(skip_all, fields(detector = %self.detector.name(), features = features.len(), seed = self.settings.seed))]
    pub fn detect(
        &self,
        baseline: &Dataset,
        current: &Dataset,
        features: &[String],
        classifier: &SeverityClassifier,
    ) -> Result<AnomalyResult> {
        if features.len() < 2 {
            return Err(DriftError::configuration(format!(
                "multivariate anomaly detection needs at least 2 numeric features, got {}",
                features.len()
            )));
        }

        let baseline_matrix = FeatureMatrix::from_dataset(baseline, features)?;
        let current_matrix = FeatureMatrix::from_dataset(current, features)?;

        let skip = |reason| {
            Ok(AnomalyResult::skipped(
                self.detector.name(),
                self.settings.seed,
                features.to_vec(),
                reason,
            ))
        };
        if baseline_matrix.n_rows() < self.settings.min_rows {
            return skip(SkipReason::InsufficientRows {
                rows: baseline_matrix.n_rows(),
                minimum: self.settings.min_rows,
            });
        }
        if current_matrix.n_rows() == 0 {
            return skip(SkipReason::EmptySample);
        }

        let score = self
            .detector
            .score(&baseline_matrix, &current_matrix, &self.settings)?;
        let excess_fraction = score.current_fraction - score.baseline_fraction;
        let severity = classifier.classify_anomaly(excess_fraction);

        debug!(
            baseline_fraction = score.baseline_fraction,
            current_fraction = score.current_fraction,
            excess_fraction,
            %severity,
            "Scored multivariate anomalies"
        );

        Ok(AnomalyResult::scored(
            self.detector.name(),
            self.settings.seed,
            features.to_vec(),
            score,
            severity,
        ))
    }
}
