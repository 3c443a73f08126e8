//! Run configuration.
//!
//! [`DriftConfig`] is an explicit value passed into every run. Nothing reads
//! process-global state. It is validated before any data is touched.

use serde::{Deserialize, Serialize};

use crate::core::severity::SeverityBands;
use crate::error::{DriftError, Result};
use crate::quality::QualityConfig;
use crate::security::InputValidator;

/// Thresholds, seeds and limits for a drift check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Minimum non-missing sample size on both sides for the KS test.
    pub min_sample_size: usize,
    /// Categorical features with more distinct values skip Chi-Square.
    pub max_categorical_cardinality: usize,
    /// Integer columns with at most this many distinct values are treated as
    /// categorical. Zero disables the rule.
    pub low_cardinality_int_max: usize,
    /// Number of quantile bins for PSI.
    pub psi_bins: usize,
    /// Replacement for zero proportions in PSI and Jensen-Shannon.
    pub smoothing_epsilon: f64,
    /// Features missing more than this fraction on either side skip drift tests.
    pub missing_rate_max: f64,
    /// Seed for the multivariate anomaly detector.
    pub anomaly_seed: u64,
    /// Rows scoring below this are anomalous.
    pub anomaly_threshold: f64,
    pub anomaly_trees: usize,
    pub anomaly_subsample: usize,
    /// Minimum complete baseline rows for the anomaly detector to fit.
    pub anomaly_min_rows: usize,
    /// Absolute z-score above which the z-score detector flags a row.
    pub zscore_threshold: f64,
    /// Upper bound on concurrently evaluated features.
    pub max_workers: usize,
    /// Deadline for the whole check, in milliseconds.
    pub timeout_ms: u64,
    pub bands: SeverityBands,
    pub quality: QualityConfig,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            min_sample_size: 30,
            max_categorical_cardinality: 50,
            low_cardinality_int_max: 10,
            psi_bins: 10,
            smoothing_epsilon: 1e-4,
            missing_rate_max: 0.5,
            anomaly_seed: 42,
            anomaly_threshold: -0.1,
            anomaly_trees: 100,
            anomaly_subsample: 256,
            anomaly_min_rows: 10,
            zscore_threshold: 3.0,
            max_workers: num_cpus::get().max(1),
            timeout_ms: 60_000,
            bands: SeverityBands::default(),
            quality: QualityConfig::default(),
        }
    }
}

impl DriftConfig {
    pub fn builder() -> DriftConfigBuilder {
        DriftConfigBuilder::default()
    }

    /// Parses and validates a JSON document. Every field must be present.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: DriftConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects out-of-range or inconsistent values.
    pub fn validate(&self) -> Result<()> {
        InputValidator::validate_at_least(self.min_sample_size, 1, "min_sample_size")?;
        InputValidator::validate_at_least(
            self.max_categorical_cardinality,
            1,
            "max_categorical_cardinality",
        )?;
        InputValidator::validate_at_least(self.psi_bins, 2, "psi_bins")?;
        InputValidator::validate_positive(self.smoothing_epsilon, "smoothing_epsilon")?;
        if self.smoothing_epsilon >= 1.0 {
            return Err(DriftError::configuration(format!(
                "smoothing_epsilon must be below 1.0, got {}",
                self.smoothing_epsilon
            )));
        }
        InputValidator::validate_fraction(self.missing_rate_max, "missing_rate_max")?;
        InputValidator::validate_finite(self.anomaly_threshold, "anomaly_threshold")?;
        if !(-0.5..=0.5).contains(&self.anomaly_threshold) {
            return Err(DriftError::configuration(format!(
                "anomaly_threshold must lie in [-0.5, 0.5], got {}",
                self.anomaly_threshold
            )));
        }
        InputValidator::validate_at_least(self.anomaly_trees, 1, "anomaly_trees")?;
        InputValidator::validate_at_least(self.anomaly_subsample, 2, "anomaly_subsample")?;
        InputValidator::validate_at_least(self.anomaly_min_rows, 2, "anomaly_min_rows")?;
        InputValidator::validate_positive(self.zscore_threshold, "zscore_threshold")?;
        InputValidator::validate_at_least(self.max_workers, 1, "max_workers")?;
        if self.timeout_ms == 0 {
            return Err(DriftError::configuration("timeout_ms must be greater than 0"));
        }
        self.bands.validate()?;
        self.quality.validate()?;
        Ok(())
    }
}

/// Builder starting from [`DriftConfig::default`].
#[derive(Debug, Clone, Default)]
pub struct DriftConfigBuilder {
    config: DriftConfig,
}

impl DriftConfigBuilder {
    pub fn min_sample_size(mut self, value: usize) -> Self {
        self.config.min_sample_size = value;
        self
    }

    pub fn max_categorical_cardinality(mut self, value: usize) -> Self {
        self.config.max_categorical_cardinality = value;
        self
    }

    pub fn low_cardinality_int_max(mut self, value: usize) -> Self {
        self.config.low_cardinality_int_max = value;
        self
    }

    pub fn psi_bins(mut self, value: usize) -> Self {
        self.config.psi_bins = value;
        self
    }

    pub fn smoothing_epsilon(mut self, value: f64) -> Self {
        self.config.smoothing_epsilon = value;
        self
    }

    pub fn missing_rate_max(mut self, value: f64) -> Self {
        self.config.missing_rate_max = value;
        self
    }

    pub fn anomaly_seed(mut self, value: u64) -> Self {
        self.config.anomaly_seed = value;
        self
    }

    pub fn anomaly_threshold(mut self, value: f64) -> Self {
        self.config.anomaly_threshold = value;
        self
    }

    pub fn anomaly_trees(mut self, value: usize) -> Self {
        self.config.anomaly_trees = value;
        self
    }

    pub fn anomaly_subsample(mut self, value: usize) -> Self {
        self.config.anomaly_subsample = value;
        self
    }

    pub fn anomaly_min_rows(mut self, value: usize) -> Self {
        self.config.anomaly_min_rows = value;
        self
    }

    pub fn zscore_threshold(mut self, value: f64) -> Self {
        self.config.zscore_threshold = value;
        self
    }

    pub fn max_workers(mut self, value: usize) -> Self {
        self.config.max_workers = value;
        self
    }

    pub fn timeout_ms(mut self, value: u64) -> Self {
        self.config.timeout_ms = value;
        self
    }

    pub fn bands(mut self, bands: SeverityBands) -> Self {
        self.config.bands = bands;
        self
    }

    pub fn quality(mut self, quality: QualityConfig) -> Self {
        self.config.quality = quality;
        self
    }

    pub fn build(self) -> Result<DriftConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
