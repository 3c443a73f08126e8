//! Severity tiers and the banding rules that map statistics onto them.

use std::f64::consts::LN_2;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::result::{TestKind, TestResult, TestStatistic};
use crate::error::{DriftError, Result};
use crate::security::InputValidator;

/// Ordered drift tier. `None < Moderate < Severe`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    None,
    Moderate,
    Severe,
}

impl Severity {
    /// Worst tier in `tiers`, or `None` for an empty iterator.
    pub fn worst<I: IntoIterator<Item = Severity>>(tiers: I) -> Severity {
        tiers.into_iter().max().unwrap_or_default()
    }

    pub fn is_drift(&self) -> bool {
        *self > Severity::None
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Moderate => write!(f, "moderate"),
            Self::Severe => write!(f, "severe"),
        }
    }
}

/// Bands for statistics where larger values mean more drift.
///
/// `value >= moderate` is moderate. `value > severe` is severe, or
/// `value >= severe` when `severe_inclusive` is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpperBands {
    pub moderate: f64,
    pub severe: f64,
    #[serde(default)]
    pub severe_inclusive: bool,
}

impl UpperBands {
    pub const fn new(moderate: f64, severe: f64) -> Self {
        Self {
            moderate,
            severe,
            severe_inclusive: false,
        }
    }

    /// Bands whose severe edge is itself severe.
    pub const fn inclusive(moderate: f64, severe: f64) -> Self {
        Self {
            moderate,
            severe,
            severe_inclusive: true,
        }
    }

    pub fn classify(&self, value: f64) -> Severity {
        let severe = if self.severe_inclusive {
            value >= self.severe
        } else {
            value > self.severe
        };
        if severe {
            Severity::Severe
        } else if value >= self.moderate {
            Severity::Moderate
        } else {
            Severity::None
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        InputValidator::validate_finite(self.moderate, &format!("{name}.moderate"))?;
        InputValidator::validate_finite(self.severe, &format!("{name}.severe"))?;
        // A zero moderate edge would mark identical distributions as drifted.
        if self.moderate <= 0.0 || self.moderate > self.severe {
            return Err(DriftError::configuration(format!(
                "{name} bands must satisfy 0 < moderate <= severe, got {} / {}",
                self.moderate, self.severe
            )));
        }
        Ok(())
    }
}

/// Bands for p-values, where smaller values mean more drift.
///
/// `p < severe` is severe, `p <= moderate` is moderate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PValueBands {
    pub moderate: f64,
    pub severe: f64,
}

impl PValueBands {
    pub const fn new(moderate: f64, severe: f64) -> Self {
        Self { moderate, severe }
    }

    pub fn classify(&self, p_value: f64) -> Severity {
        if p_value < self.severe {
            Severity::Severe
        } else if p_value <= self.moderate {
            Severity::Moderate
        } else {
            Severity::None
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        InputValidator::validate_fraction(self.moderate, &format!("{name}.moderate"))?;
        InputValidator::validate_fraction(self.severe, &format!("{name}.severe"))?;
        if self.severe <= 0.0 || self.severe > self.moderate || self.moderate >= 1.0 {
            return Err(DriftError::configuration(format!(
                "{name} bands must satisfy 0 < severe <= moderate < 1, got {} / {}",
                self.moderate, self.severe
            )));
        }
        Ok(())
    }
}

/// Complete banding table for every test kind and the anomaly detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityBands {
    pub psi: UpperBands,
    pub p_value: PValueBands,
    pub jensen_shannon: UpperBands,
    pub anomaly_excess: UpperBands,
    pub missing_rate: UpperBands,
    pub duplicate_rate: UpperBands,
    pub outlier_rate: UpperBands,
}

impl Default for SeverityBands {
    fn default() -> Self {
        Self {
            psi: UpperBands::new(0.1, 0.25),
            p_value: PValueBands::new(0.05, 0.01),
            // Same relative cut points as PSI, on the [0, ln 2] JS range.
            jensen_shannon: UpperBands::new(0.1 * LN_2, 0.25 * LN_2),
            anomaly_excess: UpperBands::new(0.05, 0.15),
            missing_rate: UpperBands::inclusive(0.1, 0.5),
            duplicate_rate: UpperBands::inclusive(0.01, 0.05),
            outlier_rate: UpperBands::inclusive(0.01, 0.05),
        }
    }
}

impl SeverityBands {
    pub fn validate(&self) -> Result<()> {
        self.psi.validate("bands.psi")?;
        self.p_value.validate("bands.p_value")?;
        self.jensen_shannon.validate("bands.jensen_shannon")?;
        self.anomaly_excess.validate("bands.anomaly_excess")?;
        self.missing_rate.validate("bands.missing_rate")?;
        self.duplicate_rate.validate("bands.duplicate_rate")?;
        self.outlier_rate.validate("bands.outlier_rate")?;
        Ok(())
    }
}

/// Maps test statistics to severity tiers. Pure and cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct SeverityClassifier {
    bands: SeverityBands,
}

impl SeverityClassifier {
    pub fn new(bands: SeverityBands) -> Self {
        Self { bands }
    }

    pub fn bands(&self) -> &SeverityBands {
        &self.bands
    }

    /// Classifies one executed test.
    pub fn classify(&self, test: TestKind, statistic: &TestStatistic) -> Severity {
        match test {
            TestKind::KolmogorovSmirnov | TestKind::ChiSquare => statistic
                .p_value()
                .map(|p| self.bands.p_value.classify(p))
                .unwrap_or_default(),
            TestKind::PopulationStabilityIndex => self.bands.psi.classify(statistic.statistic),
            TestKind::JensenShannon => self.bands.jensen_shannon.classify(statistic.statistic),
            TestKind::MissingValues => self.bands.missing_rate.classify(statistic.statistic),
            TestKind::Duplicates => self.bands.duplicate_rate.classify(statistic.statistic),
            TestKind::Outliers => self.bands.outlier_rate.classify(statistic.statistic),
        }
    }

    /// Classifies the excess anomalous fraction of current over baseline.
    ///
    /// A current dataset that is *less* anomalous than its baseline is never drift.
    pub fn classify_anomaly(&self, excess_fraction: f64) -> Severity {
        self.bands.anomaly_excess.classify(excess_fraction.max(0.0))
    }

    /// Worst tier over the non-skipped results. Worst-case wins.
    pub fn combine(results: &[TestResult]) -> Severity {
        Severity::worst(
            results
                .iter()
                .filter(|r| !r.is_skipped())
                .map(TestResult::severity),
        )
    }
}
