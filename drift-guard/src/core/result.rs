//! Per-test outcome types shared by the statistical library, quality checks and reports.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::severity::Severity;
use crate::dataset::ColumnType;

/// Feature label used for results that apply to the whole dataset.
pub const DATASET_SCOPE: &str = "<dataset>";

/// Identifies a statistical test or quality check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TestKind {
    #[serde(rename = "ks")]
    KolmogorovSmirnov,
    #[serde(rename = "psi")]
    PopulationStabilityIndex,
    #[serde(rename = "chi_square")]
    ChiSquare,
    #[serde(rename = "jensen_shannon")]
    JensenShannon,
    #[serde(rename = "missing_values")]
    MissingValues,
    #[serde(rename = "duplicates")]
    Duplicates,
    #[serde(rename = "outliers")]
    Outliers,
}

impl TestKind {
    /// Stable identifier, identical to the serialized form.
    pub fn id(&self) -> &'static str {
        match self {
            Self::KolmogorovSmirnov => "ks",
            Self::PopulationStabilityIndex => "psi",
            Self::ChiSquare => "chi_square",
            Self::JensenShannon => "jensen_shannon",
            Self::MissingValues => "missing_values",
            Self::Duplicates => "duplicates",
            Self::Outliers => "outliers",
        }
    }

    /// True for data-quality checks, false for distribution-drift tests.
    pub fn is_quality_check(&self) -> bool {
        matches!(
            self,
            Self::MissingValues | Self::Duplicates | Self::Outliers
        )
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Secondary value reported next to a test statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Ancillary {
    /// Probability of a statistic at least this extreme under "no drift".
    PValue(f64),
    /// Divergence magnitude, for tests without a p-value.
    Divergence(f64),
    /// Number of offending rows or values.
    Count(u64),
}

/// Raw output of a statistical test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestStatistic {
    pub statistic: f64,
    pub ancillary: Ancillary,
}

impl TestStatistic {
    pub fn with_p_value(statistic: f64, p_value: f64) -> Self {
        Self {
            statistic,
            ancillary: Ancillary::PValue(p_value),
        }
    }

    pub fn divergence(statistic: f64) -> Self {
        Self {
            statistic,
            ancillary: Ancillary::Divergence(statistic),
        }
    }

    pub fn fraction_with_count(fraction: f64, count: u64) -> Self {
        Self {
            statistic: fraction,
            ancillary: Ancillary::Count(count),
        }
    }

    pub fn p_value(&self) -> Option<f64> {
        match self.ancillary {
            Ancillary::PValue(p) => Some(p),
            _ => None,
        }
    }
}

/// Why a test did not run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum SkipReason {
    SampleBelowMinimum { sample_size: usize, minimum: usize },
    CardinalityExceedsCeiling { cardinality: usize, ceiling: usize },
    MissingRateExceeded { missing_rate: f64, maximum: f64 },
    DegenerateDistribution { distinct_values: usize },
    EmptySample,
    InsufficientNumericFeatures { found: usize },
    InsufficientRows { rows: usize, minimum: usize },
    UnsupportedColumnType { column_type: ColumnType },
}

impl SkipReason {
    /// Short machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::SampleBelowMinimum { .. } => "sample size below minimum",
            Self::CardinalityExceedsCeiling { .. } => "cardinality exceeds ceiling",
            Self::MissingRateExceeded { .. } => "missing rate exceeds maximum",
            Self::DegenerateDistribution { .. } => "fewer than 2 distinct values",
            Self::EmptySample => "empty sample",
            Self::InsufficientNumericFeatures { .. } => "fewer than 2 numeric features",
            Self::InsufficientRows { .. } => "insufficient rows",
            Self::UnsupportedColumnType { .. } => "column type not tested for drift",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SampleBelowMinimum {
                sample_size,
                minimum,
            } => write!(f, "{} ({sample_size} < {minimum})", self.reason()),
            Self::CardinalityExceedsCeiling {
                cardinality,
                ceiling,
            } => write!(f, "{} ({cardinality} > {ceiling})", self.reason()),
            Self::MissingRateExceeded {
                missing_rate,
                maximum,
            } => write!(f, "{} ({missing_rate:.4} > {maximum:.4})", self.reason()),
            Self::DegenerateDistribution { distinct_values } => {
                write!(f, "{} ({distinct_values})", self.reason())
            }
            Self::InsufficientNumericFeatures { found } => {
                write!(f, "{} ({found})", self.reason())
            }
            Self::InsufficientRows { rows, minimum } => {
                write!(f, "{} ({rows} < {minimum})", self.reason())
            }
            Self::UnsupportedColumnType { column_type } => {
                write!(f, "{} ({column_type})", self.reason())
            }
            Self::EmptySample => write!(f, "{}", self.reason()),
        }
    }
}

/// Outcome of a single statistical test before severity is attached.
pub type StatOutcome = std::result::Result<TestStatistic, SkipReason>;

/// One test applied to one feature (or to the whole dataset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    feature: String,
    test: TestKind,
    statistic: Option<TestStatistic>,
    severity: Severity,
    skipped: Option<SkipReason>,
}

impl TestResult {
    /// A test that ran and was classified.
    pub fn executed(
        feature: impl Into<String>,
        test: TestKind,
        statistic: TestStatistic,
        severity: Severity,
    ) -> Self {
        Self {
            feature: feature.into(),
            test,
            statistic: Some(statistic),
            severity,
            skipped: None,
        }
    }

    /// A test that did not run. Skipped tests never contribute severity.
    pub fn skipped(feature: impl Into<String>, test: TestKind, reason: SkipReason) -> Self {
        Self {
            feature: feature.into(),
            test,
            statistic: None,
            severity: Severity::None,
            skipped: Some(reason),
        }
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    pub fn test(&self) -> TestKind {
        self.test
    }

    pub fn statistic(&self) -> Option<f64> {
        self.statistic.map(|s| s.statistic)
    }

    pub fn ancillary(&self) -> Option<Ancillary> {
        self.statistic.map(|s| s.ancillary)
    }

    pub fn p_value(&self) -> Option<f64> {
        self.statistic.and_then(|s| s.p_value())
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        self.skipped.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_ids_match_serialization() {
        for kind in [
            TestKind::KolmogorovSmirnov,
            TestKind::PopulationStabilityIndex,
            TestKind::ChiSquare,
            TestKind::JensenShannon,
            TestKind::MissingValues,
            TestKind::Duplicates,
            TestKind::Outliers,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.id()));
        }
    }

    #[test]
    fn test_skipped_result_has_no_severity() {
        let result = TestResult::skipped(
            "city",
            TestKind::ChiSquare,
            SkipReason::CardinalityExceedsCeiling {
                cardinality: 500,
                ceiling: 50,
            },
        );
        assert!(result.is_skipped());
        assert_eq!(result.severity(), Severity::None);
        assert_eq!(result.statistic(), None);
        assert_eq!(
            result.skip_reason().map(SkipReason::reason),
            Some("cardinality exceeds ceiling")
        );
    }

    #[test]
    fn test_skip_reason_serializes_with_code() {
        let json = serde_json::to_value(SkipReason::SampleBelowMinimum {
            sample_size: 5,
            minimum: 30,
        })
        .unwrap();
        assert_eq!(json["code"], "sample_below_minimum");
        assert_eq!(json["minimum"], 30);
    }

    #[test]
    fn test_p_value_accessor() {
        let result = TestResult::executed(
            "age",
            TestKind::KolmogorovSmirnov,
            TestStatistic::with_p_value(0.12, 0.4),
            Severity::None,
        );
        assert_eq!(result.p_value(), Some(0.4));

        let psi = TestResult::executed(
            "age",
            TestKind::PopulationStabilityIndex,
            TestStatistic::divergence(0.3),
            Severity::Severe,
        );
        assert_eq!(psi.p_value(), None);
        assert_eq!(psi.ancillary(), Some(Ancillary::Divergence(0.3)));
    }
}
