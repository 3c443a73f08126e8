//! Weighted 0-100 data quality score.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DriftError, Result};
use crate::security::InputValidator;

/// Component weights. They are normalized to sum to 100 before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityWeights {
    pub missing: f64,
    pub duplicates: f64,
    pub outliers: f64,
    pub schema: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            missing: 30.0,
            duplicates: 25.0,
            outliers: 25.0,
            schema: 20.0,
        }
    }
}

impl QualityWeights {
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [
            ("weights.missing", self.missing),
            ("weights.duplicates", self.duplicates),
            ("weights.outliers", self.outliers),
            ("weights.schema", self.schema),
        ] {
            InputValidator::validate_finite(weight, name)?;
            if weight < 0.0 {
                return Err(DriftError::configuration(format!(
                    "{name} must not be negative, got {weight}"
                )));
            }
        }
        if self.total() <= 0.0 {
            return Err(DriftError::configuration("quality weights must not all be zero"));
        }
        Ok(())
    }

    fn total(&self) -> f64 {
        self.missing + self.duplicates + self.outliers + self.schema
    }

    /// Weights rescaled to sum to 100.
    pub fn normalized(&self) -> Self {
        let total = self.total();
        if (total - 100.0).abs() < f64::EPSILON || total <= 0.0 {
            return *self;
        }
        let scale = 100.0 / total;
        Self {
            missing: self.missing * scale,
            duplicates: self.duplicates * scale,
            outliers: self.outliers * scale,
            schema: self.schema * scale,
        }
    }
}

/// Letter-style grade for a quality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityGrade {
    Critical,
    Poor,
    Fair,
    Good,
    VeryGood,
    Excellent,
}

impl QualityGrade {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => Self::Excellent,
            s if s >= 80.0 => Self::VeryGood,
            s if s >= 70.0 => Self::Good,
            s if s >= 60.0 => Self::Fair,
            s if s >= 50.0 => Self::Poor,
            _ => Self::Critical,
        }
    }
}

impl fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Excellent => "Excellent",
            Self::VeryGood => "Very Good",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
            Self::Critical => "Critical",
        };
        f.write_str(label)
    }
}

/// Percentages measured by the quality checks, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QualityMeasurements {
    pub missing_percentage: f64,
    pub duplicate_percentage: f64,
    pub outlier_percentage: f64,
    /// Share of columns whose declared type is backed by data.
    pub schema_consistency: f64,
}

/// One weighted component of the score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub score: f64,
    pub weight: f64,
    pub contribution: f64,
}

impl ScoreComponent {
    fn new(score: f64, weight: f64) -> Self {
        Self {
            score: round2(score),
            weight,
            contribution: round2(score * weight / 100.0),
        }
    }
}

/// Overall score with its per-component breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub overall: f64,
    pub grade: QualityGrade,
    pub missing_values: ScoreComponent,
    pub duplicates: ScoreComponent,
    pub outliers: ScoreComponent,
    pub schema_consistency: ScoreComponent,
}

#[derive(Debug, Clone, Copy)]
pub struct QualityScorer {
    weights: QualityWeights,
}

impl QualityScorer {
    pub fn new(weights: QualityWeights) -> Self {
        Self {
            weights: weights.normalized(),
        }
    }

    pub fn weights(&self) -> &QualityWeights {
        &self.weights
    }

    pub fn score(&self, measurements: &QualityMeasurements) -> QualityScore {
        let missing = (100.0 - measurements.missing_percentage).clamp(0.0, 100.0);
        let duplicates = (100.0 - measurements.duplicate_percentage).clamp(0.0, 100.0);
        let outliers = (100.0 - measurements.outlier_percentage).clamp(0.0, 100.0);
        let schema = measurements.schema_consistency.clamp(0.0, 100.0);

        let w = &self.weights;
        let overall = round2(
            missing * w.missing / 100.0
                + duplicates * w.duplicates / 100.0
                + outliers * w.outliers / 100.0
                + schema * w.schema / 100.0,
        );
        let grade = QualityGrade::from_score(overall);
        debug!(overall, %grade, "Calculated quality score");

        QualityScore {
            overall,
            grade,
            missing_values: ScoreComponent::new(missing, w.missing),
            duplicates: ScoreComponent::new(duplicates, w.duplicates),
            outliers: ScoreComponent::new(outliers, w.outliers),
            schema_consistency: ScoreComponent::new(schema, w.schema),
        }
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new(QualityWeights::default())
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean() -> QualityMeasurements {
        QualityMeasurements {
            schema_consistency: 100.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_data_scores_100() {
        let score = QualityScorer::default().score(&clean());
        assert_eq!(score.overall, 100.0);
        assert_eq!(score.grade, QualityGrade::Excellent);
    }

    #[test]
    fn test_weighted_breakdown() {
        let measurements = QualityMeasurements {
            missing_percentage: 10.0,
            duplicate_percentage: 20.0,
            outlier_percentage: 4.0,
            schema_consistency: 100.0,
        };
        let score = QualityScorer::default().score(&measurements);
        // 90*0.30 + 80*0.25 + 96*0.25 + 100*0.20
        assert!((score.overall - 91.0).abs() < 1e-9);
        assert_eq!(score.missing_values.contribution, 27.0);
        assert_eq!(score.duplicates.contribution, 20.0);
        assert_eq!(score.outliers.contribution, 24.0);
        assert_eq!(score.schema_consistency.contribution, 20.0);
    }

    #[test]
    fn test_weights_are_normalized() {
        let scorer = QualityScorer::new(QualityWeights {
            missing: 1.0,
            duplicates: 1.0,
            outliers: 1.0,
            schema: 1.0,
        });
        assert_eq!(scorer.weights().missing, 25.0);
        let score = scorer.score(&QualityMeasurements {
            missing_percentage: 100.0,
            ..clean()
        });
        assert_eq!(score.overall, 75.0);
        assert_eq!(score.grade, QualityGrade::Good);
    }

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(QualityGrade::from_score(90.0), QualityGrade::Excellent);
        assert_eq!(QualityGrade::from_score(89.99), QualityGrade::VeryGood);
        assert_eq!(QualityGrade::from_score(70.0), QualityGrade::Good);
        assert_eq!(QualityGrade::from_score(60.0), QualityGrade::Fair);
        assert_eq!(QualityGrade::from_score(50.0), QualityGrade::Poor);
        assert_eq!(QualityGrade::from_score(49.99), QualityGrade::Critical);
        assert_eq!(QualityGrade::VeryGood.to_string(), "Very Good");
    }

    #[test]
    fn test_invalid_weights() {
        let negative = QualityWeights {
            missing: -1.0,
            ..Default::default()
        };
        assert!(negative.validate().is_err());
        let zero = QualityWeights {
            missing: 0.0,
            duplicates: 0.0,
            outliers: 0.0,
            schema: 0.0,
        };
        assert!(zero.validate().is_err());
        assert!(QualityWeights::default().validate().is_ok());
    }
}
