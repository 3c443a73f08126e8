//! Test selection policy.
//!
//! A fixed decision table maps a baseline/current profile pair to the tests
//! that apply. The selector is pure: identical inputs always produce identical
//! selections, and it never looks at the data itself.

use serde::{Deserialize, Serialize};

use crate::analyzers::profiler::{FeatureKind, FeatureProfile};
use crate::core::{DriftConfig, SkipReason, TestKind};

/// Whether a candidate test runs or is skipped up front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestDecision {
    Run(TestKind),
    Skip(TestKind, SkipReason),
}

impl TestDecision {
    pub fn test(&self) -> TestKind {
        match self {
            Self::Run(test) | Self::Skip(test, _) => *test,
        }
    }
}

/// Selection for one feature, one decision per candidate test in a stable order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSelection {
    pub feature: String,
    pub kind: FeatureKind,
    pub decisions: Vec<TestDecision>,
}

impl TestSelection {
    pub fn selected(&self) -> impl Iterator<Item = TestKind> + '_ {
        self.decisions.iter().filter_map(|d| match d {
            TestDecision::Run(test) => Some(*test),
            TestDecision::Skip(..) => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (TestKind, &SkipReason)> + '_ {
        self.decisions.iter().filter_map(|d| match d {
            TestDecision::Skip(test, reason) => Some((*test, reason)),
            TestDecision::Run(_) => None,
        })
    }

    pub fn has_runnable_tests(&self) -> bool {
        self.selected().next().is_some()
    }

    /// True when the feature is not tested for drift at all.
    pub fn is_excluded(&self) -> bool {
        self.kind == FeatureKind::Excluded
    }

    /// True when every candidate test was skipped for excessive missingness.
    pub fn is_missing_rate_excluded(&self) -> bool {
        !self.decisions.is_empty()
            && self
                .skipped()
                .all(|(_, r)| matches!(r, SkipReason::MissingRateExceeded { .. }))
            && !self.has_runnable_tests()
    }
}

/// Maps feature profiles to the tests that apply to them.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSelector {
    min_sample_size: usize,
    max_categorical_cardinality: usize,
    missing_rate_max: f64,
}

impl TestSelector {
    pub fn new(min_sample_size: usize, max_categorical_cardinality: usize, missing_rate_max: f64) -> Self {
        Self {
            min_sample_size,
            max_categorical_cardinality,
            missing_rate_max,
        }
    }

    pub fn from_config(config: &DriftConfig) -> Self {
        Self::new(
            config.min_sample_size,
            config.max_categorical_cardinality,
            config.missing_rate_max,
        )
    }

    /// Decides which tests run for one feature.
    ///
    /// The drift kind comes from the baseline profile; the pair was aligned by
    /// the profiler so both sides agree.
    pub fn select(&self, baseline: &FeatureProfile, current: &FeatureProfile) -> TestSelection {
        let candidates: &[TestKind] = match baseline.kind {
            FeatureKind::Numeric => &[TestKind::KolmogorovSmirnov, TestKind::PopulationStabilityIndex],
            FeatureKind::Categorical => &[TestKind::ChiSquare, TestKind::JensenShannon],
            FeatureKind::Excluded => &[],
        };

        let missing_rate = baseline.missing_rate.max(current.missing_rate);
        let decisions = if missing_rate > self.missing_rate_max {
            candidates
                .iter()
                .map(|&test| {
                    TestDecision::Skip(
                        test,
                        SkipReason::MissingRateExceeded {
                            missing_rate,
                            maximum: self.missing_rate_max,
                        },
                    )
                })
                .collect()
        } else {
            candidates
                .iter()
                .map(|&test| self.decide(test, baseline, current))
                .collect()
        };

        TestSelection {
            feature: baseline.name.clone(),
            kind: baseline.kind,
            decisions,
        }
    }

    fn decide(&self, test: TestKind, baseline: &FeatureProfile, current: &FeatureProfile) -> TestDecision {
        match test {
            TestKind::KolmogorovSmirnov => {
                let sample_size = baseline.sample_size.min(current.sample_size);
                if sample_size < self.min_sample_size {
                    TestDecision::Skip(
                        test,
                        SkipReason::SampleBelowMinimum {
                            sample_size,
                            minimum: self.min_sample_size,
                        },
                    )
                } else {
                    TestDecision::Run(test)
                }
            }
            TestKind::ChiSquare => {
                let cardinality = baseline
                    .cardinality
                    .unwrap_or(0)
                    .max(current.cardinality.unwrap_or(0));
                if cardinality > self.max_categorical_cardinality {
                    TestDecision::Skip(
                        test,
                        SkipReason::CardinalityExceedsCeiling {
                            cardinality,
                            ceiling: self.max_categorical_cardinality,
                        },
                    )
                } else {
                    TestDecision::Run(test)
                }
            }
            _ => TestDecision::Run(test),
        }
    }

    /// Numeric features eligible for multivariate anomaly detection, in order.
    ///
    /// Excludes features whose drift tests were all skipped for missingness.
    pub fn anomaly_features(&self, selections: &[TestSelection]) -> Vec<String> {
        selections
            .iter()
            .filter(|s| s.kind == FeatureKind::Numeric && !s.is_missing_rate_excluded())
            .map(|s| s.feature.clone())
            .collect()
    }
}
