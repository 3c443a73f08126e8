//! Missing-value check.

use crate::analyzers::profiler::FeatureProfile;
use crate::core::{SeverityClassifier, TestKind, TestResult, TestStatistic};

/// Missing-rate result for one feature, straight from its profile.
pub fn missing_value_result(profile: &FeatureProfile, classifier: &SeverityClassifier) -> TestResult {
    let statistic =
        TestStatistic::fraction_with_count(profile.missing_rate, profile.missing_count as u64);
    TestResult::executed(
        &profile.name,
        TestKind::MissingValues,
        statistic,
        classifier.classify(TestKind::MissingValues, &statistic),
    )
}

/// Dataset-wide missing cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissingValueSummary {
    pub missing_cells: usize,
    pub total_cells: usize,
}

impl MissingValueSummary {
    pub fn from_profiles<'a>(profiles: impl IntoIterator<Item = &'a FeatureProfile>) -> Self {
        profiles
            .into_iter()
            .fold(Self { missing_cells: 0, total_cells: 0 }, |acc, p| Self {
                missing_cells: acc.missing_cells + p.missing_count,
                total_cells: acc.total_cells + p.row_count,
            })
    }

    /// Missing share of all cells, in percent.
    pub fn percentage(&self) -> f64 {
        if self.total_cells == 0 {
            0.0
        } else {
            self.missing_cells as f64 / self.total_cells as f64 * 100.0
        }
    }
}
