//! Statistical test library.
//!
//! Every function here is pure: it takes owned or borrowed samples and returns
//! a [`StatOutcome`](crate::core::StatOutcome) without touching shared state,
//! so the engine can run features in parallel on the blocking pool.
//!
//! | Test | Input | Statistic | Ancillary |
//! |---|---|---|---|
//! | [`ks_test`] | numeric | max ECDF gap | p-value |
//! | [`psi_test`] | numeric | PSI | divergence |
//! | [`chi_square_test`] | categorical | Pearson X² | p-value |
//! | [`jensen_shannon_categorical`] | categorical | JS (nats) | divergence |

pub mod chi_square;
pub mod distribution;
pub mod jensen_shannon;
pub mod ks;
pub mod psi;

pub use chi_square::{category_counts, chi_square_from_counts, chi_square_test};
pub use jensen_shannon::{
    jensen_shannon_binned, jensen_shannon_categorical, jensen_shannon_from_counts,
};
pub use ks::{ks_statistic, ks_test};
pub use psi::{bin_counts, psi_test, quantile_edges};

use crate::analyzers::profiler::FeatureKind;
use crate::analyzers::selector::{TestDecision, TestSelection};
use crate::core::{DriftConfig, SeverityClassifier, StatOutcome, TestKind, TestResult};
use crate::dataset::Dataset;
use crate::error::{DriftError, Result};

/// Samples of one feature from both datasets, missing values removed.
enum FeatureSamples {
    Numeric { baseline: Vec<f64>, current: Vec<f64> },
    Categorical { baseline: Vec<String>, current: Vec<String> },
}

impl FeatureSamples {
    fn extract(baseline: &Dataset, current: &Dataset, selection: &TestSelection) -> Result<Self> {
        let name = selection.feature.as_str();
        match selection.kind {
            FeatureKind::Numeric => Ok(Self::Numeric {
                baseline: baseline.numeric_values(name)?.into_iter().flatten().collect(),
                current: current.numeric_values(name)?.into_iter().flatten().collect(),
            }),
            FeatureKind::Categorical => Ok(Self::Categorical {
                baseline: baseline
                    .categorical_values(name)?
                    .into_iter()
                    .flatten()
                    .collect(),
                current: current
                    .categorical_values(name)?
                    .into_iter()
                    .flatten()
                    .collect(),
            }),
            FeatureKind::Excluded => Err(DriftError::Internal(format!(
                "feature '{name}' is excluded from drift tests"
            ))),
        }
    }

    fn run(&self, test: TestKind, config: &DriftConfig) -> Result<StatOutcome> {
        let outcome = match (self, test) {
            (Self::Numeric { baseline, current }, TestKind::KolmogorovSmirnov) => {
                ks_test(baseline, current)
            }
            (Self::Numeric { baseline, current }, TestKind::PopulationStabilityIndex) => {
                psi_test(baseline, current, config.psi_bins, config.smoothing_epsilon)
            }
            (Self::Numeric { baseline, current }, TestKind::JensenShannon) => {
                jensen_shannon_binned(baseline, current, config.psi_bins, config.smoothing_epsilon)
            }
            (Self::Categorical { baseline, current }, TestKind::ChiSquare) => {
                chi_square_test(baseline, current)
            }
            (Self::Categorical { baseline, current }, TestKind::JensenShannon) => {
                jensen_shannon_categorical(baseline, current, config.smoothing_epsilon)
            }
            (_, test) => {
                return Err(DriftError::Internal(format!(
                    "test '{test}' does not apply to this feature kind"
                )))
            }
        };
        Ok(outcome)
    }
}

/// Executes a feature's selected tests, in selection order, and classifies them.
///
/// Tests the selector skipped, and tests that turn out to be undefined on the
/// data, come back as skipped results.
pub fn run_selected_tests(
    baseline: &Dataset,
    current: &Dataset,
    selection: &TestSelection,
    config: &DriftConfig,
    classifier: &SeverityClassifier,
) -> Result<Vec<TestResult>> {
    let samples = if selection.has_runnable_tests() {
        Some(FeatureSamples::extract(baseline, current, selection)?)
    } else {
        None
    };

    let mut results = Vec::with_capacity(selection.decisions.len());
    for decision in &selection.decisions {
        let result = match (decision, &samples) {
            (TestDecision::Run(test), Some(samples)) => match samples.run(*test, config)? {
                Ok(statistic) => TestResult::executed(
                    &selection.feature,
                    *test,
                    statistic,
                    classifier.classify(*test, &statistic),
                ),
                Err(reason) => TestResult::skipped(&selection.feature, *test, reason),
            },
            (TestDecision::Skip(test, reason), _) => {
                TestResult::skipped(&selection.feature, *test, reason.clone())
            }
            (TestDecision::Run(test), None) => {
                return Err(DriftError::Internal(format!(
                    "no samples extracted for '{}' test on '{}'",
                    test, selection.feature
                )))
            }
        };
        results.push(result);
    }
    Ok(results)
}
