//! Analysis stages that run before severity classification.
//!
//! ## Stages
//!
//! - **Feature profiler** (`profiler`): column categories, missing rates,
//!   sample sizes and cardinalities for a baseline/current pair
//! - **Test selector** (`selector`): a fixed decision table choosing which
//!   statistical tests apply to each feature
//! - **Statistical tests** (`statistics`): KS, PSI, Chi-Square and
//!   Jensen-Shannon as pure functions
//! - **Anomaly detection** (`anomaly`): multivariate detectors fitted on the
//!   baseline's numeric features
//!
//! ```text
//! Dataset pair ──► FeatureProfiler ──► TestSelector ──┬─► statistics (per feature)
//!                                                     └─► anomaly (per dataset)
//! ```

pub mod anomaly;
pub mod profiler;
pub mod selector;
pub mod statistics;

pub use anomaly::{
    AnomalyDetector, AnomalyOutcome, AnomalyResult, AnomalyScore, DetectorSettings,
    FeatureMatrix, IsolationForest, MultivariateDetector, ZScoreDetector,
};
pub use profiler::{FeatureKind, FeatureProfile, FeatureProfiler, FeatureProfiles, ProfilePair};
pub use selector::{TestDecision, TestSelection, TestSelector};
