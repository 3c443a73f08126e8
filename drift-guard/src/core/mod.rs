//! Core types of the drift engine.
//!
//! ## Overview
//!
//! - **[`DriftEngine`]**: resolves a baseline, runs every stage under a
//!   deadline and persists the report
//! - **[`DriftConfig`]**: thresholds, seeds and limits for one run
//! - **[`TestResult`]**: one test on one feature, executed or skipped
//! - **[`SeverityClassifier`]**: maps statistics to [`Severity`] tiers
//! - **[`ReportAggregator`]** / **[`DriftReport`]**: the immutable output
//!
//! ## Architecture
//!
//! ```text
//! DriftEngine::run_drift_check
//!     ├── BaselineStore::resolve
//!     ├── FeatureProfiler ─► TestSelector
//!     │       ├── statistical tests (blocking pool, max_workers)
//!     │       └── anomaly detector (blocking pool)
//!     ├── quality checks (opt-in)
//!     ├── ReportAggregator ─► DriftReport
//!     └── BaselineStore::persist
//! ```
//!
//! ## Severity
//!
//! Tiers are ordered `none < moderate < severe`. A feature's severity is the
//! worst of its executed tests; the report's overall severity is the worst of
//! all features, dataset-level checks and the anomaly result. Skipped tests
//! never contribute.

pub mod clock;
pub mod config;
pub mod engine;
pub mod report;
pub mod result;
pub mod severity;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{DriftConfig, DriftConfigBuilder};
pub use engine::{DriftEngine, DriftEngineBuilder};
pub use report::{DriftReport, ExcludedFeature, FeatureResults, ReportAggregator, TierCounts};
pub use result::{
    Ancillary, SkipReason, StatOutcome, TestKind, TestResult, TestStatistic, DATASET_SCOPE,
};
pub use severity::{PValueBands, Severity, SeverityBands, SeverityClassifier, UpperBands};
