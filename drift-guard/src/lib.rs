//! # drift-guard - Drift and Data-Quality Decisions for Rust
//!
//! drift-guard compares a *current* dataset against a versioned *baseline*
//! and decides, per feature and overall, whether the data has drifted. Every
//! test result is classified into one of three tiers (`none`, `moderate`,
//! `severe`) and the worst tier wins. Data lives in Arrow record batches;
//! dataset-wide aggregates run through DataFusion.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use drift_guard::prelude::*;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryBaselineStore::new());
//!
//! let baseline = Dataset::builder("january", DatasetOrigin::Baseline)
//!     .float("latency_ms", (0..500i32).map(|i| f64::from(i % 50)))
//!     .string("region", (0..500).map(|i| Some(if i % 3 == 0 { "eu" } else { "us" })))
//!     .build()?;
//! let version = store.register_baseline(baseline, Some("January traffic")).await?;
//!
//! let current = Dataset::builder("february", DatasetOrigin::Current)
//!     .float("latency_ms", (0..500i32).map(|i| f64::from(i % 50) + 20.0))
//!     .string("region", (0..500).map(|i| Some(if i % 3 == 0 { "eu" } else { "us" })))
//!     .build()?;
//!
//! let engine = DriftEngine::new(store);
//! let report = engine
//!     .run_drift_check(&version.version_id, current, DriftConfig::default())
//!     .await?;
//!
//! if report.has_drift() {
//!     println!("{}", HumanFormatter::new().format(&report)?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Tests
//!
//! | Feature kind | Tests |
//! |--------------|-------|
//! | numeric | Kolmogorov-Smirnov, Population Stability Index |
//! | categorical, boolean, low-cardinality integer | Chi-Square, Jensen-Shannon |
//! | datetime | excluded |
//!
//! Tests that cannot run (too few samples, too many categories, too many
//! missing values, a constant column) are recorded as *skipped* with a reason
//! and never count toward severity.
//!
//! A multivariate anomaly detector (an isolation forest by default) fits on
//! the baseline's numeric features and compares anomaly rates. Optional
//! quality checks look at missing values, duplicate rows and outliers in the
//! current dataset and roll up to a 0-100 quality score.
//!
//! ## Determinism
//!
//! Given the same inputs, configuration and [`core::Clock`], a run produces a
//! byte-identical [`core::DriftReport`]. Work is spread over Tokio's blocking
//! pool, but results are collected in column order and every random source is
//! seeded from the configuration.
//!
//! ## Architecture
//!
//! - **`dataset`**: Arrow-backed datasets and column categories
//! - **`analyzers`**: profiler, test selector, statistical tests, anomaly detectors
//! - **`quality`**: missing values, duplicates, outliers, quality score
//! - **`core`**: configuration, severity classification, results, reports and the engine
//! - **`repository`**: baseline versions and persisted reports
//! - **`formatters`**: JSON, console and Markdown renderings of a report
//! - **`logging`** / **`security`**: structured logging helpers and input validation

pub mod analyzers;
pub mod core;
pub mod dataset;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod quality;
pub mod repository;
pub mod security;
