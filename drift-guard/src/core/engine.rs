//! The drift check entry point.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::analyzers::anomaly::{
    AnomalyDetector, AnomalyResult, DetectorSettings, IsolationForest, MultivariateDetector,
};
use crate::analyzers::profiler::{FeatureProfile, FeatureProfiler};
use crate::analyzers::selector::{TestSelection, TestSelector};
use crate::analyzers::statistics::run_selected_tests;
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::DriftConfig;
use crate::core::report::{DriftReport, ExcludedFeature, FeatureResults, ReportAggregator};
use crate::core::result::{SkipReason, TestResult};
use crate::core::severity::SeverityClassifier;
use crate::dataset::{Dataset, DatasetOrigin};
use crate::error::{DriftError, Result};
use crate::logging::{truncate_field, LogConfig};
use crate::quality::QualityChecker;
use crate::repository::BaselineStore;
use crate::{log_data_op, log_test, perf_debug};

/// Runs drift checks against baselines held in a [`BaselineStore`].
///
/// Each run resolves the baseline once, computes everything under the
/// configured deadline and persists the finished report once. Configuration
/// is passed per run; the engine itself holds no per-run state.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use drift_guard::prelude::*;
///
/// let store = Arc::new(InMemoryBaselineStore::new());
/// let version = store.register_baseline(baseline, None).await?;
///
/// let engine = DriftEngine::builder(store.clone()).build();
/// let report = engine
///     .run_drift_check(&version.version_id, current, DriftConfig::default())
///     .await?;
///
/// for feature in report.drifted_features() {
///     println!("{feature} drifted");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DriftEngine {
    store: Arc<dyn BaselineStore>,
    detector: Arc<dyn MultivariateDetector>,
    clock: Arc<dyn Clock>,
    log_config: LogConfig,
}

/// Builder for [`DriftEngine`].
#[derive(Debug)]
pub struct DriftEngineBuilder {
    store: Arc<dyn BaselineStore>,
    detector: Arc<dyn MultivariateDetector>,
    clock: Arc<dyn Clock>,
    log_config: LogConfig,
}

impl DriftEngineBuilder {
    /// Multivariate detector; the isolation forest by default.
    pub fn detector(mut self, detector: Arc<dyn MultivariateDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Clock stamping `generated_at`; the system clock by default.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn build(self) -> DriftEngine {
        DriftEngine {
            store: self.store,
            detector: self.detector,
            clock: self.clock,
            log_config: self.log_config,
        }
    }
}

impl DriftEngine {
    pub fn builder(store: Arc<dyn BaselineStore>) -> DriftEngineBuilder {
        DriftEngineBuilder {
            store,
            detector: Arc::new(IsolationForest),
            clock: Arc::new(SystemClock),
            log_config: LogConfig::default(),
        }
    }

    pub fn new(store: Arc<dyn BaselineStore>) -> Self {
        Self::builder(store).build()
    }

    pub fn store(&self) -> &Arc<dyn BaselineStore> {
        &self.store
    }

    /// Compares `current` with a stored baseline and persists the report.
    ///
    /// The configuration is validated before any data is touched. Baseline
    /// resolution and all computation share the `timeout_ms` deadline; when it
    /// expires the run fails with [`DriftError::Timeout`] and nothing is
    /// persisted. Persistence happens after the deadline check.
    #[instrument(skip(self, current, config), fields(baseline = %baseline_version_id, current.id = %current.id()))]
    pub async fn run_drift_check(
        &self,
        baseline_version_id: &str,
        current: Dataset,
        config: DriftConfig,
    ) -> Result<DriftReport> {
        config.validate()?;
        let started = Instant::now();
        let limit_ms = config.timeout_ms;
        info!(
            rows = current.row_count(),
            columns = current.columns().len(),
            timeout_ms = limit_ms,
            "Starting drift check"
        );

        let work = async {
            let snapshot = self.store.resolve(baseline_version_id).await?;
            log_data_op!(
                self.log_config,
                version_id = %snapshot.version.version_id,
                rows = snapshot.dataset.row_count(),
                "Resolved baseline"
            );
            self.evaluate(baseline_version_id, snapshot.dataset, current, config)
                .await
        };
        let report = with_deadline(limit_ms, work).await?;

        let report_id = self.store.persist(&report).await?;
        log_data_op!(self.log_config, report_id = %report_id, "Persisted drift report");

        info!(
            report_id = %report_id,
            overall_severity = %report.overall_severity(),
            drifted = report.drifted_features().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Drift check complete"
        );
        Ok(report)
    }

    /// Compares two datasets the caller already holds. Nothing is persisted.
    #[instrument(skip(self, baseline, current, config), fields(baseline = %baseline_version_id, current.id = %current.id()))]
    pub async fn check_datasets(
        &self,
        baseline_version_id: &str,
        baseline: Dataset,
        current: Dataset,
        config: DriftConfig,
    ) -> Result<DriftReport> {
        config.validate()?;
        let limit_ms = config.timeout_ms;
        with_deadline(
            limit_ms,
            self.evaluate(baseline_version_id, baseline, current, config),
        )
        .await
    }

    async fn evaluate(
        &self,
        baseline_version_id: &str,
        baseline: Dataset,
        current: Dataset,
        config: DriftConfig,
    ) -> Result<DriftReport> {
        let baseline = Arc::new(baseline.with_origin(DatasetOrigin::Baseline));
        let current = Arc::new(current.with_origin(DatasetOrigin::Current));
        let config = Arc::new(config);
        let classifier = SeverityClassifier::new(config.bands.clone());

        let pair = FeatureProfiler::from_config(&config).profile_pair(&baseline, &current)?;
        log_data_op!(
            self.log_config,
            features = pair.baseline.len(),
            "Profiled feature pair"
        );

        let selector = TestSelector::from_config(&config);
        let planned: Vec<(FeatureProfile, FeatureProfile, TestSelection)> = pair
            .iter()
            .map(|(b, c)| (b.clone(), c.clone(), selector.select(b, c)))
            .collect();
        let selections: Vec<TestSelection> = planned.iter().map(|(_, _, s)| s.clone()).collect();

        let anomaly_features = selector.anomaly_features(&selections);
        perf_debug!(self.log_config, features = ?anomaly_features, "Anomaly feature set");
        let anomaly_detector =
            AnomalyDetector::new(self.detector.clone(), DetectorSettings::from_config(&config));
        let anomaly_task = self.spawn_anomaly(
            &anomaly_detector,
            &baseline,
            &current,
            &anomaly_features,
            &classifier,
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers));
        let mut feature_tasks: Vec<(FeatureProfile, FeatureProfile, JoinHandle<Result<Vec<TestResult>>>)> =
            Vec::new();
        let mut excluded = Vec::new();
        for (baseline_profile, current_profile, selection) in planned {
            if selection.is_excluded() {
                excluded.push(ExcludedFeature {
                    feature: selection.feature,
                    column_type: baseline_profile.column_type,
                    reason: SkipReason::UnsupportedColumnType {
                        column_type: baseline_profile.column_type,
                    },
                });
                continue;
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| DriftError::Internal(format!("worker pool closed: {e}")))?;
            let (b, c, cfg, cls) = (
                baseline.clone(),
                current.clone(),
                config.clone(),
                classifier.clone(),
            );
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                run_selected_tests(&b, &c, &selection, &cfg, &cls)
            });
            feature_tasks.push((baseline_profile, current_profile, handle));
        }

        let mut aggregator = ReportAggregator::new(
            baseline_version_id,
            current.id(),
            (*config).clone(),
            self.clock.now(),
        );

        // Fan in by column position; try_join_all keeps input order.
        let (profiles, handles): (Vec<_>, Vec<_>) = feature_tasks
            .into_iter()
            .map(|(b, c, handle)| ((b, c), handle))
            .unzip();
        let outcomes = try_join_all(handles).await.map_err(join_error)?;
        for ((baseline_profile, current_profile), results) in profiles.into_iter().zip(outcomes) {
            let results = results?;
            for result in &results {
                log_test!(
                    self.log_config,
                    feature = %result.feature(),
                    test = %result.test(),
                    statistic = ?result.statistic(),
                    severity = %result.severity(),
                    skip_reason = ?result
                        .skip_reason()
                        .map(|r| truncate_field(&r.to_string(), self.log_config.max_field_length)),
                    "Evaluated test"
                );
            }
            aggregator.add_feature(FeatureResults::new(baseline_profile, current_profile, results));
        }
        for feature in excluded {
            aggregator.exclude_feature(feature);
        }

        let anomaly = match anomaly_task {
            Some(handle) => handle.await.map_err(join_error)??,
            None => AnomalyResult::skipped(
                anomaly_detector.detector_name(),
                anomaly_detector.settings().seed,
                anomaly_features.clone(),
                SkipReason::InsufficientNumericFeatures {
                    found: anomaly_features.len(),
                },
            ),
        };
        aggregator.with_anomaly(anomaly);

        if config.quality.enabled {
            let outcome = QualityChecker::new(config.quality.clone())
                .run(&current, &pair.current, &classifier)
                .await?;
            aggregator
                .add_quality_results(outcome.results)
                .with_quality_score(outcome.score);
        }

        aggregator.finish()
    }

    fn spawn_anomaly(
        &self,
        detector: &AnomalyDetector,
        baseline: &Arc<Dataset>,
        current: &Arc<Dataset>,
        features: &[String],
        classifier: &SeverityClassifier,
    ) -> Option<JoinHandle<Result<AnomalyResult>>> {
        if features.len() < 2 {
            return None;
        }
        let (detector, b, c, features, cls) = (
            detector.clone(),
            baseline.clone(),
            current.clone(),
            features.to_vec(),
            classifier.clone(),
        );
        Some(tokio::task::spawn_blocking(move || {
            detector.detect(&b, &c, &features, &cls)
        }))
    }
}

async fn with_deadline<F>(limit_ms: u64, work: F) -> Result<DriftReport>
where
    F: std::future::Future<Output = Result<DriftReport>>,
{
    match tokio::time::timeout(Duration::from_millis(limit_ms), work).await {
        Ok(result) => result,
        Err(_) => {
            warn!(limit_ms, "Drift check exceeded its deadline");
            Err(DriftError::Timeout { limit_ms })
        }
    }
}

fn join_error(error: tokio::task::JoinError) -> DriftError {
    DriftError::Internal(format!("worker task failed: {error}"))
}
