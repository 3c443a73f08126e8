//! The drift report and the aggregator that assembles it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::analyzers::anomaly::AnomalyResult;
use crate::analyzers::profiler::{FeatureKind, FeatureProfile};
use crate::core::config::DriftConfig;
use crate::core::result::{SkipReason, TestResult};
use crate::core::severity::{Severity, SeverityClassifier};
use crate::dataset::ColumnType;
use crate::error::{DriftError, Result};
use crate::quality::QualityScore;

/// Drift results for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureResults {
    pub feature: String,
    pub kind: FeatureKind,
    pub baseline_profile: FeatureProfile,
    pub current_profile: FeatureProfile,
    /// Executed and skipped tests, in selection order.
    pub results: Vec<TestResult>,
    /// Worst tier among the executed tests.
    pub severity: Severity,
}

impl FeatureResults {
    pub fn new(
        baseline_profile: FeatureProfile,
        current_profile: FeatureProfile,
        results: Vec<TestResult>,
    ) -> Self {
        let severity = SeverityClassifier::combine(&results);
        Self {
            feature: baseline_profile.name.clone(),
            kind: baseline_profile.kind,
            baseline_profile,
            current_profile,
            results,
            severity,
        }
    }

    pub fn executed(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.is_skipped())
    }
}

/// A column left out of drift testing, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedFeature {
    pub feature: String,
    pub column_type: ColumnType,
    pub reason: SkipReason,
}

/// Number of results per tier, plus skipped ones.
///
/// Feature tests, quality checks and the anomaly result each count once, so
/// a report whose overall severity is a tier always counts at least one
/// result in that tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TierCounts {
    pub none: usize,
    pub moderate: usize,
    pub severe: usize,
    pub skipped: usize,
}

impl TierCounts {
    fn record(&mut self, result: &TestResult) {
        if result.is_skipped() {
            self.skipped += 1;
            return;
        }
        match result.severity() {
            Severity::None => self.none += 1,
            Severity::Moderate => self.moderate += 1,
            Severity::Severe => self.severe += 1,
        }
    }

    fn record_anomaly(&mut self, anomaly: &AnomalyResult) {
        match anomaly.severity() {
            None => self.skipped += 1,
            Some(Severity::None) => self.none += 1,
            Some(Severity::Moderate) => self.moderate += 1,
            Some(Severity::Severe) => self.severe += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.none + self.moderate + self.severe + self.skipped
    }
}

/// The immutable outcome of one drift check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    baseline_version_id: String,
    current_dataset_id: String,
    generated_at: DateTime<Utc>,
    config: DriftConfig,
    features: Vec<FeatureResults>,
    excluded_features: Vec<ExcludedFeature>,
    quality_checks: Vec<TestResult>,
    anomaly: AnomalyResult,
    quality_score: Option<QualityScore>,
    overall_severity: Severity,
    tier_counts: TierCounts,
}

/// Config fields that only affect scheduling, left out of fingerprints.
const SCHEDULING_FIELDS: &[&str] = &["max_workers"];

/// Everything but the timestamp, borrowed for hashing.
#[derive(Serialize)]
struct FingerprintView<'a> {
    baseline_version_id: &'a str,
    current_dataset_id: &'a str,
    config: serde_json::Value,
    features: &'a [FeatureResults],
    excluded_features: &'a [ExcludedFeature],
    quality_checks: &'a [TestResult],
    anomaly: &'a AnomalyResult,
    quality_score: &'a Option<QualityScore>,
    overall_severity: Severity,
    tier_counts: &'a TierCounts,
}

impl DriftReport {
    pub fn baseline_version_id(&self) -> &str {
        &self.baseline_version_id
    }

    pub fn current_dataset_id(&self) -> &str {
        &self.current_dataset_id
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Snapshot of the configuration the check ran with.
    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    pub fn features(&self) -> &[FeatureResults] {
        &self.features
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureResults> {
        self.features.iter().find(|f| f.feature == name)
    }

    pub fn excluded_features(&self) -> &[ExcludedFeature] {
        &self.excluded_features
    }

    pub fn quality_checks(&self) -> &[TestResult] {
        &self.quality_checks
    }

    pub fn anomaly(&self) -> &AnomalyResult {
        &self.anomaly
    }

    pub fn quality_score(&self) -> Option<&QualityScore> {
        self.quality_score.as_ref()
    }

    pub fn overall_severity(&self) -> Severity {
        self.overall_severity
    }

    pub fn tier_counts(&self) -> &TierCounts {
        &self.tier_counts
    }

    pub fn has_drift(&self) -> bool {
        self.overall_severity.is_drift()
    }

    /// Features whose severity is above none.
    pub fn drifted_features(&self) -> Vec<&str> {
        self.features
            .iter()
            .filter(|f| f.severity.is_drift())
            .map(|f| f.feature.as_str())
            .collect()
    }

    /// Every test result in the report: drift tests, then quality checks.
    pub fn all_results(&self) -> impl Iterator<Item = &TestResult> {
        self.features
            .iter()
            .flat_map(|f| f.results.iter())
            .chain(self.quality_checks.iter())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// SHA-256 over the report content, excluding `generated_at` and the
    /// worker count.
    ///
    /// Two runs over the same inputs and configuration produce the same
    /// fingerprint, on any machine.
    pub fn fingerprint(&self) -> Result<String> {
        let mut config = serde_json::to_value(&self.config)?;
        if let Some(fields) = config.as_object_mut() {
            for field in SCHEDULING_FIELDS {
                fields.remove(*field);
            }
        }
        let view = FingerprintView {
            baseline_version_id: &self.baseline_version_id,
            current_dataset_id: &self.current_dataset_id,
            config,
            features: &self.features,
            excluded_features: &self.excluded_features,
            quality_checks: &self.quality_checks,
            anomaly: &self.anomaly,
            quality_score: &self.quality_score,
            overall_severity: self.overall_severity,
            tier_counts: &self.tier_counts,
        };
        let bytes = serde_json::to_vec(&view)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

/// Collects per-feature, quality and anomaly outputs into a [`DriftReport`].
///
/// The only place tier counts and the overall severity are computed.
#[derive(Debug)]
pub struct ReportAggregator {
    baseline_version_id: String,
    current_dataset_id: String,
    generated_at: DateTime<Utc>,
    config: DriftConfig,
    features: Vec<FeatureResults>,
    excluded_features: Vec<ExcludedFeature>,
    quality_checks: Vec<TestResult>,
    anomaly: Option<AnomalyResult>,
    quality_score: Option<QualityScore>,
}

impl ReportAggregator {
    pub fn new(
        baseline_version_id: impl Into<String>,
        current_dataset_id: impl Into<String>,
        config: DriftConfig,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            baseline_version_id: baseline_version_id.into(),
            current_dataset_id: current_dataset_id.into(),
            generated_at,
            config,
            features: Vec::new(),
            excluded_features: Vec::new(),
            quality_checks: Vec::new(),
            anomaly: None,
            quality_score: None,
        }
    }

    pub fn add_feature(&mut self, feature: FeatureResults) -> &mut Self {
        self.features.push(feature);
        self
    }

    pub fn exclude_feature(&mut self, excluded: ExcludedFeature) -> &mut Self {
        self.excluded_features.push(excluded);
        self
    }

    pub fn add_quality_results(&mut self, results: impl IntoIterator<Item = TestResult>) -> &mut Self {
        self.quality_checks.extend(results);
        self
    }

    pub fn with_anomaly(&mut self, anomaly: AnomalyResult) -> &mut Self {
        self.anomaly = Some(anomaly);
        self
    }

    pub fn with_quality_score(&mut self, score: QualityScore) -> &mut Self {
        self.quality_score = Some(score);
        self
    }

    /// Builds the report. Fails if no anomaly result was recorded.
    pub fn finish(self) -> Result<DriftReport> {
        let anomaly = self.anomaly.ok_or_else(|| {
            DriftError::Internal("report finished without an anomaly result".to_string())
        })?;

        let mut tier_counts = TierCounts::default();
        for result in self
            .features
            .iter()
            .flat_map(|f| f.results.iter())
            .chain(self.quality_checks.iter())
        {
            tier_counts.record(result);
        }
        tier_counts.record_anomaly(&anomaly);

        let overall_severity = Severity::worst(
            self.features
                .iter()
                .map(|f| f.severity)
                .chain(std::iter::once(SeverityClassifier::combine(&self.quality_checks)))
                .chain(anomaly.severity()),
        );

        debug!(
            features = self.features.len(),
            excluded = self.excluded_features.len(),
            quality_checks = self.quality_checks.len(),
            %overall_severity,
            "Aggregated drift report"
        );

        Ok(DriftReport {
            baseline_version_id: self.baseline_version_id,
            current_dataset_id: self.current_dataset_id,
            generated_at: self.generated_at,
            config: self.config,
            features: self.features,
            excluded_features: self.excluded_features,
            quality_checks: self.quality_checks,
            anomaly,
            quality_score: self.quality_score,
            overall_severity,
            tier_counts,
        })
    }
}
