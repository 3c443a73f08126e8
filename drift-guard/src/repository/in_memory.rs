//! In-memory implementation of [`BaselineStore`] for tests and embedded use.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use super::{BaselineSnapshot, BaselineStore, BaselineVersion, ReportId};
use crate::core::{Clock, DriftReport, SystemClock};
use crate::dataset::{Dataset, DatasetOrigin};
use crate::error::{DriftError, Result};

#[derive(Debug, Default)]
struct StoreState {
    baselines: BTreeMap<u32, BaselineSnapshot>,
    reports: BTreeMap<ReportId, DriftReport>,
    // Last minted numbers; never reused, even after deletion.
    last_version: u32,
    last_report: u64,
}

/// Keeps baselines and reports in memory.
///
/// Clones share the same storage. Registered baselines get ids of the form
/// `baseline_v{n}_{YYYYMMDD}` with `n` counting up from 1; numbers of deleted
/// versions are not handed out again.
///
/// # Example
///
/// ```rust,ignore
/// use drift_guard::repository::InMemoryBaselineStore;
///
/// let store = InMemoryBaselineStore::new();
/// let v1 = store.register_baseline(january, None).await?;
/// let v2 = store.register_baseline(february, Some("after backfill")).await?;
/// assert_eq!(store.latest().await?.unwrap().version_id, v2.version_id);
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryBaselineStore {
    state: Arc<RwLock<StoreState>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryBaselineStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// A store that dates version ids with `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            clock,
        }
    }

    /// Stores `dataset` as the next baseline version.
    #[instrument(skip(self, dataset), fields(dataset.id = %dataset.id(), rows = dataset.row_count()))]
    pub async fn register_baseline(
        &self,
        dataset: Dataset,
        description: Option<&str>,
    ) -> Result<BaselineVersion> {
        self.register_baseline_with_metadata(dataset, description, BTreeMap::new())
            .await
    }

    pub async fn register_baseline_with_metadata(
        &self,
        dataset: Dataset,
        description: Option<&str>,
        metadata: BTreeMap<String, String>,
    ) -> Result<BaselineVersion> {
        let mut state = self.state.write().await;
        state.last_version += 1;
        let version_number = state.last_version;
        let created_at = self.clock.now();

        let version = BaselineVersion {
            version_id: BaselineVersion::format_id(version_number, created_at),
            version_number,
            created_at,
            description: description.map(str::to_string),
            row_count: dataset.row_count(),
            columns: dataset.column_names(),
            metadata,
        };
        state.baselines.insert(
            version_number,
            BaselineSnapshot {
                version: version.clone(),
                dataset: dataset.with_origin(DatasetOrigin::Baseline),
            },
        );

        info!(
            version_id = %version.version_id,
            rows = version.row_count,
            columns = version.columns.len(),
            "Registered baseline"
        );
        Ok(version)
    }

    /// A persisted report by id.
    pub async fn get_report(&self, id: &ReportId) -> Option<DriftReport> {
        self.state.read().await.reports.get(id).cloned()
    }

    pub async fn report_ids(&self) -> Vec<ReportId> {
        self.state.read().await.reports.keys().cloned().collect()
    }

    pub async fn report_count(&self) -> usize {
        self.state.read().await.reports.len()
    }

    pub async fn baseline_count(&self) -> usize {
        self.state.read().await.baselines.len()
    }
}

impl Default for InMemoryBaselineStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaselineStore for InMemoryBaselineStore {
    #[instrument(skip(self), fields(store = "in_memory"))]
    async fn resolve(&self, version_id: &str) -> Result<BaselineSnapshot> {
        let not_found = || DriftError::BaselineNotFound {
            version_id: version_id.to_string(),
        };
        let number = BaselineVersion::parse_number(version_id).ok_or_else(not_found)?;
        let state = self.state.read().await;
        state
            .baselines
            .get(&number)
            .filter(|snapshot| snapshot.version.version_id == version_id)
            .cloned()
            .ok_or_else(not_found)
    }

    #[instrument(skip(self, report), fields(store = "in_memory", baseline = %report.baseline_version_id()))]
    async fn persist(&self, report: &DriftReport) -> Result<ReportId> {
        let fingerprint = report.fingerprint()?;
        let mut state = self.state.write().await;
        state.last_report += 1;
        let id = ReportId::minted(state.last_report, &fingerprint);
        state.reports.insert(id.clone(), report.clone());
        debug!(report_id = %id, "Stored drift report");
        Ok(id)
    }

    #[instrument(skip(self), fields(store = "in_memory"))]
    async fn delete_version(&self, version_id: &str) -> Result<()> {
        let not_found = || DriftError::BaselineNotFound {
            version_id: version_id.to_string(),
        };
        let number = BaselineVersion::parse_number(version_id).ok_or_else(not_found)?;
        let mut state = self.state.write().await;
        let matches = state
            .baselines
            .get(&number)
            .is_some_and(|snapshot| snapshot.version.version_id == version_id);
        if !matches {
            return Err(not_found());
        }
        state.baselines.remove(&number);
        info!(version_id, "Deleted baseline");
        Ok(())
    }

    async fn list_versions(&self) -> Result<Vec<BaselineVersion>> {
        Ok(self
            .state
            .read()
            .await
            .baselines
            .values()
            .map(|snapshot| snapshot.version.clone())
            .collect())
    }
}
