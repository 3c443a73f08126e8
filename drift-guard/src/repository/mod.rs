//! Baseline storage contract.
//!
//! The engine talks to storage twice per run: once to resolve the baseline
//! snapshot before any computation, and once to persist the finished report.
//! Backends implement [`BaselineStore`]; [`InMemoryBaselineStore`] is the
//! reference implementation used in tests and embedded setups.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::DriftReport;
use crate::dataset::Dataset;
use crate::error::{DriftError, Result};

pub mod in_memory;

pub use in_memory::InMemoryBaselineStore;

/// Prefix of minted baseline version ids.
pub const BASELINE_VERSION_PREFIX: &str = "baseline_v";

/// Identifier of a persisted report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReportId(String);

impl ReportId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mints `report_{sequence}_{fingerprint prefix}`.
    ///
    /// The sequence keeps runs with identical content apart; the fingerprint
    /// prefix lets reproduced reports be spotted by id.
    pub fn minted(sequence: u64, fingerprint: &str) -> Self {
        let prefix: String = fingerprint.chars().take(16).collect();
        Self(format!("report_{sequence:06}_{prefix}"))
    }

    /// The fingerprint prefix of a minted id.
    pub fn fingerprint_prefix(&self) -> Option<&str> {
        self.0.strip_prefix("report_")?.split_once('_').map(|(_, fp)| fp)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata describing one stored baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineVersion {
    /// e.g. `baseline_v3_20240115`
    pub version_id: String,
    pub version_number: u32,
    pub created_at: DateTime<Utc>,
    pub description: Option<String>,
    pub row_count: usize,
    pub columns: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

impl BaselineVersion {
    /// Formats a version id as `baseline_v{n}_{YYYYMMDD}`.
    pub fn format_id(version_number: u32, created_at: DateTime<Utc>) -> String {
        format!(
            "{BASELINE_VERSION_PREFIX}{version_number}_{}",
            created_at.format("%Y%m%d")
        )
    }

    /// Parses the version number out of a minted id.
    pub fn parse_number(version_id: &str) -> Option<u32> {
        version_id
            .strip_prefix(BASELINE_VERSION_PREFIX)?
            .split('_')
            .next()?
            .parse()
            .ok()
    }
}

/// A resolved baseline: its version metadata and data.
#[derive(Debug, Clone)]
pub struct BaselineSnapshot {
    pub version: BaselineVersion,
    pub dataset: Dataset,
}

/// Storage backend for baselines and drift reports.
///
/// # Example
///
/// ```rust,ignore
/// use drift_guard::repository::{BaselineStore, InMemoryBaselineStore};
///
/// let store = InMemoryBaselineStore::new();
/// let version = store.register_baseline(dataset, Some("January traffic")).await?;
/// let snapshot = store.resolve(&version.version_id).await?;
/// ```
#[async_trait]
pub trait BaselineStore: Send + Sync + fmt::Debug {
    /// Loads a baseline by version id.
    ///
    /// # Errors
    ///
    /// Returns [`DriftError::BaselineNotFound`] for an unknown id.
    async fn resolve(&self, version_id: &str) -> Result<BaselineSnapshot>;

    /// Stores a finished report under a new id. Earlier reports are never
    /// replaced, even when their content is identical.
    async fn persist(&self, report: &DriftReport) -> Result<ReportId>;

    /// Lists stored versions, oldest first.
    async fn list_versions(&self) -> Result<Vec<BaselineVersion>> {
        Err(DriftError::NotSupported(
            "list_versions not implemented for this store".to_string(),
        ))
    }

    /// Removes a stored version. Reports that referenced it are kept.
    ///
    /// # Errors
    ///
    /// Returns [`DriftError::BaselineNotFound`] for an unknown id.
    async fn delete_version(&self, version_id: &str) -> Result<()> {
        Err(DriftError::NotSupported(format!(
            "delete_version not implemented for this store (version {version_id})"
        )))
    }

    /// The most recently created version, if any.
    async fn latest(&self) -> Result<Option<BaselineVersion>> {
        Ok(self.list_versions().await?.into_iter().last())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_version_id_format() {
        let at = Utc.with_ymd_and_hms(2025, 4, 21, 9, 30, 0).unwrap();
        let id = BaselineVersion::format_id(3, at);
        assert_eq!(id, "baseline_v3_20250421");
        assert_eq!(BaselineVersion::parse_number(&id), Some(3));
        assert_eq!(BaselineVersion::parse_number("other_v3"), None);
        assert_eq!(BaselineVersion::parse_number("baseline_vx_20250421"), None);
    }

    #[test]
    fn test_minted_report_id() {
        let id = ReportId::minted(3, "0123456789abcdef0123456789abcdef");
        assert_eq!(id.as_str(), "report_000003_0123456789abcdef");
        assert_eq!(id.to_string(), "report_000003_0123456789abcdef");
        assert_eq!(id.fingerprint_prefix(), Some("0123456789abcdef"));
        assert_ne!(id, ReportId::minted(4, "0123456789abcdef0123456789abcdef"));
        assert_eq!(ReportId::new("custom").fingerprint_prefix(), None);
    }

    #[derive(Debug)]
    struct ResolveOnly;

    #[async_trait]
    impl BaselineStore for ResolveOnly {
        async fn resolve(&self, version_id: &str) -> Result<BaselineSnapshot> {
            Err(DriftError::BaselineNotFound {
                version_id: version_id.to_string(),
            })
        }

        async fn persist(&self, _report: &DriftReport) -> Result<ReportId> {
            Ok(ReportId::new("report_x"))
        }
    }

    #[tokio::test]
    async fn test_default_listing_is_not_supported() {
        let store = ResolveOnly;
        assert!(matches!(
            store.list_versions().await,
            Err(DriftError::NotSupported(_))
        ));
        assert!(store.latest().await.is_err());
        assert!(matches!(
            store.delete_version("baseline_v1_20240101").await,
            Err(DriftError::NotSupported(_))
        ));
    }
}
