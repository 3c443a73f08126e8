//! Feature profiling: type classification and sampling adequacy per column.
//!
//! The profiler turns each column of a [`Dataset`] into a [`FeatureProfile`]:
//! its declared category, the drift kind it is tested as, missing rate,
//! non-missing sample size and (for categorical features) cardinality.
//!
//! Profiles are always computed for a *pair* of datasets before any test runs.
//! [`FeatureProfiler::profile_pair`] checks that both sides share the same
//! columns and declared types, and decides the drift kind of low-cardinality
//! integer columns from the baseline so the two sides agree.
//!
//! # Example
//!
//! ```rust
//! use drift_guard::analyzers::profiler::{FeatureKind, FeatureProfiler};
//! use drift_guard::dataset::{Dataset, DatasetOrigin};
//!
//! let ds = Dataset::builder("users", DatasetOrigin::Baseline)
//!     .int("plan_tier", vec![1, 2, 3, 1, 2])
//!     .float("spend", vec![Some(10.0), None, Some(7.5), Some(3.0), Some(1.0)])
//!     .build()
//!     .unwrap();
//!
//! let profiles = FeatureProfiler::builder()
//!     .low_cardinality_int_max(5)
//!     .build()
//!     .profile(&ds)
//!     .unwrap();
//!
//! assert_eq!(profiles.get("plan_tier").unwrap().kind, FeatureKind::Categorical);
//! assert_eq!(profiles.get("spend").unwrap().missing_rate, 0.2);
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::core::DriftConfig;
use crate::dataset::{ColumnMeta, ColumnType, Dataset};
use crate::error::{DriftError, Result};

/// How a feature is tested for drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Numeric,
    Categorical,
    /// Not tested for drift (datetime columns).
    Excluded,
}

/// Per-column statistics relevant to test selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProfile {
    pub name: String,
    pub column_type: ColumnType,
    pub kind: FeatureKind,
    pub row_count: usize,
    pub missing_count: usize,
    /// `missing_count / row_count`, or 0 for an empty dataset.
    pub missing_rate: f64,
    /// Non-missing value count.
    pub sample_size: usize,
    /// Distinct non-missing values; only set for categorical features.
    pub cardinality: Option<usize>,
}

/// Ordered profiles for one dataset, in schema order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProfiles {
    dataset_id: String,
    profiles: Vec<FeatureProfile>,
}

impl FeatureProfiles {
    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureProfile> {
        self.profiles.iter()
    }

    pub fn get(&self, name: &str) -> Option<&FeatureProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Names of numeric features, in schema order.
    pub fn numeric_features(&self) -> Vec<String> {
        self.profiles
            .iter()
            .filter(|p| p.kind == FeatureKind::Numeric)
            .map(|p| p.name.clone())
            .collect()
    }
}

/// Baseline and current profiles with identical feature order and kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfilePair {
    pub baseline: FeatureProfiles,
    pub current: FeatureProfiles,
}

impl ProfilePair {
    /// Aligned `(baseline, current)` profiles in baseline schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&FeatureProfile, &FeatureProfile)> {
        self.baseline.profiles.iter().zip(self.current.profiles.iter())
    }
}

/// Configuration for the profiler.
#[derive(Debug, Clone)]
pub struct ProfilerConfig {
    /// Integer columns with at most this many distinct values profile as
    /// categorical. Zero disables the rule.
    pub low_cardinality_int_max: usize,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            low_cardinality_int_max: 10,
        }
    }
}

/// Builder for [`FeatureProfiler`].
#[derive(Debug, Clone, Default)]
pub struct FeatureProfilerBuilder {
    config: ProfilerConfig,
}

impl FeatureProfilerBuilder {
    pub fn low_cardinality_int_max(mut self, value: usize) -> Self {
        self.config.low_cardinality_int_max = value;
        self
    }

    pub fn build(self) -> FeatureProfiler {
        FeatureProfiler {
            config: self.config,
        }
    }
}

/// Classifies columns and measures their sampling adequacy.
#[derive(Debug, Clone, Default)]
pub struct FeatureProfiler {
    config: ProfilerConfig,
}

impl FeatureProfiler {
    pub fn builder() -> FeatureProfilerBuilder {
        FeatureProfilerBuilder::default()
    }

    pub fn from_config(config: &DriftConfig) -> Self {
        Self::builder()
            .low_cardinality_int_max(config.low_cardinality_int_max)
            .build()
    }

    /// Profiles every column of one dataset.
    #[instrument(skip(self, dataset), fields(dataset.id = %dataset.id(), dataset.rows = dataset.row_count()))]
    pub fn profile(&self, dataset: &Dataset) -> Result<FeatureProfiles> {
        let profiles = dataset
            .columns()
            .iter()
            .map(|column| self.profile_column(dataset, column, None))
            .collect::<Result<Vec<_>>>()?;

        Ok(FeatureProfiles {
            dataset_id: dataset.id().to_string(),
            profiles,
        })
    }

    /// Profiles both datasets after checking that their schemas agree.
    ///
    /// The current profiles are reordered to baseline schema order and take
    /// their drift kind from the baseline.
    #[instrument(skip_all, fields(baseline.id = %baseline.id(), current.id = %current.id()))]
    pub fn profile_pair(&self, baseline: &Dataset, current: &Dataset) -> Result<ProfilePair> {
        Self::check_schema(baseline, current)?;

        let baseline_profiles = self.profile(baseline)?;
        let mut current_profiles = Vec::with_capacity(baseline_profiles.len());
        for base in baseline_profiles.iter() {
            let column = current
                .column(&base.name)
                .ok_or_else(|| DriftError::ColumnNotFound {
                    column: base.name.clone(),
                })?;
            current_profiles.push(self.profile_column(current, column, Some(base.kind))?);
        }

        debug!(
            features = baseline_profiles.len(),
            "Profiled baseline and current datasets"
        );

        Ok(ProfilePair {
            baseline: baseline_profiles,
            current: FeatureProfiles {
                dataset_id: current.id().to_string(),
                profiles: current_profiles,
            },
        })
    }

    /// Fails with [`DriftError::SchemaMismatch`] unless both datasets have the
    /// same column names with the same declared types. Column order may differ.
    pub fn check_schema(baseline: &Dataset, current: &Dataset) -> Result<()> {
        let base: BTreeMap<&str, &ColumnMeta> = baseline
            .columns()
            .iter()
            .map(|c| (c.name.as_str(), c))
            .collect();
        let cur: BTreeMap<&str, &ColumnMeta> = current
            .columns()
            .iter()
            .map(|c| (c.name.as_str(), c))
            .collect();

        let missing: Vec<String> = base
            .keys()
            .filter(|name| !cur.contains_key(*name))
            .map(|name| name.to_string())
            .collect();
        let unexpected: Vec<String> = cur
            .keys()
            .filter(|name| !base.contains_key(*name))
            .map(|name| name.to_string())
            .collect();
        let type_mismatches: Vec<String> = base
            .iter()
            .filter_map(|(name, b)| {
                cur.get(name)
                    .filter(|c| c.data_type != b.data_type)
                    .map(|c| format!("{name}: {} != {}", b.data_type, c.data_type))
            })
            .collect();

        if missing.is_empty() && unexpected.is_empty() && type_mismatches.is_empty() {
            Ok(())
        } else {
            Err(DriftError::schema_mismatch(
                missing,
                unexpected,
                type_mismatches,
            ))
        }
    }

    fn profile_column(
        &self,
        dataset: &Dataset,
        column: &ColumnMeta,
        kind_override: Option<FeatureKind>,
    ) -> Result<FeatureProfile> {
        let row_count = dataset.row_count();
        let (missing_count, distinct) = match column.column_type {
            ColumnType::Numeric => {
                let values = dataset.numeric_values(&column.name)?;
                let missing = values.iter().filter(|v| v.is_none()).count();
                let distinct: HashSet<u64> =
                    values.iter().flatten().map(|v| v.to_bits()).collect();
                (missing, distinct.len())
            }
            ColumnType::Categorical | ColumnType::Boolean => {
                let values = dataset.categorical_values(&column.name)?;
                let missing = values.iter().filter(|v| v.is_none()).count();
                let distinct: HashSet<&str> = values.iter().flatten().map(String::as_str).collect();
                (missing, distinct.len())
            }
            ColumnType::Datetime => (dataset.null_count(&column.name)?, 0),
        };

        let kind = kind_override.unwrap_or_else(|| self.classify(column, distinct));
        let missing_rate = if row_count == 0 {
            0.0
        } else {
            missing_count as f64 / row_count as f64
        };

        Ok(FeatureProfile {
            name: column.name.clone(),
            column_type: column.column_type,
            kind,
            row_count,
            missing_count,
            missing_rate,
            sample_size: row_count - missing_count,
            cardinality: (kind == FeatureKind::Categorical).then_some(distinct),
        })
    }

    fn classify(&self, column: &ColumnMeta, distinct: usize) -> FeatureKind {
        match column.column_type {
            ColumnType::Numeric
                if column.is_integer()
                    && self.config.low_cardinality_int_max > 0
                    && distinct <= self.config.low_cardinality_int_max =>
            {
                FeatureKind::Categorical
            }
            ColumnType::Numeric => FeatureKind::Numeric,
            ColumnType::Categorical | ColumnType::Boolean => FeatureKind::Categorical,
            ColumnType::Datetime => FeatureKind::Excluded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetOrigin;

    fn baseline() -> Dataset {
        Dataset::builder("base", DatasetOrigin::Baseline)
            .int("tier", vec![1, 2, 3, 1, 2, 3])
            .int("visits", (0..6i64).map(|i| i * 100))
            .float("spend", vec![Some(1.0), None, Some(f64::NAN), Some(4.0), Some(5.0), Some(6.0)])
            .string("country", vec![Some("fr"), Some("de"), Some("fr"), None, Some("it"), Some("fr")])
            .boolean("churned", vec![true, false, false, false, true, false])
            .timestamp_millis("signup", vec![Some(1), Some(2), None, Some(4), Some(5), Some(6)])
            .build()
            .unwrap()
    }

    #[test]
    fn test_kinds_and_missing_rates() {
        let profiler = FeatureProfiler::builder().low_cardinality_int_max(5).build();
        let profiles = profiler.profile(&baseline()).unwrap();

        let tier = profiles.get("tier").unwrap();
        assert_eq!(tier.kind, FeatureKind::Categorical);
        assert_eq!(tier.cardinality, Some(3));

        let visits = profiles.get("visits").unwrap();
        assert_eq!(visits.kind, FeatureKind::Numeric);
        assert_eq!(visits.cardinality, None);

        let spend = profiles.get("spend").unwrap();
        assert_eq!(spend.missing_count, 2);
        assert_eq!(spend.sample_size, 4);
        assert!((spend.missing_rate - 2.0 / 6.0).abs() < 1e-12);

        let country = profiles.get("country").unwrap();
        assert_eq!(country.kind, FeatureKind::Categorical);
        assert_eq!(country.cardinality, Some(3));

        assert_eq!(profiles.get("churned").unwrap().cardinality, Some(2));

        let signup = profiles.get("signup").unwrap();
        assert_eq!(signup.kind, FeatureKind::Excluded);
        assert_eq!(signup.missing_count, 1);

        assert_eq!(profiles.numeric_features(), vec!["visits", "spend"]);
    }

    #[test]
    fn test_low_cardinality_rule_disabled() {
        let profiler = FeatureProfiler::builder().low_cardinality_int_max(0).build();
        let profiles = profiler.profile(&baseline()).unwrap();
        assert_eq!(profiles.get("tier").unwrap().kind, FeatureKind::Numeric);
    }

    #[test]
    fn test_pair_takes_kind_from_baseline() {
        let base = Dataset::builder("b", DatasetOrigin::Baseline)
            .int("code", vec![1, 2, 1, 2])
            .build()
            .unwrap();
        let cur = Dataset::builder("c", DatasetOrigin::Current)
            .int("code", (0..40).collect::<Vec<i64>>())
            .build()
            .unwrap();
        let pair = FeatureProfiler::default().profile_pair(&base, &cur).unwrap();
        let (b, c) = pair.iter().next().unwrap();
        assert_eq!(b.kind, FeatureKind::Categorical);
        assert_eq!(c.kind, FeatureKind::Categorical);
        assert_eq!(c.cardinality, Some(40));
    }

    #[test]
    fn test_pair_aligns_column_order() {
        let base = Dataset::builder("b", DatasetOrigin::Baseline)
            .float("x", vec![1.0, 2.0])
            .float("y", vec![3.0, 4.0])
            .build()
            .unwrap();
        let cur = Dataset::builder("c", DatasetOrigin::Current)
            .float("y", vec![3.0, 4.0])
            .float("x", vec![1.0, 2.0])
            .build()
            .unwrap();
        let pair = FeatureProfiler::default().profile_pair(&base, &cur).unwrap();
        let names: Vec<(&str, &str)> = pair
            .iter()
            .map(|(b, c)| (b.name.as_str(), c.name.as_str()))
            .collect();
        assert_eq!(names, vec![("x", "x"), ("y", "y")]);
    }

    #[test]
    fn test_schema_mismatch_reports_every_difference() {
        let base = Dataset::builder("b", DatasetOrigin::Baseline)
            .float("x", vec![1.0])
            .float("y", vec![1.0])
            .int("z", vec![1])
            .build()
            .unwrap();
        let cur = Dataset::builder("c", DatasetOrigin::Current)
            .float("x", vec![1.0])
            .float("w", vec![1.0])
            .float("z", vec![1.0])
            .build()
            .unwrap();

        match FeatureProfiler::default().profile_pair(&base, &cur) {
            Err(DriftError::SchemaMismatch {
                missing_in_current,
                unexpected_in_current,
                type_mismatches,
                ..
            }) => {
                assert_eq!(missing_in_current, vec!["y"]);
                assert_eq!(unexpected_in_current, vec!["w"]);
                assert_eq!(type_mismatches, vec!["z: Int64 != Float64"]);
            }
            other => panic!("expected schema mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_dataset_has_zero_missing_rate() {
        let empty = Dataset::builder("e", DatasetOrigin::Current)
            .float("x", Vec::<f64>::new())
            .build()
            .unwrap();
        let profiles = FeatureProfiler::default().profile(&empty).unwrap();
        let x = profiles.get("x").unwrap();
        assert_eq!(x.missing_rate, 0.0);
        assert_eq!(x.sample_size, 0);
    }
}
