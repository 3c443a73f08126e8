//! Duplicate-row check, evaluated as a DataFusion query over the current dataset.

use arrow::array::{Array, Int64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;
use tracing::{debug, instrument};

use crate::core::{
    SeverityClassifier, SkipReason, TestKind, TestResult, TestStatistic, DATASET_SCOPE,
};
use crate::dataset::Dataset;
use crate::error::{DriftError, Result};
use crate::security::SqlSecurity;

const TABLE_NAME: &str = "current_data";

/// Counts of rows belonging to duplicated groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateStats {
    pub total_rows: u64,
    /// Every copy in a duplicated group, including the first.
    pub duplicate_rows: u64,
    pub duplicate_groups: u64,
}

impl DuplicateStats {
    pub fn fraction(&self) -> f64 {
        if self.total_rows == 0 {
            0.0
        } else {
            self.duplicate_rows as f64 / self.total_rows as f64
        }
    }

    pub fn percentage(&self) -> f64 {
        self.fraction() * 100.0
    }
}

/// Counts duplicated rows over `key_columns`, or over every column when `None`.
#[instrument(skip(dataset), fields(dataset.id = %dataset.id(), rows = dataset.row_count()))]
pub async fn count_duplicates(
    dataset: &Dataset,
    key_columns: Option<&[String]>,
) -> Result<DuplicateStats> {
    let columns: Vec<String> = match key_columns {
        Some(keys) if !keys.is_empty() => keys.to_vec(),
        _ => dataset.column_names(),
    };
    for column in &columns {
        if dataset.column(column).is_none() {
            return Err(DriftError::ColumnNotFound {
                column: column.clone(),
            });
        }
    }

    let total_rows = dataset.row_count() as u64;
    if total_rows == 0 {
        return Ok(DuplicateStats {
            total_rows,
            duplicate_rows: 0,
            duplicate_groups: 0,
        });
    }

    let group_by = columns
        .iter()
        .map(|c| SqlSecurity::escape_identifier(c))
        .collect::<Result<Vec<_>>>()?
        .join(", ");
    let sql = format!(
        "SELECT COALESCE(SUM(group_size), 0) AS duplicate_rows, COUNT(*) AS duplicate_groups \
         FROM (SELECT COUNT(*) AS group_size FROM {TABLE_NAME} GROUP BY {group_by} HAVING COUNT(*) > 1) AS duplicated"
    );

    let ctx = SessionContext::new();
    ctx.register_batch(TABLE_NAME, dataset.record_batch().clone())?;
    let batches = ctx.sql(&sql).await?.collect().await?;

    let batch = batches
        .iter()
        .find(|b| b.num_rows() > 0)
        .ok_or_else(|| DriftError::Internal("duplicate query returned no rows".to_string()))?;
    let stats = DuplicateStats {
        total_rows,
        duplicate_rows: scalar_u64(batch, 0)?,
        duplicate_groups: scalar_u64(batch, 1)?,
    };

    debug!(
        duplicate_rows = stats.duplicate_rows,
        duplicate_groups = stats.duplicate_groups,
        "Counted duplicate rows"
    );
    Ok(stats)
}

fn scalar_u64(batch: &RecordBatch, column: usize) -> Result<u64> {
    let values = cast(batch.column(column), &DataType::Int64)?;
    let values = values
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| DriftError::Internal("expected Int64 aggregate".to_string()))?;
    if values.is_null(0) {
        return Ok(0);
    }
    Ok(values.value(0).max(0) as u64)
}

/// Dataset-scope duplicate result.
pub fn duplicate_result(stats: &DuplicateStats, classifier: &SeverityClassifier) -> TestResult {
    if stats.total_rows == 0 {
        return TestResult::skipped(DATASET_SCOPE, TestKind::Duplicates, SkipReason::EmptySample);
    }
    let statistic = TestStatistic::fraction_with_count(stats.fraction(), stats.duplicate_rows);
    TestResult::executed(
        DATASET_SCOPE,
        TestKind::Duplicates,
        statistic,
        classifier.classify(TestKind::Duplicates, &statistic),
    )
}
