//! Tabular datasets backed by Arrow record batches.
//!
//! A [`Dataset`] is an immutable, identified table: an Arrow schema plus one
//! concatenated [`RecordBatch`]. Column access is by name and yields owned,
//! type-normalized vectors so the statistical code never touches Arrow arrays
//! directly.
//!
//! Missing values are Arrow nulls. For floating-point columns `NaN` is treated
//! as missing as well.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray,
    TimestampMillisecondArray,
};
use arrow::compute::{cast, concat_batches};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::error::{DriftError, Result};

/// Which side of a comparison a dataset plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetOrigin {
    Baseline,
    Current,
}

impl fmt::Display for DatasetOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Baseline => write!(f, "baseline"),
            Self::Current => write!(f, "current"),
        }
    }
}

/// Logical column category derived from the Arrow data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Categorical,
    Boolean,
    Datetime,
}

impl ColumnType {
    /// Maps an Arrow type to its logical category, or `None` if unsupported.
    pub fn from_arrow(data_type: &DataType) -> Option<Self> {
        match data_type {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float16
            | DataType::Float32
            | DataType::Float64
            | DataType::Decimal128(_, _)
            | DataType::Decimal256(_, _) => Some(Self::Numeric),
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => Some(Self::Categorical),
            DataType::Dictionary(_, value) => match value.as_ref() {
                DataType::Utf8 | DataType::LargeUtf8 => Some(Self::Categorical),
                _ => None,
            },
            DataType::Boolean => Some(Self::Boolean),
            DataType::Date32
            | DataType::Date64
            | DataType::Timestamp(_, _)
            | DataType::Time32(_)
            | DataType::Time64(_) => Some(Self::Datetime),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
        };
        write!(f, "{name}")
    }
}

/// Returns true for Arrow integer types.
pub fn is_integer_type(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Name and types of a single column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    pub name: String,
    pub data_type: DataType,
    pub column_type: ColumnType,
}

impl ColumnMeta {
    pub fn is_integer(&self) -> bool {
        is_integer_type(&self.data_type)
    }
}

/// An identified, immutable table of named, typed columns.
#[derive(Debug, Clone)]
pub struct Dataset {
    id: String,
    origin: DatasetOrigin,
    batch: RecordBatch,
    columns: Vec<ColumnMeta>,
}

impl Dataset {
    /// Wraps a record batch. Fails on column types the engine cannot classify.
    pub fn from_record_batch(
        id: impl Into<String>,
        origin: DatasetOrigin,
        batch: RecordBatch,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(batch.num_columns());
        for field in batch.schema().fields() {
            if !seen.insert(field.name().clone()) {
                return Err(DriftError::configuration(format!(
                    "duplicate column name '{}'",
                    field.name()
                )));
            }
            let column_type =
                ColumnType::from_arrow(field.data_type()).ok_or_else(|| DriftError::TypeMismatch {
                    expected: "numeric, string, boolean or temporal column".to_string(),
                    found: format!("{} for column '{}'", field.data_type(), field.name()),
                })?;
            columns.push(ColumnMeta {
                name: field.name().clone(),
                data_type: field.data_type().clone(),
                column_type,
            });
        }

        Ok(Self {
            id: id.into(),
            origin,
            batch,
            columns,
        })
    }

    /// Concatenates several batches sharing `schema` into one dataset.
    pub fn from_batches(
        id: impl Into<String>,
        origin: DatasetOrigin,
        schema: SchemaRef,
        batches: &[RecordBatch],
    ) -> Result<Self> {
        let batch = concat_batches(&schema, batches)?;
        Self::from_record_batch(id, origin, batch)
    }

    /// Starts a builder for a dataset assembled column by column.
    pub fn builder(id: impl Into<String>, origin: DatasetOrigin) -> DatasetBuilder {
        DatasetBuilder::new(id, origin)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn origin(&self) -> DatasetOrigin {
        self.origin
    }

    /// Returns the same data relabelled with a different origin.
    pub fn with_origin(&self, origin: DatasetOrigin) -> Self {
        Self {
            origin,
            ..self.clone()
        }
    }

    pub fn row_count(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn record_batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Columns in schema order.
    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    fn array(&self, name: &str) -> Result<&ArrayRef> {
        self.batch
            .column_by_name(name)
            .ok_or_else(|| DriftError::ColumnNotFound {
                column: name.to_string(),
            })
    }

    /// Number of nulls in a column, without any value conversion.
    pub fn null_count(&self, name: &str) -> Result<usize> {
        Ok(self.array(name)?.null_count())
    }

    /// Numeric column values as `f64`; nulls and `NaN` become `None`.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let array = self.array(name)?;
        if !matches!(
            self.column(name).map(|c| c.column_type),
            Some(ColumnType::Numeric)
        ) {
            return Err(DriftError::TypeMismatch {
                expected: "numeric".to_string(),
                found: array.data_type().to_string(),
            });
        }

        let converted = cast(array, &DataType::Float64)?;
        let floats = converted
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| DriftError::Internal(format!("column '{name}' did not cast to Float64")))?;

        Ok(floats
            .iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect())
    }

    /// Column values rendered as category labels; nulls become `None`.
    ///
    /// Works for string, boolean and numeric columns (integers used as codes).
    pub fn categorical_values(&self, name: &str) -> Result<Vec<Option<String>>> {
        let array = self.array(name)?;
        let converted = cast(array, &DataType::Utf8)?;
        let strings = converted
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| DriftError::Internal(format!("column '{name}' did not cast to Utf8")))?;

        Ok(strings.iter().map(|v| v.map(str::to_string)).collect())
    }
}

/// Column-by-column dataset construction, mostly for tests and embedding callers.
///
/// ```rust
/// use drift_guard::dataset::{Dataset, DatasetOrigin};
///
/// let ds = Dataset::builder("orders_2024_06", DatasetOrigin::Current)
///     .float("amount", vec![12.5, 8.0, 19.99])
///     .string("region", vec![Some("eu"), Some("us"), None])
///     .build()
///     .unwrap();
/// assert_eq!(ds.row_count(), 3);
/// ```
#[derive(Debug)]
pub struct DatasetBuilder {
    id: String,
    origin: DatasetOrigin,
    fields: Vec<Field>,
    arrays: Vec<ArrayRef>,
}

impl DatasetBuilder {
    pub fn new(id: impl Into<String>, origin: DatasetOrigin) -> Self {
        Self {
            id: id.into(),
            origin,
            fields: Vec::new(),
            arrays: Vec::new(),
        }
    }

    /// Adds a Float64 column. Items may be `f64` or `Option<f64>`.
    pub fn float<I>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Option<f64>>,
    {
        let array: Float64Array = values.into_iter().map(|v| -> Option<f64> { v.into() }).collect();
        self.push(Field::new(name, DataType::Float64, true), Arc::new(array));
        self
    }

    /// Adds an Int64 column. Items may be `i64` or `Option<i64>`.
    pub fn int<I>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Option<i64>>,
    {
        let array: Int64Array = values.into_iter().map(|v| -> Option<i64> { v.into() }).collect();
        self.push(Field::new(name, DataType::Int64, true), Arc::new(array));
        self
    }

    /// Adds a Utf8 column.
    pub fn string<I, S>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        let array: StringArray = values.into_iter().collect();
        self.push(Field::new(name, DataType::Utf8, true), Arc::new(array));
        self
    }

    /// Adds a Boolean column. Items may be `bool` or `Option<bool>`.
    pub fn boolean<I>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Option<bool>>,
    {
        let array: BooleanArray = values.into_iter().map(|v| -> Option<bool> { v.into() }).collect();
        self.push(Field::new(name, DataType::Boolean, true), Arc::new(array));
        self
    }

    /// Adds a millisecond timestamp column.
    pub fn timestamp_millis<I>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Option<i64>>,
    {
        let array: TimestampMillisecondArray =
            values.into_iter().map(|v| -> Option<i64> { v.into() }).collect();
        self.push(
            Field::new(
                name,
                DataType::Timestamp(TimeUnit::Millisecond, None),
                true,
            ),
            Arc::new(array),
        );
        self
    }

    /// Adds an arbitrary Arrow array.
    pub fn array(mut self, name: &str, array: ArrayRef) -> Self {
        let field = Field::new(name, array.data_type().clone(), true);
        self.push(field, array);
        self
    }

    fn push(&mut self, field: Field, array: ArrayRef) {
        self.fields.push(field);
        self.arrays.push(array);
    }

    pub fn build(self) -> Result<Dataset> {
        if self.arrays.is_empty() {
            return Err(DriftError::configuration(format!(
                "dataset '{}' must contain at least one column",
                self.id
            )));
        }
        let schema = Arc::new(Schema::new(self.fields));
        let batch = RecordBatch::try_new(schema, self.arrays)?;
        Dataset::from_record_batch(self.id, self.origin, batch)
    }
}
