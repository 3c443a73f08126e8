//! Error types for drift-guard.
//!
//! Every failure that aborts a drift check is represented by [`DriftError`].
//! Individual statistical tests that cannot run are *not* errors: they are
//! recorded in the report as skipped results (see
//! [`SkipReason`](crate::core::SkipReason)).

use thiserror::Error;

/// The main error type for drift-guard.
#[derive(Error, Debug)]
pub enum DriftError {
    /// Baseline and current datasets do not share the same schema.
    #[error("Schema mismatch: {message}")]
    SchemaMismatch {
        /// Human-readable summary of every difference
        message: String,
        /// Columns present in the baseline but absent from the current dataset
        missing_in_current: Vec<String>,
        /// Columns present in the current dataset but absent from the baseline
        unexpected_in_current: Vec<String>,
        /// Columns whose physical type differs, formatted as `name: baseline != current`
        type_mismatches: Vec<String>,
    },

    /// Invalid or inconsistent configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The check exceeded its wall-clock deadline.
    #[error("Drift check timed out after {limit_ms} ms")]
    Timeout { limit_ms: u64 },

    /// The requested baseline version is not known to the store.
    #[error("Baseline version '{version_id}' not found")]
    BaselineNotFound { version_id: String },

    /// Error when a required column is not found in the dataset.
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// Error when data types don't match expected types.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error when an operation is not supported by a backend.
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Security-related error.
    #[error("Security error: {0}")]
    Security(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, DriftError>`.
pub type Result<T> = std::result::Result<T, DriftError>;

impl DriftError {
    /// Creates a schema mismatch error, composing the message from the differences.
    pub fn schema_mismatch(
        missing_in_current: Vec<String>,
        unexpected_in_current: Vec<String>,
        type_mismatches: Vec<String>,
    ) -> Self {
        let mut parts = Vec::new();
        if !missing_in_current.is_empty() {
            parts.push(format!(
                "missing in current: [{}]",
                missing_in_current.join(", ")
            ));
        }
        if !unexpected_in_current.is_empty() {
            parts.push(format!(
                "unexpected in current: [{}]",
                unexpected_in_current.join(", ")
            ));
        }
        if !type_mismatches.is_empty() {
            parts.push(format!("type mismatches: [{}]", type_mismatches.join(", ")));
        }

        Self::SchemaMismatch {
            message: parts.join("; "),
            missing_in_current,
            unexpected_in_current,
            type_mismatches,
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Stable machine-readable code for this error category.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SchemaMismatch { .. } => "schema_mismatch",
            Self::Configuration(_) => "configuration",
            Self::Timeout { .. } => "timeout",
            Self::BaselineNotFound { .. } => "baseline_not_found",
            Self::ColumnNotFound { .. } => "column_not_found",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::DataFusion(_) => "datafusion",
            Self::Arrow(_) => "arrow",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::NotSupported(_) => "not_supported",
            Self::Security(_) => "security",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for DriftError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<DriftError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.with_context(|| msg.to_string())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| match e.into() {
            DriftError::Internal(inner) => DriftError::Internal(format!("{}: {}", f(), inner)),
            // Typed categories stay matchable by callers.
            other @ (DriftError::SchemaMismatch { .. }
            | DriftError::Configuration(_)
            | DriftError::Timeout { .. }
            | DriftError::BaselineNotFound { .. }) => other,
            other => DriftError::Internal(format!("{}: {}", f(), other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mismatch_message() {
        let err = DriftError::schema_mismatch(
            vec!["age".to_string()],
            vec![],
            vec!["score: Float64 != Utf8".to_string()],
        );
        assert_eq!(
            err.to_string(),
            "Schema mismatch: missing in current: [age]; type mismatches: [score: Float64 != Utf8]"
        );
        assert_eq!(err.code(), "schema_mismatch");
    }

    #[test]
    fn test_timeout_display() {
        let err = DriftError::Timeout { limit_ms: 250 };
        assert_eq!(err.to_string(), "Drift check timed out after 250 ms");
        assert_eq!(err.code(), "timeout");
    }

    #[test]
    fn test_column_not_found() {
        let err = DriftError::ColumnNotFound {
            column: "user_id".to_string(),
        };
        assert_eq!(err.to_string(), "Column 'user_id' not found in dataset");
    }

    #[test]
    fn test_serde_json_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: DriftError = parse.unwrap_err().into();
        assert!(matches!(err, DriftError::Serialization(_)));
    }

    #[test]
    fn test_error_context_wraps_internal() {
        fn failing_operation() -> Result<()> {
            Err(DriftError::Internal("Something went wrong".to_string()))
        }

        let err = failing_operation().context("During profiling").unwrap_err();
        assert!(err.to_string().contains("During profiling"));
        assert!(err.to_string().contains("Something went wrong"));
    }

    #[test]
    fn test_error_context_preserves_typed_errors() {
        let result: Result<()> = Err(DriftError::configuration("psi_bins must be >= 2"));
        let err = result.context("While validating").unwrap_err();
        assert!(matches!(err, DriftError::Configuration(_)));
    }
}
