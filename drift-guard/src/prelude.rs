//! Prelude for commonly used types and traits in drift-guard.

pub use crate::analyzers::{AnomalyResult, FeatureKind, IsolationForest, ZScoreDetector};
pub use crate::core::{
    Clock, DriftConfig, DriftEngine, DriftReport, FixedClock, Severity, SkipReason, SystemClock,
    TestKind, TestResult,
};
pub use crate::dataset::{ColumnType, Dataset, DatasetOrigin};
pub use crate::error::{DriftError, ErrorContext, Result};
pub use crate::formatters::{
    FormatterConfig, HumanFormatter, JsonFormatter, MarkdownFormatter, ReportFormatter,
};
pub use crate::logging::LogConfig;
pub use crate::quality::{QualityConfig, QualityGrade};
pub use crate::repository::{BaselineStore, BaselineVersion, InMemoryBaselineStore};
