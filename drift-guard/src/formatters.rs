//! Renderings of a [`DriftReport`] for downstream consumers.
//!
//! Formatters only read reports. JSON output is the serde form of the report,
//! filtered by [`FormatterConfig`]; the human and Markdown formatters summarize
//! tiers, per-feature tests, the anomaly result and the quality score.
//!
//! # Examples
//!
//! ```rust,ignore
//! use drift_guard::formatters::{HumanFormatter, ReportFormatter};
//!
//! let report = engine.run_drift_check(&version_id, current, config).await?;
//! println!("{}", HumanFormatter::new().format(&report)?);
//! ```

use std::fmt::{self, Write};

use serde_json::Value;

use crate::analyzers::anomaly::AnomalyOutcome;
use crate::core::{DriftReport, FeatureResults, Severity, TestResult};
use crate::error::{DriftError, Result};

/// Options controlling what a formatter includes.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include tier counts and overall severity.
    pub include_summary: bool,
    /// Include per-feature test tables.
    pub include_features: bool,
    /// Include skipped tests and their reasons.
    pub include_skipped: bool,
    /// Maximum number of features to show (-1 for all).
    pub max_features: i32,
    /// Whether to use ANSI colors (human formatter only).
    pub use_colors: bool,
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_summary: true,
            include_features: true,
            include_skipped: true,
            max_features: -1,
            use_colors: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Summary only.
    pub fn minimal() -> Self {
        Self {
            include_summary: true,
            include_features: false,
            include_skipped: false,
            max_features: 0,
            use_colors: false,
            include_timestamps: false,
        }
    }

    pub fn detailed() -> Self {
        Self::default()
    }

    /// Plain output with a bounded feature list, for CI logs.
    pub fn ci() -> Self {
        Self {
            include_summary: true,
            include_features: true,
            include_skipped: false,
            max_features: 50,
            use_colors: false,
            include_timestamps: true,
        }
    }

    pub fn with_features(mut self, include: bool) -> Self {
        self.include_features = include;
        self
    }

    pub fn with_skipped(mut self, include: bool) -> Self {
        self.include_skipped = include;
        self
    }

    pub fn with_max_features(mut self, max: i32) -> Self {
        self.max_features = max;
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn with_timestamps(mut self, include: bool) -> Self {
        self.include_timestamps = include;
        self
    }

    fn shown<'a>(&self, features: &'a [FeatureResults]) -> &'a [FeatureResults] {
        if self.max_features < 0 {
            features
        } else {
            &features[..features.len().min(self.max_features as usize)]
        }
    }
}

/// Turns a report into text.
pub trait ReportFormatter {
    fn format(&self, report: &DriftReport) -> Result<String>;

    /// Formats with explicit options; the default ignores them.
    fn format_with_config(&self, report: &DriftReport, _config: &FormatterConfig) -> Result<String> {
        self.format(report)
    }
}

fn render_error(error: fmt::Error) -> DriftError {
    DriftError::Internal(format!("failed to render report: {error}"))
}

/// Serializes the report as JSON.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            pretty: true,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &DriftReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &DriftReport, config: &FormatterConfig) -> Result<String> {
        let mut value = serde_json::to_value(report)?;
        filter_json(&mut value, config);
        let output = if self.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(output)
    }
}

fn filter_json(value: &mut Value, config: &FormatterConfig) {
    let Some(object) = value.as_object_mut() else {
        return;
    };
    if !config.include_timestamps {
        object.remove("generated_at");
    }
    if !config.include_summary {
        object.remove("tier_counts");
    }
    if let Some(Value::Array(features)) = object.get_mut("features") {
        if !config.include_features {
            features.clear();
        } else if config.max_features >= 0 {
            features.truncate(config.max_features as usize);
        }
        if !config.include_skipped {
            for feature in features.iter_mut() {
                if let Some(Value::Array(results)) = feature.get_mut("results") {
                    results.retain(|r| r.get("skipped").map_or(true, Value::is_null));
                }
            }
        }
    }
}

/// Console-oriented summary.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for HumanFormatter {
    fn format(&self, report: &DriftReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &DriftReport, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        write_human(&mut output, report, config).map_err(render_error)?;
        Ok(output)
    }
}

fn colored(severity: Severity, use_colors: bool) -> String {
    if !use_colors {
        return severity.to_string().to_uppercase();
    }
    let code = match severity {
        Severity::None => "32",
        Severity::Moderate => "33",
        Severity::Severe => "31",
    };
    format!("\x1b[{code}m{}\x1b[0m", severity.to_string().to_uppercase())
}

fn result_line(result: &TestResult) -> String {
    match result.skip_reason() {
        Some(reason) => format!("{:<15} skipped: {reason}", result.test().id()),
        None => {
            let statistic = result.statistic().unwrap_or(f64::NAN);
            match result.p_value() {
                Some(p) => format!(
                    "{:<15} {statistic:.4} (p={p:.4}) {}",
                    result.test().id(),
                    result.severity()
                ),
                None => format!(
                    "{:<15} {statistic:.4} {}",
                    result.test().id(),
                    result.severity()
                ),
            }
        }
    }
}

fn write_human(out: &mut String, report: &DriftReport, config: &FormatterConfig) -> fmt::Result {
    writeln!(out)?;
    writeln!(
        out,
        "Drift check: {}",
        colored(report.overall_severity(), config.use_colors)
    )?;
    writeln!(out, "Baseline: {}", report.baseline_version_id())?;
    writeln!(out, "Current:  {}", report.current_dataset_id())?;
    if config.include_timestamps {
        writeln!(out, "Generated: {}", report.generated_at().to_rfc3339())?;
    }

    if config.include_summary {
        let counts = report.tier_counts();
        writeln!(out)?;
        writeln!(out, "Summary:")?;
        writeln!(out, "   Features: {}", report.features().len())?;
        writeln!(out, "   Excluded: {}", report.excluded_features().len())?;
        writeln!(out, "   Results none/moderate/severe/skipped: {}/{}/{}/{}",
            counts.none, counts.moderate, counts.severe, counts.skipped)?;
        let drifted = report.drifted_features();
        if !drifted.is_empty() {
            writeln!(out, "   Drifted: {}", drifted.join(", "))?;
        }
    }

    if config.include_features && !report.features().is_empty() {
        writeln!(out)?;
        writeln!(out, "Features:")?;
        let shown = config.shown(report.features());
        for feature in shown {
            writeln!(
                out,
                "   {} [{:?}] {}",
                feature.feature,
                feature.kind,
                colored(feature.severity, config.use_colors)
            )?;
            for result in &feature.results {
                if result.is_skipped() && !config.include_skipped {
                    continue;
                }
                writeln!(out, "      {}", result_line(result))?;
            }
        }
        if report.features().len() > shown.len() {
            writeln!(
                out,
                "   ... and {} more features",
                report.features().len() - shown.len()
            )?;
        }
    }

    writeln!(out)?;
    let anomaly = report.anomaly();
    match anomaly.outcome() {
        AnomalyOutcome::Scored {
            score,
            excess_fraction,
            severity,
        } => writeln!(
            out,
            "Anomaly ({}, seed {}): {:.2}% -> {:.2}% (excess {:+.2}%) {}",
            anomaly.detector(),
            anomaly.seed(),
            score.baseline_fraction * 100.0,
            score.current_fraction * 100.0,
            excess_fraction * 100.0,
            colored(*severity, config.use_colors)
        )?,
        AnomalyOutcome::Skipped { reason } => {
            writeln!(out, "Anomaly ({}): skipped: {reason}", anomaly.detector())?
        }
    }

    if !report.quality_checks().is_empty() {
        writeln!(out)?;
        writeln!(out, "Quality:")?;
        for result in report.quality_checks() {
            if result.is_skipped() && !config.include_skipped {
                continue;
            }
            writeln!(out, "   {:<12} {}", result.feature(), result_line(result))?;
        }
    }
    if let Some(score) = report.quality_score() {
        writeln!(out, "   Score: {:.2}/100 ({})", score.overall, score.grade)?;
    }

    writeln!(out)
}

/// Markdown for pull requests, wikis and run logs.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            heading_level: 2,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the base heading level, clamped to 1..=6.
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 6);
        self
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for MarkdownFormatter {
    fn format(&self, report: &DriftReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &DriftReport, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        write_markdown(&mut output, report, config, self.heading_level).map_err(render_error)?;
        Ok(output)
    }
}

fn write_markdown(
    out: &mut String,
    report: &DriftReport,
    config: &FormatterConfig,
    heading_level: u8,
) -> fmt::Result {
    let h = "#".repeat(heading_level as usize);

    writeln!(
        out,
        "{h} Drift Report - {}",
        report.overall_severity().to_string().to_uppercase()
    )?;
    writeln!(out)?;
    writeln!(out, "**Baseline:** {}", report.baseline_version_id())?;
    writeln!(out, "**Current:** {}", report.current_dataset_id())?;
    if config.include_timestamps {
        writeln!(out, "**Generated:** {}", report.generated_at().to_rfc3339())?;
    }

    if config.include_summary {
        let counts = report.tier_counts();
        writeln!(out)?;
        writeln!(out, "{h}# Summary")?;
        writeln!(out)?;
        writeln!(out, "| Tier | Tests |")?;
        writeln!(out, "|------|-------|")?;
        writeln!(out, "| none | {} |", counts.none)?;
        writeln!(out, "| moderate | {} |", counts.moderate)?;
        writeln!(out, "| severe | {} |", counts.severe)?;
        writeln!(out, "| skipped | {} |", counts.skipped)?;
    }

    if config.include_features && !report.features().is_empty() {
        writeln!(out)?;
        writeln!(out, "{h}# Features")?;
        writeln!(out)?;
        writeln!(out, "| Feature | Test | Statistic | p-value | Severity |")?;
        writeln!(out, "|---------|------|-----------|---------|----------|")?;
        let shown = config.shown(report.features());
        for feature in shown {
            for result in &feature.results {
                if result.is_skipped() {
                    if config.include_skipped {
                        let reason = result
                            .skip_reason()
                            .map(|r| r.reason())
                            .unwrap_or_default();
                        writeln!(
                            out,
                            "| {} | {} | - | - | skipped: {reason} |",
                            feature.feature,
                            result.test()
                        )?;
                    }
                    continue;
                }
                let p_value = result
                    .p_value()
                    .map_or_else(|| "-".to_string(), |p| format!("{p:.4}"));
                writeln!(
                    out,
                    "| {} | {} | {:.4} | {p_value} | {} |",
                    feature.feature,
                    result.test(),
                    result.statistic().unwrap_or(f64::NAN),
                    result.severity()
                )?;
            }
        }
        if report.features().len() > shown.len() {
            writeln!(out)?;
            writeln!(
                out,
                "> **Note:** {} additional features not shown in this report.",
                report.features().len() - shown.len()
            )?;
        }
    }

    if !report.excluded_features().is_empty() {
        writeln!(out)?;
        writeln!(out, "{h}# Excluded")?;
        writeln!(out)?;
        for excluded in report.excluded_features() {
            writeln!(out, "- `{}`: {}", excluded.feature, excluded.reason)?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{h}# Anomaly")?;
    writeln!(out)?;
    let anomaly = report.anomaly();
    writeln!(out, "- **Detector:** {} (seed {})", anomaly.detector(), anomaly.seed())?;
    match anomaly.outcome() {
        AnomalyOutcome::Scored {
            excess_fraction,
            severity,
            ..
        } => {
            writeln!(out, "- **Excess fraction:** {excess_fraction:.4}")?;
            writeln!(out, "- **Severity:** {severity}")?;
        }
        AnomalyOutcome::Skipped { reason } => writeln!(out, "- **Skipped:** {reason}")?,
    }

    if let Some(score) = report.quality_score() {
        writeln!(out)?;
        writeln!(out, "{h}# Quality")?;
        writeln!(out)?;
        writeln!(out, "**Score:** {:.2}/100 ({})", score.overall, score.grade)?;
        writeln!(out)?;
        writeln!(out, "| Component | Score | Weight |")?;
        writeln!(out, "|-----------|-------|--------|")?;
        for (name, component) in [
            ("missing values", &score.missing_values),
            ("duplicates", &score.duplicates),
            ("outliers", &score.outliers),
            ("schema consistency", &score.schema_consistency),
        ] {
            writeln!(
                out,
                "| {name} | {:.2} | {:.1} |",
                component.score, component.weight
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::anomaly::AnomalyResult;
    use crate::analyzers::profiler::{FeatureKind, FeatureProfile};
    use crate::core::{
        DriftConfig, ReportAggregator, SkipReason, TestKind, TestStatistic,
    };
    use crate::dataset::ColumnType;
    use chrono::{TimeZone, Utc};

    fn profile(name: &str) -> FeatureProfile {
        FeatureProfile {
            name: name.to_string(),
            column_type: ColumnType::Numeric,
            kind: FeatureKind::Numeric,
            row_count: 100,
            missing_count: 0,
            missing_rate: 0.0,
            sample_size: 100,
            cardinality: None,
        }
    }

    fn create_test_report() -> DriftReport {
        let mut aggregator = ReportAggregator::new(
            "baseline_v2_20240301",
            "march_traffic",
            DriftConfig::default(),
            Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap(),
        );
        for (name, psi, severity) in [
            ("latency", 0.31, Severity::Severe),
            ("bytes", 0.02, Severity::None),
        ] {
            aggregator.add_feature(FeatureResults::new(
                profile(name),
                profile(name),
                vec![
                    TestResult::executed(
                        name,
                        TestKind::KolmogorovSmirnov,
                        TestStatistic::with_p_value(0.2, 0.001),
                        severity,
                    ),
                    TestResult::executed(
                        name,
                        TestKind::PopulationStabilityIndex,
                        TestStatistic::divergence(psi),
                        severity,
                    ),
                    TestResult::skipped(
                        name,
                        TestKind::JensenShannon,
                        SkipReason::EmptySample,
                    ),
                ],
            ));
        }
        aggregator.with_anomaly(AnomalyResult::skipped(
            "isolation_forest",
            42,
            vec!["latency".into(), "bytes".into()],
            SkipReason::InsufficientRows {
                rows: 4,
                minimum: 10,
            },
        ));
        aggregator.finish().unwrap()
    }

    #[test]
    fn test_formatter_config() {
        let config = FormatterConfig::default();
        assert!(config.include_features);
        assert!(config.use_colors);

        let minimal = FormatterConfig::minimal();
        assert!(!minimal.include_features);
        assert!(!minimal.use_colors);

        let ci = FormatterConfig::ci();
        assert!(!ci.use_colors);
        assert_eq!(ci.max_features, 50);
    }

    #[test]
    fn test_json_formatter() {
        let report = create_test_report();
        let output = JsonFormatter::new().format(&report).unwrap();
        assert!(output.contains("\"overall_severity\": \"severe\""));
        assert!(output.contains("\"generated_at\""));
        assert!(output.contains("march_traffic"));

        let minimal = JsonFormatter::new()
            .format_with_config(&report, &FormatterConfig::minimal())
            .unwrap();
        let value: Value = serde_json::from_str(&minimal).unwrap();
        assert!(value.get("generated_at").is_none());
        assert_eq!(value["features"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_json_drops_skipped_results() {
        let report = create_test_report();
        let config = FormatterConfig::default().with_skipped(false);
        let output = JsonFormatter::new()
            .with_pretty(false)
            .format_with_config(&report, &config)
            .unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["features"][0]["results"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_human_formatter() {
        let report = create_test_report();
        let formatter = HumanFormatter::new();
        let output = formatter.format(&report).unwrap();
        assert!(output.contains("Drift check:"));
        assert!(output.contains("baseline_v2_20240301"));
        assert!(output.contains("Drifted: latency"));
        assert!(output.contains("skipped: insufficient rows"));

        let plain = formatter
            .format_with_config(&report, &FormatterConfig::default().with_colors(false))
            .unwrap();
        assert!(plain.contains("Drift check: SEVERE"));
        assert!(!plain.contains("\x1b["));
    }

    #[test]
    fn test_markdown_formatter() {
        let report = create_test_report();
        let output = MarkdownFormatter::new().format(&report).unwrap();
        assert!(output.contains("## Drift Report - SEVERE"));
        assert!(output.contains("| severe | 2 |"));
        assert!(output.contains("| latency | psi | 0.3100 | - | severe |"));
        assert!(output.contains("| latency | jensen_shannon | - | - | skipped: empty sample |"));

        let output = MarkdownFormatter::new().with_heading_level(1).format(&report).unwrap();
        assert!(output.starts_with("# Drift Report"));
    }

    #[test]
    fn test_max_features() {
        let report = create_test_report();
        let config = FormatterConfig::default().with_max_features(1).with_colors(false);
        let output = HumanFormatter::new().format_with_config(&report, &config).unwrap();
        assert!(output.contains("latency"));
        assert!(output.contains("... and 1 more features"));
    }
}
