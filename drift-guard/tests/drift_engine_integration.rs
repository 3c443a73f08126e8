//! End-to-end drift checks through the engine and the in-memory store.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{engine, one_to_five, store, transactions, SlowStore};
use drift_guard::analyzers::{FeatureKind, ZScoreDetector};
use drift_guard::core::{DriftConfig, DriftEngine, FixedClock, Severity, SkipReason, TestKind};
use drift_guard::dataset::{ColumnType, Dataset, DatasetOrigin};
use drift_guard::error::DriftError;
use drift_guard::logging::LogConfig;
use drift_guard::quality::QualityConfig;
use drift_guard::repository::{InMemoryBaselineStore, ReportId};

#[tokio::test]
async fn test_identical_distributions_report_no_drift() {
    let store = store();
    let version = store
        .register_baseline(one_to_five("base", DatasetOrigin::Baseline), None)
        .await
        .unwrap();

    let report = engine(store.clone())
        .run_drift_check(
            &version.version_id,
            one_to_five("cur", DatasetOrigin::Current),
            DriftConfig::default(),
        )
        .await
        .unwrap();

    assert_eq!(report.overall_severity(), Severity::None);
    assert!(!report.has_drift());
    let value = report.feature("value").unwrap();
    assert_eq!(value.kind, FeatureKind::Numeric);
    for result in &value.results {
        assert!(!result.is_skipped());
        assert_eq!(result.statistic(), Some(0.0));
    }
    assert_eq!(
        report.anomaly().skip_reason(),
        Some(&SkipReason::InsufficientNumericFeatures { found: 1 })
    );

    let id = ReportId::minted(1, &report.fingerprint().unwrap());
    assert_eq!(store.get_report(&id).await, Some(report));
}

#[tokio::test]
async fn test_shift_outside_baseline_range_is_severe() {
    let build = |id: &str, origin, offset: f64| {
        Dataset::builder(id, origin)
            .float(
                "temperature",
                (0..500i32).map(|i| offset + f64::from(i % 10) * 0.1),
            )
            .build()
            .unwrap()
    };
    let store = store();
    let version = store
        .register_baseline(build("base", DatasetOrigin::Baseline, 10.0), None)
        .await
        .unwrap();

    let report = engine(store)
        .run_drift_check(
            &version.version_id,
            build("cur", DatasetOrigin::Current, 50.0),
            DriftConfig::default(),
        )
        .await
        .unwrap();

    let feature = report.feature("temperature").unwrap();
    let psi = feature
        .results
        .iter()
        .find(|r| r.test() == TestKind::PopulationStabilityIndex)
        .unwrap();
    assert!(psi.statistic().unwrap() > 0.25);
    assert_eq!(psi.severity(), Severity::Severe);
    assert_eq!(feature.severity, Severity::Severe);
    assert_eq!(report.overall_severity(), Severity::Severe);
    assert_eq!(report.drifted_features(), vec!["temperature"]);
}

#[tokio::test]
async fn test_high_cardinality_runs_jensen_shannon_only() {
    let build = |id: &str, origin| {
        Dataset::builder(id, origin)
            .string("sku", (0..1000).map(|i| Some(format!("sku_{}", i % 500))))
            .build()
            .unwrap()
    };
    let report = engine(store())
        .check_datasets(
            "adhoc",
            build("base", DatasetOrigin::Baseline),
            build("cur", DatasetOrigin::Current),
            DriftConfig::builder()
                .max_categorical_cardinality(50)
                .build()
                .unwrap(),
        )
        .await
        .unwrap();

    let sku = report.feature("sku").unwrap();
    assert_eq!(sku.kind, FeatureKind::Categorical);
    let chi = &sku.results[0];
    assert_eq!(chi.test(), TestKind::ChiSquare);
    assert_eq!(
        chi.skip_reason(),
        Some(&SkipReason::CardinalityExceedsCeiling {
            cardinality: 500,
            ceiling: 50
        })
    );
    assert_eq!(
        chi.skip_reason().map(SkipReason::reason),
        Some("cardinality exceeds ceiling")
    );
    let js = &sku.results[1];
    assert_eq!(js.test(), TestKind::JensenShannon);
    assert!(!js.is_skipped());
    // The anomaly check is skipped for a dataset without numeric features.
    assert_eq!(report.tier_counts().skipped, 2);
}

#[tokio::test]
async fn test_schema_mismatch_produces_no_report() {
    let store = store();
    let version = store
        .register_baseline(
            transactions("base", DatasetOrigin::Baseline, 200, 0.0),
            None,
        )
        .await
        .unwrap();
    let current = Dataset::builder("cur", DatasetOrigin::Current)
        .float("amount", (0..200i32).map(f64::from))
        .float("latency_ms", (0..200i32).map(f64::from))
        .string("region", (0..200).map(|_| Some("eu")))
        .build()
        .unwrap();

    let err = engine(store.clone())
        .run_drift_check(&version.version_id, current, DriftConfig::default())
        .await
        .unwrap_err();

    match err {
        DriftError::SchemaMismatch {
            missing_in_current,
            unexpected_in_current,
            ..
        } => {
            assert_eq!(missing_in_current, vec!["channel".to_string()]);
            assert_eq!(unexpected_in_current, vec!["region".to_string()]);
        }
        other => panic!("expected schema mismatch, got {other:?}"),
    }
    assert_eq!(store.report_count().await, 0);
}

#[tokio::test]
async fn test_repeated_runs_are_byte_identical() {
    let store = store();
    let version = store
        .register_baseline(
            transactions("base", DatasetOrigin::Baseline, 400, 0.0),
            None,
        )
        .await
        .unwrap();
    let engine = engine(store.clone());
    let config = DriftConfig::builder()
        .anomaly_seed(7)
        .quality(QualityConfig::enabled())
        .build()
        .unwrap();

    let first = engine
        .run_drift_check(
            &version.version_id,
            transactions("cur", DatasetOrigin::Current, 400, 1.5),
            config.clone(),
        )
        .await
        .unwrap();
    let second = engine
        .run_drift_check(
            &version.version_id,
            transactions("cur", DatasetOrigin::Current, 400, 1.5),
            config,
        )
        .await
        .unwrap();

    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
    assert_eq!(first.anomaly().seed(), 7);
    assert!(!first.anomaly().is_skipped());
    // Identical content, but each run is stored under its own id.
    let ids = store.report_ids().await;
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
    assert_eq!(ids[0].fingerprint_prefix(), ids[1].fingerprint_prefix());
}

#[tokio::test]
async fn test_deadline_expiry_persists_nothing() {
    let inner = InMemoryBaselineStore::new();
    let version = inner
        .register_baseline(
            transactions("base", DatasetOrigin::Baseline, 100, 0.0),
            None,
        )
        .await
        .unwrap();
    let slow = Arc::new(SlowStore {
        inner: inner.clone(),
        delay: Duration::from_millis(500),
    });

    let err = engine(slow)
        .run_drift_check(
            &version.version_id,
            transactions("cur", DatasetOrigin::Current, 100, 0.0),
            DriftConfig::builder().timeout_ms(20).build().unwrap(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DriftError::Timeout { limit_ms: 20 }));
    assert_eq!(inner.report_count().await, 0);
}

#[tokio::test]
async fn test_duplicate_rows_raise_overall_severity() {
    let build = |id: &str, origin| {
        Dataset::builder(id, origin)
            .float("x", (0..100i32).map(|i| f64::from(i % 10)))
            .float("y", (0..100i32).map(|i| f64::from(i % 10) * 2.0))
            .build()
            .unwrap()
    };
    let config = DriftConfig::builder()
        .quality(QualityConfig::enabled())
        .build()
        .unwrap();

    let report = engine(store())
        .check_datasets(
            "adhoc",
            build("base", DatasetOrigin::Baseline),
            build("cur", DatasetOrigin::Current),
            config,
        )
        .await
        .unwrap();

    assert!(report.features().iter().all(|f| f.severity == Severity::None));
    let duplicates = report
        .quality_checks()
        .iter()
        .find(|r| r.test() == TestKind::Duplicates)
        .unwrap();
    assert_eq!(duplicates.statistic(), Some(1.0));
    assert_eq!(duplicates.severity(), Severity::Severe);
    assert_eq!(report.overall_severity(), Severity::Severe);

    let score = report.quality_score().unwrap();
    assert!(score.duplicates.score < 1e-9);
    assert!(score.overall < 100.0);
}

#[tokio::test]
async fn test_quality_checks_are_opt_in() {
    let report = engine(store())
        .check_datasets(
            "adhoc",
            transactions("base", DatasetOrigin::Baseline, 200, 0.0),
            transactions("cur", DatasetOrigin::Current, 200, 0.0),
            DriftConfig::default(),
        )
        .await
        .unwrap();
    assert!(report.quality_checks().is_empty());
    assert!(report.quality_score().is_none());
}

#[tokio::test]
async fn test_datetime_columns_are_excluded() {
    let build = |id: &str, origin| {
        Dataset::builder(id, origin)
            .float("amount", (0..120i32).map(|i| f64::from(i % 12)))
            .float("fee", (0..120i32).map(|i| f64::from(i % 7)))
            .timestamp_millis(
                "created_at",
                (0..120i64).map(|i| 1_700_000_000_000 + i * 60_000),
            )
            .build()
            .unwrap()
    };

    let report = engine(store())
        .check_datasets(
            "adhoc",
            build("base", DatasetOrigin::Baseline),
            build("cur", DatasetOrigin::Current),
            DriftConfig::default(),
        )
        .await
        .unwrap();

    assert_eq!(report.features().len(), 2);
    assert!(report.feature("created_at").is_none());
    let excluded = &report.excluded_features()[0];
    assert_eq!(excluded.feature, "created_at");
    assert_eq!(excluded.column_type, ColumnType::Datetime);
    assert_eq!(
        excluded.reason,
        SkipReason::UnsupportedColumnType {
            column_type: ColumnType::Datetime
        }
    );
    assert_eq!(
        report.anomaly().features().to_vec(),
        vec!["amount".to_string(), "fee".to_string()]
    );
}

#[tokio::test]
async fn test_single_numeric_feature_skips_anomaly_detection() {
    let build = |id: &str, origin, rows: i32| {
        Dataset::builder(id, origin)
            .float("score", (0..rows).map(|i| f64::from(i % 25)))
            .string("tier", (0..rows).map(|i| Some(if i % 2 == 0 { "gold" } else { "silver" })))
            .build()
            .unwrap()
    };

    let report = engine(store())
        .check_datasets(
            "adhoc",
            build("base", DatasetOrigin::Baseline, 300),
            build("cur", DatasetOrigin::Current, 300),
            DriftConfig::default(),
        )
        .await
        .unwrap();

    let anomaly = report.anomaly();
    assert!(anomaly.is_skipped());
    assert_eq!(anomaly.severity(), None);
    assert_eq!(
        anomaly.skip_reason(),
        Some(&SkipReason::InsufficientNumericFeatures { found: 1 })
    );
    assert_eq!(report.overall_severity(), Severity::None);
}

#[tokio::test]
async fn test_small_samples_skip_ks_but_run_psi() {
    let build = |id: &str, origin| {
        Dataset::builder(id, origin)
            .float("reading", (0..12i32).map(f64::from))
            .build()
            .unwrap()
    };
    let report = engine(store())
        .check_datasets(
            "adhoc",
            build("base", DatasetOrigin::Baseline),
            build("cur", DatasetOrigin::Current),
            DriftConfig::default(),
        )
        .await
        .unwrap();

    let results = &report.feature("reading").unwrap().results;
    assert_eq!(
        results[0].skip_reason(),
        Some(&SkipReason::SampleBelowMinimum {
            sample_size: 12,
            minimum: 30
        })
    );
    assert!(!results[1].is_skipped());
}

#[tokio::test]
async fn test_detector_backend_is_swappable() {
    let engine = DriftEngine::builder(store())
        .detector(Arc::new(ZScoreDetector))
        .clock(Arc::new(FixedClock(common::run_time())))
        .log_config(LogConfig::verbose())
        .build();

    let report = engine
        .check_datasets(
            "adhoc",
            transactions("base", DatasetOrigin::Baseline, 300, 0.0),
            transactions("cur", DatasetOrigin::Current, 300, 0.0),
            DriftConfig::default(),
        )
        .await
        .unwrap();

    let anomaly = report.anomaly();
    assert_eq!(anomaly.detector(), "zscore");
    assert_eq!(anomaly.excess_fraction(), Some(0.0));
    assert_eq!(anomaly.severity(), Some(Severity::None));
}

#[tokio::test]
async fn test_joint_shift_alone_is_counted_in_tiers() {
    // Same marginals, inverted relationship between the two features.
    let build = |id: &str, origin, inverted: bool| {
        Dataset::builder(id, origin)
            .float("x", (0..400i32).map(f64::from))
            .float(
                "y",
                (0..400i32).map(|i| f64::from(if inverted { 399 - i } else { i })),
            )
            .build()
            .unwrap()
    };

    let report = engine(store())
        .check_datasets(
            "adhoc",
            build("base", DatasetOrigin::Baseline, false),
            build("cur", DatasetOrigin::Current, true),
            DriftConfig::default(),
        )
        .await
        .unwrap();

    assert!(report.drifted_features().is_empty());
    let anomaly = report.anomaly().severity().unwrap();
    assert!(anomaly > Severity::None);
    assert_eq!(report.overall_severity(), anomaly);

    let counts = report.tier_counts();
    assert_eq!(counts.none, 4);
    assert_eq!(counts.skipped, 0);
    let anomaly_tier = match anomaly {
        Severity::Moderate => counts.moderate,
        _ => counts.severe,
    };
    assert_eq!(anomaly_tier, 1);
    assert_eq!(counts.total(), 5);
}

#[tokio::test]
async fn test_infinite_values_do_not_abort_the_run() {
    let build = |id: &str, origin| {
        Dataset::builder(id, origin)
            .float(
                "load",
                (0..200i32).map(|i| match i {
                    0 => f64::INFINITY,
                    1 => 1e308,
                    2 => -1e308,
                    _ => f64::from(i % 40),
                }),
            )
            .float("temp", (0..200i32).map(|i| f64::from((i * 3) % 17)))
            .build()
            .unwrap()
    };

    let report = engine(store())
        .check_datasets(
            "adhoc",
            build("base", DatasetOrigin::Baseline),
            build("cur", DatasetOrigin::Current),
            DriftConfig::default(),
        )
        .await
        .unwrap();

    let anomaly = report.anomaly();
    assert!(!anomaly.is_skipped());
    assert_eq!(anomaly.excess_fraction(), Some(0.0));
    assert_eq!(anomaly.score().unwrap().baseline_rows, 199);
}
