//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use drift_guard::core::{DriftEngine, DriftReport, FixedClock};
use drift_guard::dataset::{Dataset, DatasetOrigin};
use drift_guard::error::Result;
use drift_guard::repository::{BaselineSnapshot, BaselineStore, InMemoryBaselineStore, ReportId};

pub fn run_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn store() -> Arc<InMemoryBaselineStore> {
    Arc::new(InMemoryBaselineStore::with_clock(Arc::new(FixedClock(
        run_time(),
    ))))
}

pub fn engine(store: Arc<dyn BaselineStore>) -> DriftEngine {
    DriftEngine::builder(store)
        .clock(Arc::new(FixedClock(run_time())))
        .build()
}

/// `[1, 2, 3, 4, 5]` repeated 100 times in a single float column.
pub fn one_to_five(id: &str, origin: DatasetOrigin) -> Dataset {
    Dataset::builder(id, origin)
        .float("value", (0..500i32).map(|i| f64::from(i % 5 + 1)))
        .build()
        .unwrap()
}

/// Two correlated numeric features and a three-valued segment.
pub fn transactions(id: &str, origin: DatasetOrigin, rows: i32, shift: f64) -> Dataset {
    Dataset::builder(id, origin)
        .float(
            "amount",
            (0..rows).map(|i| f64::from(i % 40) * 2.5 + shift),
        )
        .float(
            "latency_ms",
            (0..rows).map(|i| f64::from((i * 7) % 30) + 10.0 + shift),
        )
        .string(
            "channel",
            (0..rows).map(|i| Some(["web", "mobile", "store"][(i % 3) as usize])),
        )
        .build()
        .unwrap()
}

/// Resolves baselines only after a delay.
#[derive(Debug, Clone)]
pub struct SlowStore {
    pub inner: InMemoryBaselineStore,
    pub delay: Duration,
}

#[async_trait]
impl BaselineStore for SlowStore {
    async fn resolve(&self, version_id: &str) -> Result<BaselineSnapshot> {
        tokio::time::sleep(self.delay).await;
        self.inner.resolve(version_id).await
    }

    async fn persist(&self, report: &DriftReport) -> Result<ReportId> {
        self.inner.persist(report).await
    }
}
