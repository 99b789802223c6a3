/// Structured counters for the loader pipeline
///
/// Process-local atomics; the transport that scrapes or ships them is out
/// of scope. Counters are monotonically increasing apart from the last-scan
/// gauge.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::loader::LoadResult;

/// Counters kept by the definition loader across scans and reloads.
#[derive(Debug, Default)]
pub struct LoaderMetrics {
    definitions_loaded: AtomicU64,
    load_errors: AtomicU64,
    validation_failures: AtomicU64,
    hot_reloads: AtomicU64,
    publish_failures: AtomicU64,
    last_scan_ms: AtomicU64,
}

/// Point-in-time view of the counters, serializable for any sink.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub definitions_loaded: u64,
    pub load_errors: u64,
    pub validation_failures: u64,
    pub hot_reloads: u64,
    pub publish_failures: u64,
    pub last_scan_ms: u64,
    pub collected_at: DateTime<Utc>,
}

impl LoaderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_loaded(&self) {
        self.definitions_loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_error(&self) {
        self.load_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_failure(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reload(&self) {
        self.hot_reloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Stamp a finished scan: duration gauge plus a structured log record
    /// for whatever subscriber is attached.
    pub fn record_scan(&self, result: &LoadResult) {
        self.last_scan_ms
            .store(result.duration.as_millis() as u64, Ordering::Relaxed);
        tracing::debug!(
            loaded = result.loaded.len(),
            errors = result.errors.len(),
            skipped = result.skipped.len(),
            publish_failures = result.publish_failures.len(),
            duration_ms = result.duration.as_millis() as u64,
            "📊 scan metrics"
        );
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            definitions_loaded: self.definitions_loaded.load(Ordering::Relaxed),
            load_errors: self.load_errors.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            hot_reloads: self.hot_reloads.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            last_scan_ms: self.last_scan_ms.load(Ordering::Relaxed),
            collected_at: Utc::now(),
        }
    }
}
