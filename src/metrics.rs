//! Metrics for conversion runs

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Per-run metrics collector
#[derive(Debug, Default)]
pub struct ConversionMetrics {
    pub files_converted: AtomicU64,
    pub files_failed: AtomicU64,
    pub bytes_written: AtomicU64,
    pub total_latency_ms: AtomicU64,
}

impl ConversionMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_success(&self, bytes: u64, latency_ms: u64) {
        self.files_converted.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn record_failure(&self, latency_ms: u64) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let converted = self.files_converted.load(Ordering::Relaxed);
        let failed = self.files_failed.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);
        let attempted = converted + failed;

        MetricsSnapshot {
            files_converted: converted,
            files_failed: failed,
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            error_rate: if attempted > 0 { failed as f64 / attempted as f64 } else { 0.0 },
            avg_latency_ms: if attempted > 0 { total_latency / attempted } else { 0 },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub files_converted: u64,
    pub files_failed: u64,
    pub bytes_written: u64,
    pub error_rate: f64,
    pub avg_latency_ms: u64,
}

/// Timer for tracking operation latency
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
