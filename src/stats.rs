//! Request statistics for the metrics endpoint
//!
//! Counts analyze traffic and dispatch outcomes. Failure counts are keyed by
//! error kind so `backend_unavailable` and `backend_unreachable` stay
//! distinguishable even though both surface to clients as 503.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;

/// Bounded window of recent dispatch latencies
const LATENCY_WINDOW_CAPACITY: usize = 1000;

/// Request counters for the gateway
pub struct RequestStats {
    /// Analyze requests received (valid or not)
    received: AtomicU64,
    /// Analyze requests successfully routed
    routed: AtomicU64,
    /// Analyze requests that failed, any kind
    failed: AtomicU64,
    /// Routed counts per category
    by_category: DashMap<String, AtomicU64>,
    /// Failure counts per error kind
    failures_by_kind: DashMap<&'static str, AtomicU64>,
    /// Recent dispatch latencies (milliseconds)
    latencies: RwLock<LatencyWindow>,
}

impl RequestStats {
    /// Create a fresh counter set
    #[must_use]
    pub fn new() -> Self {
        Self {
            received: AtomicU64::new(0),
            routed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            by_category: DashMap::new(),
            failures_by_kind: DashMap::new(),
            latencies: RwLock::new(LatencyWindow::new(LATENCY_WINDOW_CAPACITY)),
        }
    }

    /// Record an inbound analyze request
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successfully routed issue
    pub fn record_routed(&self, category: &str, latency: Duration) {
        self.routed.fetch_add(1, Ordering::Relaxed);
        self.by_category
            .entry(category.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
        self.latencies.write().record(latency);
    }

    /// Record a failed analyze request by error kind
    pub fn record_failure(&self, kind: &'static str) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.failures_by_kind
            .entry(kind)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Routed count for one category
    #[must_use]
    pub fn routed_to(&self, category: &str) -> u64 {
        self.by_category
            .get(category)
            .map_or(0, |entry| entry.load(Ordering::Relaxed))
    }

    /// Snapshot of all counters
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let received = self.received.load(Ordering::Relaxed);
        let routed = self.routed.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);

        let by_category: BTreeMap<String, u64> = self
            .by_category
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect();

        let failures_by_kind: BTreeMap<String, u64> = self
            .failures_by_kind
            .iter()
            .map(|entry| ((*entry.key()).to_string(), entry.value().load(Ordering::Relaxed)))
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let success_rate = if received > 0 {
            routed as f64 / received as f64
        } else {
            0.0
        };

        let latencies = self.latencies.read();

        StatsSnapshot {
            received,
            routed,
            failed,
            success_rate,
            by_category,
            failures_by_kind,
            avg_latency_ms: latencies.average(),
            p95_latency_ms: latencies.percentile(0.95),
        }
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of request counters
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    /// Analyze requests received
    pub received: u64,
    /// Successfully routed issues
    pub routed: u64,
    /// Failed analyze requests
    pub failed: u64,
    /// routed / received, 0.0 with no traffic
    pub success_rate: f64,
    /// Routed counts per category
    pub by_category: BTreeMap<String, u64>,
    /// Failure counts per error kind
    pub failures_by_kind: BTreeMap<String, u64>,
    /// Mean dispatch latency over the recent window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_latency_ms: Option<u64>,
    /// 95th percentile dispatch latency over the recent window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p95_latency_ms: Option<u64>,
}

/// FIFO window of latency samples in milliseconds
struct LatencyWindow {
    samples: Vec<u64>,
    capacity: usize,
}

impl LatencyWindow {
    fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn record(&mut self, latency: Duration) {
        if self.samples.len() >= self.capacity {
            self.samples.remove(0);
        }
        self.samples.push(latency.as_millis() as u64);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn average(&self) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: u64 = self.samples.iter().sum();
        Some(sum / self.samples.len() as u64)
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    fn percentile(&self, p: f64) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_unstable();
        let index = ((sorted.len() as f64) * p).floor() as usize;
        Some(sorted[index.min(sorted.len() - 1)])
    }
}
