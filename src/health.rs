//! Backend health probing and the cached health snapshot
//!
//! The monitor owns a dedicated probe client and a per-category snapshot
//! cache. Probes never fail the caller: network errors degrade the snapshot
//! to `unreachable` and the details land in the snapshot itself. Dispatch
//! reads only the cache, so a slow backend costs a request nothing until the
//! probe loop has actually observed it as healthy.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::HealthCheckConfig;
use crate::registry::{BackendDescriptor, ServiceRegistry};
use crate::{Error, Result};

/// Probe outcome for one backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Probe answered with a 2xx status
    Healthy,
    /// Probe answered with a non-2xx status
    Unhealthy,
    /// Probe timed out or failed at the network level
    Unreachable,
    /// Never probed
    Unknown,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
            Self::Unreachable => "unreachable",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Last observed health of one backend.
///
/// Snapshots are replaced whole; readers never see a half-updated entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Probe outcome
    pub status: HealthStatus,
    /// HTTP status of the probe response, if one arrived
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_code: Option<u16>,
    /// Probe round-trip time in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    /// When the probe ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<DateTime<Utc>>,
    /// Short failure description for unreachable backends
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthSnapshot {
    /// Snapshot of a backend that has never been probed
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            status: HealthStatus::Unknown,
            response_code: None,
            latency_ms: None,
            checked_at: None,
            error: None,
        }
    }

    /// Whether the backend can take traffic
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Per-status backend counts, for the health and metrics endpoints
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusCounts {
    /// Backends whose last probe was a 2xx
    pub healthy: usize,
    /// Backends whose last probe was a non-2xx
    pub unhealthy: usize,
    /// Backends whose last probe failed at the network level
    pub unreachable: usize,
    /// Backends never probed
    pub unknown: usize,
}

impl StatusCounts {
    /// Total number of registered backends
    #[must_use]
    pub fn total(&self) -> usize {
        self.healthy + self.unhealthy + self.unreachable + self.unknown
    }
}

/// Probes registered backends and caches the latest snapshot per category
pub struct HealthMonitor {
    /// Registry the monitor watches
    registry: Arc<ServiceRegistry>,
    /// Probe client, bounded by the probe timeout
    client: Client,
    /// Latest snapshot per category
    cache: DashMap<String, HealthSnapshot>,
}

impl HealthMonitor {
    /// Create a monitor over a registry.
    pub fn new(registry: Arc<ServiceRegistry>, config: &HealthCheckConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build probe client: {e}")))?;

        Ok(Self {
            registry,
            client,
            cache: DashMap::new(),
        })
    }

    /// Probe every registered backend concurrently.
    ///
    /// Each backend's cache entry is written the moment its own probe
    /// resolves, so one slow backend never delays fresh data for the rest.
    /// Wall time is bounded by the slowest single probe, not the sum.
    pub async fn refresh_all(&self) -> HashMap<String, HealthSnapshot> {
        let probes = self.registry.list().into_iter().map(|descriptor| async move {
            let snapshot = self.probe(&descriptor).await;
            self.cache
                .insert(descriptor.category.clone(), snapshot.clone());
            (descriptor.category.clone(), snapshot)
        });

        join_all(probes).await.into_iter().collect()
    }

    /// Probe a single backend and update its cache entry.
    ///
    /// Errors only when the category is not registered; probe failures are
    /// reported inside the returned snapshot.
    pub async fn refresh_one(&self, category: &str) -> Result<HealthSnapshot> {
        let descriptor = self
            .registry
            .get(category)
            .ok_or_else(|| Error::UnknownCategory(category.to_string()))?;

        let snapshot = self.probe(&descriptor).await;
        self.cache.insert(category.to_string(), snapshot.clone());
        Ok(snapshot)
    }

    /// Last cached snapshot for a category, `unknown` if never probed.
    /// Never performs network I/O.
    #[must_use]
    pub fn cached(&self, category: &str) -> HealthSnapshot {
        self.cache
            .get(category)
            .map_or_else(HealthSnapshot::unknown, |s| s.clone())
    }

    /// Cached snapshots for every registered backend, `unknown` where a
    /// backend has not been probed yet
    #[must_use]
    pub fn cached_all(&self) -> HashMap<String, HealthSnapshot> {
        self.registry
            .list()
            .into_iter()
            .map(|d| (d.category.clone(), self.cached(&d.category)))
            .collect()
    }

    /// Per-status counts across all registered backends
    #[must_use]
    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts {
            healthy: 0,
            unhealthy: 0,
            unreachable: 0,
            unknown: 0,
        };

        for descriptor in self.registry.list() {
            match self.cached(&descriptor.category).status {
                HealthStatus::Healthy => counts.healthy += 1,
                HealthStatus::Unhealthy => counts.unhealthy += 1,
                HealthStatus::Unreachable => counts.unreachable += 1,
                HealthStatus::Unknown => counts.unknown += 1,
            }
        }

        counts
    }

    /// Run one probe without touching the cache
    async fn probe(&self, descriptor: &BackendDescriptor) -> HealthSnapshot {
        let url = descriptor.health_url();
        let started = Instant::now();
        let result = self.client.get(&url).send().await;
        let latency = started.elapsed();

        match result {
            Ok(response) => {
                let code = response.status().as_u16();
                let status = if response.status().is_success() {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Unhealthy
                };

                debug!(
                    category = %descriptor.category,
                    status = %status,
                    code = code,
                    latency_ms = duration_millis(latency),
                    "Health probe complete"
                );

                HealthSnapshot {
                    status,
                    response_code: Some(code),
                    latency_ms: Some(duration_millis(latency)),
                    checked_at: Some(Utc::now()),
                    error: None,
                }
            }
            Err(e) => {
                warn!(category = %descriptor.category, error = %e, "Health probe failed");

                HealthSnapshot {
                    status: HealthStatus::Unreachable,
                    response_code: None,
                    latency_ms: Some(duration_millis(latency)),
                    checked_at: Some(Utc::now()),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn duration_millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}
