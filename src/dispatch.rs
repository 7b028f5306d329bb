//! Issue dispatch to category backends
//!
//! One attempt, one timeout, no retries: a backend that cannot answer inside
//! the dispatch timeout is reported as unreachable and the caller decides
//! what to do next. Availability gating happens against the cached health
//! snapshot before any connection is opened.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::DispatchConfig;
use crate::health::HealthMonitor;
use crate::issue::IssueRequest;
use crate::registry::{BackendDescriptor, ServiceRegistry};
use crate::{Error, Result};

/// Successful dispatch of one issue to one backend
#[derive(Debug)]
pub struct RoutingOutcome {
    /// Backend that handled the issue
    pub backend: Arc<BackendDescriptor>,
    /// Backend response body, opaque to the gateway
    pub body: Value,
    /// Round-trip time of the backend call
    pub latency: Duration,
}

/// Routes validated issues to their category backend
pub struct Dispatcher {
    /// Descriptor lookup
    registry: Arc<ServiceRegistry>,
    /// Cached health, read-only on the hot path
    monitor: Arc<HealthMonitor>,
    /// Dispatch client, bounded by the dispatch timeout
    client: Client,
}

impl Dispatcher {
    /// Create a dispatcher.
    pub fn new(
        registry: Arc<ServiceRegistry>,
        monitor: Arc<HealthMonitor>,
        config: &DispatchConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build dispatch client: {e}")))?;

        Ok(Self {
            registry,
            monitor,
            client,
        })
    }

    /// Send a validated issue to the backend for `category`.
    ///
    /// The cached health snapshot is consulted first; anything but `healthy`
    /// fails the dispatch before a single byte goes over the wire. A backend
    /// answering non-2xx is reported as `BackendError` with the upstream
    /// status; its body is never forwarded.
    pub async fn dispatch(&self, category: &str, request: &IssueRequest) -> Result<RoutingOutcome> {
        let backend = self
            .registry
            .get(category)
            .ok_or_else(|| Error::UnknownCategory(category.to_string()))?;

        let cached = self.monitor.cached(category);
        if !cached.is_healthy() {
            warn!(
                category = %category,
                status = %cached.status,
                "Dispatch blocked by cached health"
            );
            return Err(Error::BackendUnavailable {
                category: category.to_string(),
                status: cached.status,
            });
        }

        let url = backend.analyze_url();
        debug!(category = %category, url = %url, "Dispatching issue");

        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(category = %category, error = %e, "Backend unreachable");
                Error::BackendUnreachable {
                    category: category.to_string(),
                    detail: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(category = %category, status = status.as_u16(), "Backend returned error status");
            return Err(Error::BackendError {
                category: category.to_string(),
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await.map_err(|e| {
            if e.is_decode() {
                Error::Internal(format!("Backend for '{category}' returned malformed JSON: {e}"))
            } else {
                Error::BackendUnreachable {
                    category: category.to_string(),
                    detail: e.to_string(),
                }
            }
        })?;

        let latency = started.elapsed();
        debug!(
            category = %category,
            latency_ms = duration_millis(latency),
            "Backend answered"
        );

        Ok(RoutingOutcome {
            backend,
            body,
            latency,
        })
    }
}

#[allow(clippy::cast_possible_truncation)]
fn duration_millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}
