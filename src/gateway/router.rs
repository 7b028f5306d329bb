//! HTTP router and handlers

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::CorsLayer,
    timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::{debug, error, info};

use crate::SERVICE_NAME;
use crate::classify::{Classification, classify};
use crate::dispatch::{Dispatcher, RoutingOutcome};
use crate::health::{HealthMonitor, HealthSnapshot};
use crate::issue::IssueRequest;
use crate::registry::ServiceRegistry;
use crate::resolution::{ResolutionPath, resolution_path};
use crate::stats::RequestStats;
use crate::{Error, Result};

/// Shared application state
pub struct AppState {
    /// Backend registry
    pub registry: Arc<ServiceRegistry>,
    /// Health monitor (cached snapshots + forced probes)
    pub monitor: Arc<HealthMonitor>,
    /// Issue dispatcher
    pub dispatcher: Dispatcher,
    /// Request counters
    pub stats: RequestStats,
    /// Process start, for uptime reporting
    pub started_at: Instant,
    /// Inbound request timeout
    pub request_timeout: Duration,
    /// Maximum analyze body size (bytes)
    pub max_body_size: usize,
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    // Deprecated constructor kept for its 408-on-expiry default
    #[allow(deprecated)]
    let timeout_layer = TimeoutLayer::new(state.request_timeout);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/v1/issues/analyze", post(analyze_handler))
        .route("/api/v1/services", get(services_handler))
        .route(
            "/api/v1/services/{category}/health",
            get(service_health_handler),
        )
        .layer(CatchPanicLayer::new())
        .layer(CompressionLayer::new())
        .layer(timeout_layer)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Gateway metadata attached to every successful analyze response
#[derive(Debug, Clone, Serialize)]
pub struct GatewayInfo {
    /// Gateway service name
    pub service: &'static str,
    /// Gateway version
    pub version: &'static str,
    /// Category the issue was classified into
    pub classification: &'static str,
    /// Keyword that decided the classification, absent for the fallback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_keyword: Option<&'static str>,
    /// Name of the backend that handled the issue
    pub routed_to: String,
    /// Advisory resolution path for the category/priority pair
    pub resolution_path: ResolutionPath,
    /// Backend round-trip time in milliseconds
    pub routing_time_ms: f64,
}

/// Successful analyze response: gateway metadata plus the backend's body,
/// nested untouched
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    /// Gateway metadata
    pub gateway_info: GatewayInfo,
    /// Backend response body, opaque to the gateway
    pub service_response: Value,
    /// End-to-end gateway processing time in milliseconds
    pub total_processing_time_ms: f64,
    /// Response timestamp, RFC 3339 UTC
    pub timestamp: String,
}

/// Error body returned on every failure path
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Gateway service name
    pub service: &'static str,
    /// Machine-readable error kind
    pub error: &'static str,
    /// Human-readable message
    pub message: String,
    /// Response timestamp, RFC 3339 UTC
    pub timestamp: String,
}

/// One backend in the services listing
#[derive(Debug, Serialize)]
pub struct ServiceEntry {
    /// Declared service name
    pub service: String,
    /// Declared service version
    pub version: String,
    /// Base address
    pub url: String,
    /// Relative endpoint paths
    pub endpoints: EndpointPaths,
    /// Latest cached health snapshot (no probe is forced)
    pub health: HealthSnapshot,
}

/// Relative endpoint paths of a backend
#[derive(Debug, Serialize)]
pub struct EndpointPaths {
    /// Health probe path
    pub health: String,
    /// Analysis endpoint path
    pub analyze: String,
}

/// Services listing response
#[derive(Debug, Serialize)]
pub struct ServicesResponse {
    /// Number of registered backends
    pub total_services: usize,
    /// Backends by category, sorted
    pub services: BTreeMap<String, ServiceEntry>,
    /// Response timestamp, RFC 3339 UTC
    pub timestamp: String,
}

/// Forced-probe response for one backend
#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    /// Probed category
    pub category: String,
    /// Declared service name
    pub service: String,
    /// Base address
    pub url: String,
    /// Fresh snapshot from the forced probe
    pub health: HealthSnapshot,
    /// Response timestamp, RFC 3339 UTC
    pub timestamp: String,
}

/// What the analyze pipeline produces before response composition
struct AnalyzedIssue {
    classification: Classification,
    path: ResolutionPath,
    outcome: RoutingOutcome,
}

/// POST /api/v1/issues/analyze - validate, classify, gate, dispatch, compose
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    http_request: axum::http::Request<axum::body::Body>,
) -> Response {
    let started = Instant::now();
    state.stats.record_received();

    match analyze_issue(&state, http_request).await {
        Ok(AnalyzedIssue {
            classification,
            path,
            outcome,
        }) => {
            state
                .stats
                .record_routed(classification.category, outcome.latency);
            info!(
                category = classification.category,
                routed_to = %outcome.backend.service,
                latency_ms = round_ms(outcome.latency),
                "Issue routed"
            );

            let response = AnalyzeResponse {
                gateway_info: GatewayInfo {
                    service: SERVICE_NAME,
                    version: env!("CARGO_PKG_VERSION"),
                    classification: classification.category,
                    matched_keyword: classification.matched_keyword,
                    routed_to: outcome.backend.service.clone(),
                    resolution_path: path,
                    routing_time_ms: round_ms(outcome.latency),
                },
                service_response: outcome.body,
                total_processing_time_ms: round_ms(started.elapsed()),
                timestamp: now_rfc3339(),
            };

            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            state.stats.record_failure(err.kind());
            error_response(&err)
        }
    }
}

/// The analyze pipeline up to a successful dispatch
async fn analyze_issue(
    state: &AppState,
    http_request: axum::http::Request<axum::body::Body>,
) -> Result<AnalyzedIssue> {
    let body_bytes = axum::body::to_bytes(http_request.into_body(), state.max_body_size)
        .await
        .map_err(|e| Error::Validation(format!("Failed to read body: {e}")))?;

    let request: IssueRequest = serde_json::from_slice(&body_bytes)
        .map_err(|e| Error::Validation(format!("Invalid JSON body: {e}")))?;

    request.validate()?;

    let classification = classify(&request.description);
    let path = resolution_path(classification.category, request.priority_or_default());
    debug!(
        category = classification.category,
        keyword = ?classification.matched_keyword,
        path = path.as_str(),
        "Issue classified"
    );

    let outcome = state
        .dispatcher
        .dispatch(classification.category, &request)
        .await?;

    Ok(AnalyzedIssue {
        classification,
        path,
        outcome,
    })
}

/// GET /api/v1/services - registry plus cached health, no probing
async fn services_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut services = BTreeMap::new();
    for descriptor in state.registry.list() {
        services.insert(
            descriptor.category.clone(),
            ServiceEntry {
                service: descriptor.service.clone(),
                version: descriptor.version.clone(),
                url: descriptor.url.clone(),
                endpoints: EndpointPaths {
                    health: descriptor.health_path.clone(),
                    analyze: descriptor.analyze_path.clone(),
                },
                health: state.monitor.cached(&descriptor.category),
            },
        );
    }

    Json(ServicesResponse {
        total_services: services.len(),
        services,
        timestamp: now_rfc3339(),
    })
}

/// GET /api/v1/services/{category}/health - force one probe
async fn service_health_handler(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> Response {
    let Some(descriptor) = state.registry.get(&category) else {
        let body = ErrorBody {
            service: SERVICE_NAME,
            error: "unknown_category",
            message: format!("Unknown service category '{category}'"),
            timestamp: now_rfc3339(),
        };
        return (StatusCode::NOT_FOUND, Json(body)).into_response();
    };

    match state.monitor.refresh_one(&category).await {
        Ok(snapshot) => Json(ProbeResponse {
            category: descriptor.category.clone(),
            service: descriptor.service.clone(),
            url: descriptor.url.clone(),
            health: snapshot,
            timestamp: now_rfc3339(),
        })
        .into_response(),
        Err(err) => error_response(&err),
    }
}

/// GET /health - gateway liveness.
///
/// Always 200 while the process serves; downstream state is reported as
/// counts, never folded into the gateway's own status.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let counts = state.monitor.counts();

    Json(json!({
        "service": SERVICE_NAME,
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": round2(state.started_at.elapsed().as_secs_f64()),
        "backends": {
            "total": counts.total(),
            "healthy": counts.healthy,
            "unhealthy": counts.unhealthy,
            "unreachable": counts.unreachable,
            "unknown": counts.unknown,
        },
        "timestamp": now_rfc3339(),
    }))
}

/// GET /metrics - uptime, backend counts and request counters
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let counts = state.monitor.counts();
    let total = counts.total();
    #[allow(clippy::cast_precision_loss)]
    let availability = if total > 0 {
        round2(counts.healthy as f64 / total as f64 * 100.0)
    } else {
        0.0
    };
    let uptime = state.started_at.elapsed();

    Json(json!({
        "gateway": {
            "service": SERVICE_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_seconds": round2(uptime.as_secs_f64()),
            "uptime_formatted": format_uptime(uptime),
        },
        "services": {
            "total_registered": total,
            "healthy": counts.healthy,
            "unhealthy": counts.unhealthy,
            "unreachable": counts.unreachable,
            "unknown": counts.unknown,
            "availability_percentage": availability,
        },
        "requests": state.stats.snapshot(),
        "timestamp": now_rfc3339(),
    }))
}

/// GET / - service info card
async fn root_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "registered_services": state.registry.len(),
        "uptime_seconds": round2(state.started_at.elapsed().as_secs_f64()),
        "endpoints": {
            "analyze": "/api/v1/issues/analyze",
            "services": "/api/v1/services",
            "service_health": "/api/v1/services/{category}/health",
            "health": "/health",
            "metrics": "/metrics",
        },
    }))
}

/// Render an error body: service identity, machine-readable kind,
/// human-readable message, timestamp.
fn error_response(err: &Error) -> Response {
    let message = if err.kind() == "internal_error" {
        // Full detail stays in the logs
        error!(error = %err, "Internal error");
        "Internal server error".to_string()
    } else {
        err.to_string()
    };

    let body = ErrorBody {
        service: SERVICE_NAME,
        error: err.kind(),
        message,
        timestamp: now_rfc3339(),
    };

    (err.http_status(), Json(body)).into_response()
}

/// RFC 3339 UTC timestamp with millisecond precision and a trailing Z
fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Duration as milliseconds, rounded to two decimals
fn round_ms(duration: Duration) -> f64 {
    round2(duration.as_secs_f64() * 1000.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// "3h 7m" style uptime
fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_ms() {
        assert!((round_ms(Duration::from_micros(12_345)) - 12.35).abs() < f64::EPSILON);
        assert!((round_ms(Duration::ZERO) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0h 0m");
        assert_eq!(format_uptime(Duration::from_secs(65)), "0h 1m");
        assert_eq!(format_uptime(Duration::from_secs(3 * 3600 + 7 * 60 + 12)), "3h 7m");
    }

    #[test]
    fn test_timestamp_is_utc_with_z() {
        let ts = now_rfc3339();
        assert!(ts.ends_with('Z'), "timestamp {ts} should end with Z");
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn test_error_body_shape() {
        let err = Error::Validation("Description is required".to_string());
        let body = ErrorBody {
            service: SERVICE_NAME,
            error: err.kind(),
            message: err.to_string(),
            timestamp: now_rfc3339(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["service"], "civic-gateway");
        assert_eq!(json["error"], "validation_error");
        assert!(json["message"].as_str().unwrap().contains("required"));
    }

    #[test]
    fn test_internal_errors_are_not_echoed() {
        let err = Error::Internal("sensitive backend detail".to_string());
        let response = error_response(&err);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
