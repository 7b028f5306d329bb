//! Health monitor integration tests
//!
//! These spin up real HTTP backends on ephemeral local ports and point a
//! monitor at them.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use civic_gateway::config::{BackendConfig, HealthCheckConfig};
use civic_gateway::health::{HealthMonitor, HealthStatus};
use civic_gateway::registry::{BackendDescriptor, ServiceRegistry};
use pretty_assertions::assert_eq;

/// Serve a router on an ephemeral local port
async fn spawn_backend(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn backend_with_health(status: StatusCode) -> Router {
    Router::new().route("/health", get(move || async move { (status, "probe") }))
}

fn slow_backend(delay: Duration) -> Router {
    Router::new().route(
        "/health",
        get(move || async move {
            tokio::time::sleep(delay).await;
            "ok"
        }),
    )
}

fn register(registry: &ServiceRegistry, category: &str, addr: SocketAddr) {
    let descriptor = BackendDescriptor::from_config(
        category,
        &BackendConfig {
            url: format!("http://{addr}"),
            service: format!("{category}-service"),
            ..BackendConfig::default()
        },
    )
    .unwrap();
    registry.register(descriptor);
}

fn monitor_with_timeout(registry: Arc<ServiceRegistry>, timeout: Duration) -> HealthMonitor {
    HealthMonitor::new(
        registry,
        &HealthCheckConfig {
            timeout,
            ..HealthCheckConfig::default()
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_healthy_probe() {
    let addr = spawn_backend(backend_with_health(StatusCode::OK)).await;
    let registry = Arc::new(ServiceRegistry::new());
    register(&registry, "parking", addr);
    let monitor = monitor_with_timeout(registry, Duration::from_secs(2));

    let snapshot = monitor.refresh_one("parking").await.unwrap();
    assert_eq!(snapshot.status, HealthStatus::Healthy);
    assert_eq!(snapshot.response_code, Some(200));
    assert!(snapshot.latency_ms.is_some());
    assert!(snapshot.checked_at.is_some());
    assert_eq!(snapshot.error, None);
    assert!(snapshot.is_healthy());

    // The probe result lands in the cache
    assert_eq!(monitor.cached("parking").status, HealthStatus::Healthy);
}

#[tokio::test]
async fn test_any_2xx_is_healthy() {
    let addr = spawn_backend(backend_with_health(StatusCode::ACCEPTED)).await;
    let registry = Arc::new(ServiceRegistry::new());
    register(&registry, "permits", addr);
    let monitor = monitor_with_timeout(registry, Duration::from_secs(2));

    let snapshot = monitor.refresh_one("permits").await.unwrap();
    assert_eq!(snapshot.status, HealthStatus::Healthy);
    assert_eq!(snapshot.response_code, Some(202));
}

#[tokio::test]
async fn test_non_2xx_is_unhealthy() {
    let addr = spawn_backend(backend_with_health(StatusCode::INTERNAL_SERVER_ERROR)).await;
    let registry = Arc::new(ServiceRegistry::new());
    register(&registry, "noise", addr);
    let monitor = monitor_with_timeout(registry, Duration::from_secs(2));

    let snapshot = monitor.refresh_one("noise").await.unwrap();
    assert_eq!(snapshot.status, HealthStatus::Unhealthy);
    assert_eq!(snapshot.response_code, Some(500));
    assert!(!snapshot.is_healthy());
}

#[tokio::test]
async fn test_connection_refused_is_unreachable() {
    // Bind a port, then free it so nothing listens there
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let registry = Arc::new(ServiceRegistry::new());
    register(&registry, "business", addr);
    let monitor = monitor_with_timeout(registry, Duration::from_secs(2));

    let snapshot = monitor.refresh_one("business").await.unwrap();
    assert_eq!(snapshot.status, HealthStatus::Unreachable);
    assert_eq!(snapshot.response_code, None);
    assert!(snapshot.error.is_some(), "error detail must be captured");
    assert!(snapshot.checked_at.is_some());
}

#[tokio::test]
async fn test_timeout_is_unreachable_with_detail() {
    let addr = spawn_backend(slow_backend(Duration::from_millis(500))).await;
    let registry = Arc::new(ServiceRegistry::new());
    register(&registry, "parking", addr);
    let monitor = monitor_with_timeout(registry, Duration::from_millis(100));

    // The probe times out but never errors out of the monitor
    let snapshot = monitor.refresh_one("parking").await.unwrap();
    assert_eq!(snapshot.status, HealthStatus::Unreachable);
    assert!(snapshot.error.is_some(), "timeout detail must be captured");
    assert_eq!(monitor.cached("parking").status, HealthStatus::Unreachable);
}

#[tokio::test]
async fn test_refresh_one_unknown_category() {
    let registry = Arc::new(ServiceRegistry::new());
    let monitor = monitor_with_timeout(registry, Duration::from_secs(2));

    let err = monitor.refresh_one("bogus").await.unwrap_err();
    assert_eq!(err.kind(), "unknown_category");
}

#[tokio::test]
async fn test_refresh_all_updates_every_backend() {
    let healthy_addr = spawn_backend(backend_with_health(StatusCode::OK)).await;
    let failing_addr = spawn_backend(backend_with_health(StatusCode::SERVICE_UNAVAILABLE)).await;

    let registry = Arc::new(ServiceRegistry::new());
    register(&registry, "parking", healthy_addr);
    register(&registry, "noise", failing_addr);
    let monitor = monitor_with_timeout(registry, Duration::from_secs(2));

    let statuses = monitor.refresh_all().await;
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses["parking"].status, HealthStatus::Healthy);
    assert_eq!(statuses["noise"].status, HealthStatus::Unhealthy);

    let counts = monitor.counts();
    assert_eq!(counts.healthy, 1);
    assert_eq!(counts.unhealthy, 1);
    assert_eq!(counts.unknown, 0);
    assert_eq!(counts.total(), 2);
}

#[tokio::test]
async fn test_probes_run_concurrently() {
    // Four backends, each 500ms slow. Serial probing would take ~2s;
    // concurrent probing finishes in roughly one probe's time.
    let registry = Arc::new(ServiceRegistry::new());
    for category in ["parking", "noise", "permits", "business"] {
        let addr = spawn_backend(slow_backend(Duration::from_millis(500))).await;
        register(&registry, category, addr);
    }
    let monitor = monitor_with_timeout(Arc::clone(&registry), Duration::from_secs(5));

    let started = Instant::now();
    let statuses = monitor.refresh_all().await;
    let elapsed = started.elapsed();

    assert_eq!(statuses.len(), 4);
    assert!(statuses.values().all(|s| s.status == HealthStatus::Healthy));
    assert!(
        elapsed < Duration::from_millis(1500),
        "probes ran serially: {elapsed:?}"
    );
}
