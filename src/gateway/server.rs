//! Gateway server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, info, warn};

use super::router::{AppState, create_router};
use crate::classify::known_categories;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::health::HealthMonitor;
use crate::registry::{BackendDescriptor, ServiceRegistry};
use crate::stats::RequestStats;
use crate::{Error, Result};

/// Civic issue gateway server
pub struct Gateway {
    /// Configuration
    config: Config,
    /// Backend registry
    registry: Arc<ServiceRegistry>,
    /// Health monitor
    monitor: Arc<HealthMonitor>,
    /// Shared handler state
    state: Arc<AppState>,
}

impl Gateway {
    /// Create a new gateway from configuration.
    ///
    /// Registers every enabled backend and wires up the health monitor and
    /// dispatcher. Fails on invalid backend URLs.
    pub fn new(config: Config) -> Result<Self> {
        let registry = Arc::new(ServiceRegistry::new());

        for (category, backend_config) in config.enabled_backends() {
            let descriptor = BackendDescriptor::from_config(category, backend_config)?;
            info!(
                category = %descriptor.category,
                service = %descriptor.service,
                url = %descriptor.url,
                "Registered backend"
            );
            registry.register(descriptor);
        }

        if registry.is_empty() {
            warn!("No backends registered, every issue will be rejected");
        }
        // A classifier category without a backend turns into a routing 503
        for category in known_categories() {
            if registry.get(category).is_none() {
                warn!(category = category, "Classifier category has no backend");
            }
        }

        let monitor = Arc::new(HealthMonitor::new(Arc::clone(&registry), &config.health)?);
        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&monitor),
            &config.dispatch,
        )?;

        let state = Arc::new(AppState {
            registry: Arc::clone(&registry),
            monitor: Arc::clone(&monitor),
            dispatcher,
            stats: RequestStats::new(),
            started_at: Instant::now(),
            request_timeout: config.server.request_timeout,
            max_body_size: config.server.max_body_size,
        });

        Ok(Self {
            config,
            registry,
            monitor,
            state,
        })
    }

    /// Router backed by this gateway's state
    #[must_use]
    pub fn router(&self) -> Router {
        create_router(Arc::clone(&self.state))
    }

    /// Run the gateway until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);

        let app = self.router();
        let listener = TcpListener::bind(addr).await?;

        info!("============================================================");
        info!("CIVIC ISSUE GATEWAY v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %self.config.server.host, port = self.config.server.port, "Listening");
        info!(backends = self.registry.len(), "Backends registered");
        info!("Issue intake:");
        info!(
            "  POST http://{}:{}/api/v1/issues/analyze",
            self.config.server.host, self.config.server.port
        );
        info!("Service catalog:");
        info!(
            "  GET  http://{}:{}/api/v1/services",
            self.config.server.host, self.config.server.port
        );
        info!("Backend routes:");
        for descriptor in self.registry.list() {
            info!("  {} -> {}", descriptor.category, descriptor.url);
        }
        info!("============================================================");

        // Scheduled health refresh; the first tick fires immediately and
        // primes the cache so early requests are not gated on `unknown`
        let monitor = Arc::clone(&self.monitor);
        let health_config = self.config.health.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();

        tokio::spawn(async move {
            if !health_config.enabled {
                return;
            }

            let mut interval = tokio::time::interval(health_config.interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let statuses = monitor.refresh_all().await;
                        debug!(backends = statuses.len(), "Health refresh complete");
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        // After the signal, in-flight requests get `shutdown_timeout` to drain
        let drain_timeout = self.config.server.shutdown_timeout;
        let mut drain_rx = shutdown_tx.subscribe();
        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(shutdown_tx));

        tokio::select! {
            result = server => {
                result.map_err(|e| Error::Internal(e.to_string()))?;
            }
            () = async {
                let _ = drain_rx.recv().await;
                tokio::time::sleep(drain_timeout).await;
            } => {
                warn!(
                    timeout_secs = drain_timeout.as_secs(),
                    "Graceful shutdown timed out, dropping open connections"
                );
            }
        }

        info!("Gateway stopped");
        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
