//! Civic Issue Gateway Library
//!
//! Single entry point for civic issue reports: classifies free-text
//! descriptions into a category and routes each report to the matching
//! category backend over HTTP.
//!
//! # Features
//!
//! - **Keyword Classification**: deterministic, ordered keyword matching
//!   with an infrastructure fallback
//! - **Health Gating**: per-backend health cache refreshed on a schedule,
//!   consulted before any dispatch
//! - **Single-Attempt Dispatch**: one POST per issue, no retries, with a
//!   precise error taxonomy for every failure mode
//! - **Unified Responses**: gateway metadata wrapped around the backend's
//!   body, which passes through untouched
//! - **Production Ready**: health endpoint, metrics, graceful shutdown

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classify;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod health;
pub mod issue;
pub mod registry;
pub mod resolution;
pub mod stats;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Service name reported in every response envelope
pub const SERVICE_NAME: &str = "civic-gateway";

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
