//! Error types for the civic gateway

use std::io;

use axum::http::StatusCode;
use thiserror::Error;

use crate::health::HealthStatus;

/// Result type alias for the civic gateway
pub type Result<T> = std::result::Result<T, Error>;

/// Civic gateway errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request failed validation
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Classified category has no registered backend
    #[error("No backend registered for category '{0}'")]
    UnknownCategory(String),

    /// Cached health says the backend cannot take traffic
    #[error("Backend for '{category}' is {status}")]
    BackendUnavailable {
        /// Issue category
        category: String,
        /// Cached health status that blocked the dispatch
        status: HealthStatus,
    },

    /// Network-level failure talking to the backend
    #[error("Backend for '{category}' unreachable: {detail}")]
    BackendUnreachable {
        /// Issue category
        category: String,
        /// Short failure description (no upstream bodies)
        detail: String,
    },

    /// Backend answered with a non-success status
    #[error("Backend for '{category}' returned HTTP {status}")]
    BackendError {
        /// Issue category
        category: String,
        /// Upstream HTTP status code
        status: u16,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Machine-readable error kind, stable across releases
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::UnknownCategory(_) => "unknown_category",
            Self::BackendUnavailable { .. } => "backend_unavailable",
            Self::BackendUnreachable { .. } => "backend_unreachable",
            Self::BackendError { .. } => "backend_error",
            Self::Config(_) | Self::Io(_) | Self::Json(_) | Self::Internal(_) => "internal_error",
        }
    }

    /// HTTP status the error maps to on the gateway surface
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            // Unknown category is an operator misconfiguration, not a client error
            Self::UnknownCategory(_)
            | Self::BackendUnavailable { .. }
            | Self::BackendUnreachable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::BackendError { .. } => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::Io(_) | Self::Json(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
