//! Backend service registry

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use url::Url;

use crate::config::BackendConfig;
use crate::{Error, Result};

/// Static description of one category backend.
///
/// Descriptors are immutable once registered; replacing a backend means
/// registering a new descriptor under the same category.
#[derive(Debug, Clone, Serialize)]
pub struct BackendDescriptor {
    /// Category this backend serves (registry key)
    pub category: String,
    /// Base address, scheme + authority, no trailing slash
    pub url: String,
    /// Declared service name, e.g. "parking-service"
    pub service: String,
    /// Declared service version
    pub version: String,
    /// Health probe path
    pub health_path: String,
    /// Analysis endpoint path
    pub analyze_path: String,
}

impl BackendDescriptor {
    /// Build a descriptor from its config entry, validating the base URL.
    pub fn from_config(category: &str, config: &BackendConfig) -> Result<Self> {
        let parsed = Url::parse(&config.url)
            .map_err(|e| Error::Config(format!("Invalid URL for backend '{category}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Backend '{category}' URL must be http or https, got '{}'",
                parsed.scheme()
            )));
        }

        Ok(Self {
            category: category.to_string(),
            url: config.url.trim_end_matches('/').to_string(),
            service: config.service.clone(),
            version: config.version.clone(),
            health_path: normalize_path(&config.health_path),
            analyze_path: normalize_path(&config.analyze_path),
        })
    }

    /// Full URL of the health probe endpoint
    #[must_use]
    pub fn health_url(&self) -> String {
        format!("{}{}", self.url, self.health_path)
    }

    /// Full URL of the analysis endpoint
    #[must_use]
    pub fn analyze_url(&self) -> String {
        format!("{}{}", self.url, self.analyze_path)
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Registry of category backends.
///
/// Reads vastly outnumber writes: every dispatch looks a descriptor up, while
/// registration normally happens once at startup. DashMap keeps lookups
/// lock-free and gives writers per-entry exclusivity.
pub struct ServiceRegistry {
    /// Descriptors by category
    backends: DashMap<String, Arc<BackendDescriptor>>,
}

impl ServiceRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            backends: DashMap::new(),
        }
    }

    /// Register a backend. Re-registering a category replaces the previous
    /// descriptor (last write wins).
    pub fn register(&self, descriptor: BackendDescriptor) {
        self.backends
            .insert(descriptor.category.clone(), Arc::new(descriptor));
    }

    /// Remove a backend, returning its descriptor if it was registered
    pub fn remove(&self, category: &str) -> Option<Arc<BackendDescriptor>> {
        self.backends.remove(category).map(|(_, d)| d)
    }

    /// Get the descriptor for a category
    #[must_use]
    pub fn get(&self, category: &str) -> Option<Arc<BackendDescriptor>> {
        self.backends.get(category).map(|d| Arc::clone(&*d))
    }

    /// All descriptors, sorted by category for stable listings
    #[must_use]
    pub fn list(&self) -> Vec<Arc<BackendDescriptor>> {
        let mut all: Vec<Arc<BackendDescriptor>> =
            self.backends.iter().map(|d| Arc::clone(&*d)).collect();
        all.sort_by(|a, b| a.category.cmp(&b.category));
        all
    }

    /// All registered categories, sorted
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> =
            self.backends.iter().map(|d| d.key().clone()).collect();
        categories.sort();
        categories
    }

    /// Number of registered backends
    #[must_use]
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
