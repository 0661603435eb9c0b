//! Application state shared across handlers.

use std::sync::Arc;

use thrivo_core::catalog::Catalog;

use crate::config::StorefrontConfig;
use crate::identity::{self, IdentityProvider};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: Catalog,
    identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Create state with the identity provider selected in `config`.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let identity = identity::from_config(&config.identity);
        Self::with_identity(config, identity)
    }

    /// Create state around an existing identity provider.
    #[must_use]
    pub fn with_identity(config: StorefrontConfig, identity: Arc<dyn IdentityProvider>) -> Self {
        tracing::info!(provider = identity.name(), "identity provider ready");
        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog: Catalog::builtin(),
                identity,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// The identity provider.
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }
}
