//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the application context from validated settings
//! - Load the first configuration snapshot
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - No global state; the context is cloned into every handler
//! - Subsystems initialize in order, listeners start last (in `main`)

use std::sync::Arc;

use axum::http::header::InvalidHeaderName;

use crate::config::loader::ConfigError;
use crate::config::settings::GatewaySettings;
use crate::config::source::ConfigSource;
use crate::config::store::ConfigStore;
use crate::http::limit::RequestLimiter;
use crate::http::tenant::TenantStrategy;
use crate::proxy::forward::ForwardingProxy;
use crate::routing::resolver::Resolver;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid tenant header: {0}")]
    TenantHeader(#[from] InvalidHeaderName),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Everything a request handler needs. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub settings: Arc<GatewaySettings>,
    pub store: Arc<ConfigStore>,
    pub resolver: Resolver,
    pub proxy: ForwardingProxy,
    pub tenant: TenantStrategy,
    pub limiter: RequestLimiter,
}

impl AppContext {
    /// Wire the subsystems together without reading the configuration
    /// directory.
    pub fn build(settings: GatewaySettings) -> Result<Self, StartupError> {
        let environment = settings.active_environment();
        let store = Arc::new(ConfigStore::new(
            ConfigSource::new(settings.config_dir.clone()),
            environment,
        ));
        let resolver = Resolver::new(store.clone());
        let proxy = ForwardingProxy::new(&settings.upstream)?;
        let tenant = TenantStrategy::from_settings(&settings.tenant)?;
        let limiter = RequestLimiter::new(settings.listener.max_concurrent_requests);

        Ok(Self {
            settings: Arc::new(settings),
            store,
            resolver,
            proxy,
            tenant,
            limiter,
        })
    }

    /// Build the context and load the first snapshot.
    pub fn initialize(settings: GatewaySettings) -> Result<Self, StartupError> {
        let context = Self::build(settings)?;

        tracing::info!(
            config_dir = %context.settings.config_dir.display(),
            environment = %context.store.environment(),
            routing_mode = ?context.settings.routing_mode,
            tenant = ?context.tenant,
            "Loading configuration"
        );
        context.store.initialize()?;

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::testing::TempConfigDir;

    #[test]
    fn test_initialize_loads_configuration() {
        let dir = TempConfigDir::sample();
        let settings = GatewaySettings {
            config_dir: dir.path().to_path_buf(),
            environment: Some("stage".to_string()),
            ..GatewaySettings::default()
        };

        let context = AppContext::initialize(settings).unwrap();
        assert!(context.store.is_loaded());
        assert_eq!(context.store.environment(), "stage");
        assert_eq!(context.store.list_countries(), vec!["US"]);
    }

    #[test]
    fn test_missing_directory_fails_fast() {
        let settings = GatewaySettings {
            config_dir: "/definitely/not/here".into(),
            ..GatewaySettings::default()
        };

        let err = AppContext::initialize(settings).unwrap_err();
        assert!(matches!(err, StartupError::Config(ConfigError::Io { .. })));
    }
}
