//! Live configuration store.
//!
//! # Responsibilities
//! - Hold the current `ConfigSnapshot` behind an atomically swapped pointer
//! - Build replacement snapshots off to the side and publish them in one swap
//! - Serialize writers (initial load and reloads) against each other
//!
//! # Design Decisions
//! - Readers never lock: `ArcSwapOption::load_full` hands out an `Arc`
//!   that stays valid for the whole request, even across a reload
//! - A failed load never touches the published snapshot
//! - Initialization happens once; a failed first load may be retried

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use arc_swap::ArcSwapOption;
use serde::Serialize;

use crate::config::loader::ConfigError;
use crate::config::snapshot::{normalize_country, ConfigSnapshot, ResolvedCountryConfig};
use crate::config::source::ConfigSource;
use crate::error::GatewayError;
use crate::observability::metrics;

/// Outcome of a successful reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadSummary {
    pub environment: String,
    pub countries: Vec<String>,
}

/// Owner of the live configuration snapshot.
pub struct ConfigStore {
    source: ConfigSource,
    environment: String,
    current: ArcSwapOption<ConfigSnapshot>,
    /// Serializes writers. Readers never take it.
    writer: Mutex<()>,
    initialized: OnceLock<()>,
}

impl ConfigStore {
    /// Create an empty store. Nothing is read until `initialize` or `reload`.
    pub fn new(source: ConfigSource, environment: impl Into<String>) -> Self {
        Self {
            source,
            environment: environment.into(),
            current: ArcSwapOption::empty(),
            writer: Mutex::new(()),
            initialized: OnceLock::new(),
        }
    }

    /// Load the first snapshot.
    ///
    /// Runs the load at most once across concurrent callers. If the load
    /// fails the store stays uninitialized and a later call tries again.
    pub fn initialize(&self) -> Result<(), ConfigError> {
        if self.initialized.get().is_some() {
            return Ok(());
        }

        let _guard = self.lock_writer();
        if self.initialized.get().is_some() {
            return Ok(());
        }

        let snapshot = self.source.load(&self.environment).inspect_err(|e| {
            metrics::record_reload(false);
            tracing::error!(
                dir = %self.source.dir().display(),
                environment = %self.environment,
                error = %e,
                "Initial configuration load failed"
            );
        })?;

        tracing::info!(
            environment = %self.environment,
            countries = ?snapshot.country_codes(),
            "Configuration loaded"
        );
        self.publish(snapshot);
        Ok(())
    }

    /// Re-read the configuration directory and swap in the result.
    ///
    /// On failure the previous snapshot stays live and the error is returned.
    pub fn reload(&self) -> Result<ReloadSummary, ConfigError> {
        let _guard = self.lock_writer();

        let snapshot = match self.source.load(&self.environment) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                metrics::record_reload(false);
                tracing::error!(
                    dir = %self.source.dir().display(),
                    environment = %self.environment,
                    error = %e,
                    "Configuration reload failed, keeping current configuration"
                );
                return Err(e);
            }
        };

        let summary = ReloadSummary {
            environment: self.environment.clone(),
            countries: snapshot.country_codes(),
        };
        self.publish(snapshot);

        tracing::info!(
            environment = %summary.environment,
            countries = ?summary.countries,
            "Configuration reloaded"
        );
        Ok(summary)
    }

    /// The live snapshot. Hold on to it for the duration of one request.
    pub fn snapshot(&self) -> Result<Arc<ConfigSnapshot>, GatewayError> {
        self.current
            .load_full()
            .ok_or(GatewayError::ConfigNotInitialized)
    }

    /// Resolved configuration of one country.
    pub fn country_config(&self, country: &str) -> Result<Arc<ResolvedCountryConfig>, GatewayError> {
        self.snapshot()?
            .country(country)
            .cloned()
            .ok_or_else(|| GatewayError::CountryNotSupported(normalize_country(country)))
    }

    /// Sorted country codes of the live snapshot; empty before the first load.
    pub fn list_countries(&self) -> Vec<String> {
        self.snapshot()
            .map(|snapshot| snapshot.country_codes())
            .unwrap_or_default()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.load().is_some()
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    fn publish(&self, snapshot: ConfigSnapshot) {
        metrics::record_reload(true);
        metrics::set_countries_available(snapshot.len());
        self.current.store(Some(Arc::new(snapshot)));
        let _ = self.initialized.set(());
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        // The guarded value is `()`, so a poisoned lock carries no broken state.
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("dir", &self.source.dir())
            .field("environment", &self.environment)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
