//! Immutable, validated configuration state.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

use url::Url;

use crate::config::schema::EndpointDefinition;
use crate::routing::matcher::{RouteError, RouteTable};

/// Canonical form of a country code.
pub fn normalize_country(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Routing information for one enabled country.
#[derive(Debug)]
pub struct ResolvedCountryConfig {
    pub country: String,
    /// Name of the bound service.
    pub service: String,
    /// Base URL after environment overrides.
    pub base_url: Url,
    pub endpoints: BTreeMap<String, EndpointDefinition>,
    routes: RouteTable,
}

impl ResolvedCountryConfig {
    pub fn new(
        country: impl Into<String>,
        service: impl Into<String>,
        base_url: Url,
        endpoints: BTreeMap<String, EndpointDefinition>,
    ) -> Result<Self, RouteError> {
        let routes = RouteTable::new(&endpoints)?;
        Ok(Self {
            country: country.into(),
            service: service.into(),
            base_url,
            endpoints,
            routes,
        })
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }
}

/// One complete configuration state. Never mutated once built.
#[derive(Debug)]
pub struct ConfigSnapshot {
    environment: String,
    countries: BTreeMap<String, Arc<ResolvedCountryConfig>>,
    loaded_at: SystemTime,
}

impl ConfigSnapshot {
    pub fn new(environment: impl Into<String>, countries: Vec<ResolvedCountryConfig>) -> Self {
        Self {
            environment: environment.into(),
            countries: countries
                .into_iter()
                .map(|c| (c.country.clone(), Arc::new(c)))
                .collect(),
            loaded_at: SystemTime::now(),
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn country(&self, code: &str) -> Option<&Arc<ResolvedCountryConfig>> {
        self.countries.get(&normalize_country(code))
    }

    /// Country codes in sorted order.
    pub fn country_codes(&self) -> Vec<String> {
        self.countries.keys().cloned().collect()
    }

    pub fn countries(&self) -> impl Iterator<Item = &Arc<ResolvedCountryConfig>> {
        self.countries.values()
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    pub fn loaded_at(&self) -> SystemTime {
        self.loaded_at
    }

    /// Every distinct endpoint URI across all countries, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .countries
            .values()
            .flat_map(|c| c.endpoints.values().map(|e| e.uri.clone()))
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }
}
