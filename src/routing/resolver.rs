//! Resolution of (country, path, method) to an upstream target.
//!
//! # Responsibilities
//! - Look the country up in the live snapshot
//! - Match the path (or operation name) against the country's routes
//! - Build the fully-qualified upstream URL: base URL + rendered endpoint
//!   URI + original query string
//!
//! # Design Decisions
//! - One snapshot is loaded per resolution, so a concurrent reload can
//!   never mix the old country with the new routes
//! - The base URL path, if any, is kept as a prefix

use std::sync::Arc;

use axum::http::Method;
use url::Url;

use crate::config::snapshot::{normalize_country, ConfigSnapshot};
use crate::config::store::ConfigStore;
use crate::error::GatewayError;

/// A fully resolved upstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTarget {
    pub country: String,
    pub service: String,
    pub operation: String,
    pub method: Method,
    pub url: Url,
}

/// Resolves requests against the live configuration.
#[derive(Debug, Clone)]
pub struct Resolver {
    store: Arc<ConfigStore>,
}

impl Resolver {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Resolve a request path for `country`.
    pub fn resolve(
        &self,
        country: &str,
        path: &str,
        query: Option<&str>,
        method: &Method,
    ) -> Result<EndpointTarget, GatewayError> {
        let snapshot = self.store.snapshot()?;
        resolve_in(&snapshot, country, path, query, method)
    }

    /// Resolve a named operation for `country`.
    pub fn resolve_operation(
        &self,
        country: &str,
        operation: &str,
    ) -> Result<EndpointTarget, GatewayError> {
        let snapshot = self.store.snapshot()?;
        resolve_operation_in(&snapshot, country, operation)
    }
}

/// Resolve a request path against one snapshot.
pub fn resolve_in(
    snapshot: &ConfigSnapshot,
    country: &str,
    path: &str,
    query: Option<&str>,
    method: &Method,
) -> Result<EndpointTarget, GatewayError> {
    let config = snapshot
        .country(country)
        .ok_or_else(|| GatewayError::CountryNotSupported(normalize_country(country)))?;

    let matched = config
        .routes()
        .match_path(path, method)
        .map_err(|e| GatewayError::PathNotSupported {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

    let rendered = matched.route.pattern.render(&matched.params);
    Ok(EndpointTarget {
        country: config.country.clone(),
        service: config.service.clone(),
        operation: matched.route.operation.clone(),
        method: matched.route.method.clone(),
        url: build_url(&config.base_url, &rendered, query),
    })
}

/// Resolve a named operation against one snapshot.
pub fn resolve_operation_in(
    snapshot: &ConfigSnapshot,
    country: &str,
    operation: &str,
) -> Result<EndpointTarget, GatewayError> {
    let config = snapshot
        .country(country)
        .ok_or_else(|| GatewayError::CountryNotSupported(normalize_country(country)))?;

    let route = config
        .routes()
        .by_operation(operation)
        .ok_or_else(|| GatewayError::OperationNotSupported(operation.to_string()))?;

    Ok(EndpointTarget {
        country: config.country.clone(),
        service: config.service.clone(),
        operation: route.operation.clone(),
        method: route.method.clone(),
        url: build_url(&config.base_url, route.pattern.as_str(), None),
    })
}

/// Join `base`, an absolute endpoint path and an optional raw query.
pub fn build_url(base: &Url, path: &str, query: Option<&str>) -> Url {
    let mut url = base.clone();
    let joined = format!("{}{}", base.path().trim_end_matches('/'), path);
    url.set_path(&joined);
    url.set_query(query.filter(|q| !q.is_empty()));
    url
}
