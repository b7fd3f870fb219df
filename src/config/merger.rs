//! Merging fragments into a snapshot.
//!
//! # Responsibilities
//! - Run validation over the raw fragments
//! - Apply environment base URL overrides to each service
//! - Drop countries disabled for the active environment
//! - Build one `ResolvedCountryConfig` per remaining country
//!
//! # Base URL precedence
//! ```text
//! environments.yaml entry  >  service `environments` entry  >  service `base_url`
//! ```

use std::collections::HashMap;

use url::Url;

use crate::config::loader::ConfigError;
use crate::config::schema::{EnvironmentOverlay, ServiceDefinition};
use crate::config::snapshot::{normalize_country, ConfigSnapshot, ResolvedCountryConfig};
use crate::config::source::Fragments;
use crate::config::validation::{validate_fragments, ValidationError};
use crate::routing::matcher::RouteError;

/// Merge and validate `fragments` for `environment`.
///
/// Fails as a whole: either every enabled country resolves, or no snapshot
/// is produced.
pub fn merge(fragments: Fragments, environment: &str) -> Result<ConfigSnapshot, ConfigError> {
    validate_fragments(&fragments).map_err(ConfigError::Validation)?;

    let overlay = fragments.environments.get(environment);
    if let Some(overlay) = overlay {
        warn_unknown_overrides(overlay, &fragments, environment);
    }

    let services: HashMap<&str, &ServiceDefinition> = fragments
        .services
        .iter()
        .map(|s| (s.definition.name.trim(), &s.definition))
        .collect();

    let mut resolved = Vec::with_capacity(fragments.countries.len());
    for (code, country) in &fragments.countries {
        let code = normalize_country(code);
        if !country.is_enabled_in(environment) {
            tracing::debug!(country = %code, environment, "Country disabled for environment");
            continue;
        }

        let service = services.get(country.service.trim()).ok_or_else(|| {
            ConfigError::Validation(vec![ValidationError::ServiceNotFound {
                country: code.clone(),
                service: country.service.clone(),
            }])
        })?;

        let base_url = effective_base_url(service, overlay, environment);
        let url = Url::parse(base_url).map_err(|e| {
            ConfigError::Validation(vec![ValidationError::InvalidBaseUrl {
                service: service.name.clone(),
                url: base_url.to_string(),
                reason: e.to_string(),
            }])
        })?;

        let config = ResolvedCountryConfig::new(
            code.clone(),
            service.name.trim(),
            url,
            service.endpoints.clone(),
        )
        .map_err(|e| ConfigError::Validation(vec![route_error(service.name.trim(), e)]))?;

        tracing::debug!(
            country = %code,
            service = %config.service,
            base_url = %config.base_url,
            endpoints = config.endpoints.len(),
            "Country resolved"
        );
        resolved.push(config);
    }

    Ok(ConfigSnapshot::new(environment, resolved))
}

/// Base URL of `service` once every override for `environment` is applied.
pub fn effective_base_url<'a>(
    service: &'a ServiceDefinition,
    overlay: Option<&'a EnvironmentOverlay>,
    environment: &str,
) -> &'a str {
    overlay
        .and_then(|o| o.services.get(service.name.trim()))
        .and_then(|o| o.base_url.as_deref())
        .unwrap_or_else(|| service.base_url_for(environment))
}

fn route_error(service: &str, error: RouteError) -> ValidationError {
    match error {
        RouteError::Pattern {
            operation,
            uri,
            source,
        } => ValidationError::InvalidUri {
            service: service.to_string(),
            endpoint: operation,
            uri,
            reason: source.to_string(),
        },
        RouteError::Method { operation, method } => ValidationError::InvalidMethod {
            service: service.to_string(),
            endpoint: operation,
            method,
        },
    }
}

fn warn_unknown_overrides(overlay: &EnvironmentOverlay, fragments: &Fragments, environment: &str) {
    for name in overlay.services.keys() {
        let known = fragments
            .services
            .iter()
            .any(|s| s.definition.name.trim() == name);
        if !known {
            tracing::warn!(service = %name, environment, "Override for unknown service ignored");
        }
    }
}
