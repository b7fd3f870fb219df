//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (countries reference existing services)
//! - Check every service exposes the required operations
//! - Validate base URLs, methods and URI templates
//! - Validate value ranges of process settings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function of the fragments
//! - Runs before a snapshot is built, so a failing load never replaces
//!   the live configuration

use std::collections::BTreeMap;

use url::Url;

use crate::config::schema::ServiceDefinition;
use crate::config::settings::{GatewaySettings, TenantSettings};
use crate::config::source::Fragments;
use crate::config::snapshot::normalize_country;
use crate::routing::matcher::{parse_method, PathPattern};

/// Operation every service must define.
pub const GET_ACCOUNT_OPERATION: &str = "GetAccount";

/// Operations every service must define.
pub const REQUIRED_ENDPOINTS: &[&str] = &[GET_ACCOUNT_OPERATION];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("country {country} references non-existent service {service}")]
    ServiceNotFound { country: String, service: String },

    #[error("service {service} missing required endpoint {endpoint}")]
    MissingEndpoint { service: String, endpoint: String },

    #[error("service {name} is defined in both {first} and {second}")]
    DuplicateService {
        name: String,
        first: String,
        second: String,
    },

    #[error("country {country} is defined more than once")]
    DuplicateCountry { country: String },

    #[error("country code {country:?} is empty")]
    EmptyCountry { country: String },

    #[error("service defined in {path} has an empty name")]
    EmptyServiceName { path: String },

    #[error("service {service} has invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl {
        service: String,
        url: String,
        reason: String,
    },

    #[error("endpoint {service}.{endpoint} has unsupported method {method:?}")]
    InvalidMethod {
        service: String,
        endpoint: String,
        method: String,
    },

    #[error("endpoint {service}.{endpoint} has invalid uri {uri:?}: {reason}")]
    InvalidUri {
        service: String,
        endpoint: String,
        uri: String,
        reason: String,
    },

    #[error("endpoint {service}.{endpoint} is resolved by name and cannot take parameters: {uri:?}")]
    ParameterizedOperation {
        service: String,
        endpoint: String,
        uri: String,
    },

    #[error("setting {field} is invalid: {reason}")]
    InvalidSetting { field: &'static str, reason: String },
}

/// Validate the fragments read from one configuration directory.
pub fn validate_fragments(fragments: &Fragments) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Unique, non-empty service names.
    let mut services: BTreeMap<&str, String> = BTreeMap::new();
    for loaded in &fragments.services {
        let name = loaded.definition.name.trim();
        let path = loaded.path.display().to_string();
        if name.is_empty() {
            errors.push(ValidationError::EmptyServiceName { path });
            continue;
        }
        if let Some(first) = services.insert(name, path.clone()) {
            errors.push(ValidationError::DuplicateService {
                name: name.to_string(),
                first,
                second: path,
            });
        }
        validate_service(&loaded.definition, &mut errors);
    }

    // Overlay URLs are validated only for services that exist.
    for overlay in fragments.environments.values() {
        for (name, service_override) in &overlay.services {
            if !services.contains_key(name.as_str()) {
                continue;
            }
            if let Some(url) = &service_override.base_url {
                validate_base_url(name, url, &mut errors);
            }
        }
    }

    // Every country, enabled or not, must point at a loaded service.
    let mut codes: BTreeMap<String, &str> = BTreeMap::new();
    for (code, country) in &fragments.countries {
        let normalized = normalize_country(code);
        if normalized.is_empty() {
            errors.push(ValidationError::EmptyCountry {
                country: code.clone(),
            });
            continue;
        }
        if codes.insert(normalized.clone(), code).is_some() {
            errors.push(ValidationError::DuplicateCountry {
                country: normalized.clone(),
            });
        }
        if !services.contains_key(country.service.trim()) {
            errors.push(ValidationError::ServiceNotFound {
                country: normalized,
                service: country.service.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_service(service: &ServiceDefinition, errors: &mut Vec<ValidationError>) {
    let name = service.name.trim();

    validate_base_url(name, &service.base_url, errors);
    for url in service.environments.values() {
        validate_base_url(name, url, errors);
    }

    for required in REQUIRED_ENDPOINTS {
        if !service.endpoints.contains_key(*required) {
            errors.push(ValidationError::MissingEndpoint {
                service: name.to_string(),
                endpoint: required.to_string(),
            });
        }
    }

    for (operation, endpoint) in &service.endpoints {
        if parse_method(&endpoint.method).is_none() {
            errors.push(ValidationError::InvalidMethod {
                service: name.to_string(),
                endpoint: operation.clone(),
                method: endpoint.method.clone(),
            });
        }
        match PathPattern::parse(&endpoint.uri) {
            Err(e) => errors.push(ValidationError::InvalidUri {
                service: name.to_string(),
                endpoint: operation.clone(),
                uri: endpoint.uri.clone(),
                reason: e.to_string(),
            }),
            // Named lookups have no request path to fill parameters from.
            Ok(pattern)
                if REQUIRED_ENDPOINTS.contains(&operation.as_str()) && !pattern.is_literal() =>
            {
                errors.push(ValidationError::ParameterizedOperation {
                    service: name.to_string(),
                    endpoint: operation.clone(),
                    uri: endpoint.uri.clone(),
                });
            }
            Ok(_) => {}
        }
    }
}

fn validate_base_url(service: &str, url: &str, errors: &mut Vec<ValidationError>) {
    let reason = match Url::parse(url) {
        Ok(parsed) if !matches!(parsed.scheme(), "http" | "https") => {
            Some(format!("unsupported scheme {}", parsed.scheme()))
        }
        Ok(parsed) if parsed.host_str().is_none() => Some("missing host".to_string()),
        Ok(parsed) if parsed.query().is_some() || parsed.fragment().is_some() => {
            Some("must not carry a query or fragment".to_string())
        }
        Ok(_) => None,
        Err(e) => Some(e.to_string()),
    };

    if let Some(reason) = reason {
        errors.push(ValidationError::InvalidBaseUrl {
            service: service.to_string(),
            url: url.to_string(),
            reason,
        });
    }
}

/// Validate process settings value ranges.
pub fn validate_settings(settings: &GatewaySettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.listener.max_concurrent_requests == 0 {
        errors.push(ValidationError::InvalidSetting {
            field: "listener.max_concurrent_requests",
            reason: "must be greater than 0".to_string(),
        });
    }
    if settings.timeouts.request_secs == 0 {
        errors.push(ValidationError::InvalidSetting {
            field: "timeouts.request_secs",
            reason: "must be greater than 0".to_string(),
        });
    }
    if settings.upstream.timeout_secs == 0 {
        errors.push(ValidationError::InvalidSetting {
            field: "upstream.timeout_secs",
            reason: "must be greater than 0".to_string(),
        });
    }
    if settings.upstream.body_idle_timeout_secs == 0 {
        errors.push(ValidationError::InvalidSetting {
            field: "upstream.body_idle_timeout_secs",
            reason: "must be greater than 0".to_string(),
        });
    }
    if settings.upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::InvalidSetting {
            field: "upstream.connect_timeout_secs",
            reason: "must be greater than 0".to_string(),
        });
    }
    if let TenantSettings::Header { header } = &settings.tenant {
        if axum::http::HeaderName::from_bytes(header.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidSetting {
                field: "tenant.header",
                reason: format!("{header:?} is not a valid header name"),
            });
        }
    }
    if matches!(&settings.admin.api_key, Some(key) if key.trim().is_empty()) {
        errors.push(ValidationError::InvalidSetting {
            field: "admin.api_key",
            reason: "must not be empty when set".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
