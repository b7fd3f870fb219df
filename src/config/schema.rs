//! Configuration fragment schema.
//!
//! These types mirror the YAML files of a configuration directory:
//!
//! ```text
//! <config_dir>/
//!     countries.yaml        country code -> bound service + per-env enablement
//!     services/*.yaml       one service per file
//!     environments.yaml     optional per-env base URL overlay
//! ```
//!
//! Fragments are deserialized as-is. They only become usable after
//! `merger.rs` has merged and validated them into a `ConfigSnapshot`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Contents of `countries.yaml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CountriesFile {
    pub countries: BTreeMap<String, CountryDefinition>,
}

/// A country bound to exactly one service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CountryDefinition {
    /// Name of the service this country routes to.
    pub service: String,

    /// Enablement per environment name. A missing entry means enabled.
    #[serde(default)]
    pub environments: BTreeMap<String, bool>,
}

impl CountryDefinition {
    pub fn is_enabled_in(&self, environment: &str) -> bool {
        self.environments.get(environment).copied().unwrap_or(true)
    }
}

/// Contents of one `services/*.yaml` file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceFile {
    pub service: ServiceDefinition,
}

/// An upstream backend with its operations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceDefinition {
    pub name: String,

    /// Default base URL, used when no environment override applies.
    pub base_url: String,

    /// Base URL overrides keyed by environment name.
    #[serde(default)]
    pub environments: BTreeMap<String, String>,

    /// Operations keyed by operation identifier (e.g. `GetAccount`).
    #[serde(default)]
    pub endpoints: BTreeMap<String, EndpointDefinition>,
}

impl ServiceDefinition {
    /// Base URL for `environment`, before `environments.yaml` is applied.
    pub fn base_url_for(&self, environment: &str) -> &str {
        self.environments
            .get(environment)
            .map(String::as_str)
            .unwrap_or(&self.base_url)
    }
}

/// One upstream operation: HTTP method plus URI template.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EndpointDefinition {
    pub method: String,

    /// Path on the upstream, also used to match inbound paths.
    /// May contain whole-segment parameters such as `/accounts/{id}`.
    pub uri: String,
}

/// Contents of the optional `environments.yaml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EnvironmentsFile {
    pub environments: BTreeMap<String, EnvironmentOverlay>,
}

/// Overrides applied when the named environment is active.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EnvironmentOverlay {
    pub services: BTreeMap<String, ServiceOverride>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceOverride {
    pub base_url: Option<String>,
}
