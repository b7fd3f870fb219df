//! Process settings.
//!
//! Settings describe how the gateway process runs (listener, timeouts,
//! tenant strategy, admin surface, logging). They are read once at startup
//! from a TOML file and are not hot-reloaded; only the routing
//! configuration directory is. Every section has defaults so an empty or
//! missing file is valid.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Process variable naming the active environment.
pub const ENVIRONMENT_VAR: &str = "ENVIRONMENT";

/// Environment used when neither the settings nor the process set one.
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Root settings for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Directory holding `countries.yaml`, `services/` and `environments.yaml`.
    pub config_dir: PathBuf,

    /// Explicit environment name. Falls back to `$ENVIRONMENT`, then `dev`.
    pub environment: Option<String>,

    /// How inbound requests are mapped to operations.
    pub routing_mode: RoutingMode,

    pub listener: ListenerSettings,

    pub timeouts: TimeoutSettings,

    /// Outbound HTTP client settings.
    pub upstream: UpstreamSettings,

    /// How the country of a request is determined.
    pub tenant: TenantSettings,

    pub admin: AdminSettings,

    pub observability: ObservabilitySettings,

    pub security: SecuritySettings,

    pub reload: ReloadSettings,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("config"),
            environment: None,
            routing_mode: RoutingMode::default(),
            listener: ListenerSettings::default(),
            timeouts: TimeoutSettings::default(),
            upstream: UpstreamSettings::default(),
            tenant: TenantSettings::default(),
            admin: AdminSettings::default(),
            observability: ObservabilitySettings::default(),
            security: SecuritySettings::default(),
            reload: ReloadSettings::default(),
        }
    }
}

impl GatewaySettings {
    /// The environment whose overrides and enablement flags apply.
    pub fn active_environment(&self) -> String {
        self.environment
            .clone()
            .filter(|env| !env.trim().is_empty())
            .or_else(|| std::env::var(ENVIRONMENT_VAR).ok())
            .map(|env| env.trim().to_string())
            .filter(|env| !env.is_empty())
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
    }
}

/// Routing mode, one per deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    /// Any configured path is forwarded; resolution is by path pattern.
    #[default]
    Path,
    /// Only `GET /accounts` is exposed and resolved by operation name.
    Operation,
}

/// Listener settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerSettings {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum gateway requests resolved and forwarded concurrently.
    pub max_concurrent_requests: usize,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_concurrent_requests: 10_000,
        }
    }
}

/// Inbound timeouts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutSettings {
    /// Upper bound for producing response headers to the caller, in seconds.
    pub request_secs: u64,

    /// Time allowed for draining in-flight requests after a shutdown signal.
    pub shutdown_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            request_secs: 60,
            shutdown_secs: 30,
        }
    }
}

/// Outbound client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamSettings {
    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Time allowed for the upstream to answer with response headers.
    pub timeout_secs: u64,

    /// Longest gap allowed between two chunks of a streamed upstream body.
    pub body_idle_timeout_secs: u64,

    /// Idle pooled connections are closed after this many seconds.
    pub pool_idle_timeout_secs: u64,

    /// Honour HTTP(S)_PROXY variables for outbound calls.
    pub use_env_proxy: bool,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            timeout_secs: 30,
            body_idle_timeout_secs: 30,
            pool_idle_timeout_secs: 90,
            use_env_proxy: false,
        }
    }
}

/// Tenant selection strategy, one per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum TenantSettings {
    /// Country code taken verbatim from a request header.
    Header {
        #[serde(default = "default_country_header")]
        header: String,
    },
    /// Country taken from the `ext.classic.merchant_country` claim of the
    /// bearer token.
    TokenClaim,
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self::Header {
            header: default_country_header(),
        }
    }
}

fn default_country_header() -> String {
    "country".to_string()
}

/// Admin surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminSettings {
    /// Mount `/admin/*` routes.
    pub enabled: bool,

    /// Bearer token required on admin routes. `None` leaves them open.
    pub api_key: Option<String>,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Maximum inbound request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Hot reload configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReloadSettings {
    /// Reload automatically when files under `config_dir` change.
    pub watch: bool,

    /// Quiet period after the last file event before reloading.
    pub debounce_ms: u64,
}

impl Default for ReloadSettings {
    fn default() -> Self {
        Self {
            watch: false,
            debounce_ms: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_settings_use_defaults() {
        let settings: GatewaySettings = toml::from_str("").unwrap();
        assert_eq!(settings.config_dir, PathBuf::from("config"));
        assert_eq!(settings.routing_mode, RoutingMode::Path);
        assert_eq!(
            settings.tenant,
            TenantSettings::Header {
                header: "country".to_string()
            }
        );
        assert_eq!(settings.upstream.timeout_secs, 30);
        assert!(settings.admin.enabled);
    }

    #[test]
    fn test_tenant_strategy_parsing() {
        let settings: GatewaySettings = toml::from_str(
            r#"
routing_mode = "operation"

[tenant]
source = "token_claim"
"#,
        )
        .unwrap();
        assert_eq!(settings.routing_mode, RoutingMode::Operation);
        assert_eq!(settings.tenant, TenantSettings::TokenClaim);

        let settings: GatewaySettings = toml::from_str(
            r#"
[tenant]
source = "header"
header = "x-country"
"#,
        )
        .unwrap();
        assert_eq!(
            settings.tenant,
            TenantSettings::Header {
                header: "x-country".to_string()
            }
        );
    }

    #[test]
    fn test_explicit_environment_wins() {
        let settings = GatewaySettings {
            environment: Some("stage".to_string()),
            ..Default::default()
        };
        assert_eq!(settings.active_environment(), "stage");
    }
}
