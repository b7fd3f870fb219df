use std::time::UNIX_EPOCH;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::GatewayError;
use crate::lifecycle::startup::AppContext;

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub message: &'static str,
    pub environment: String,
    pub countries: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct CountriesResponse {
    pub countries: Vec<String>,
    pub count: usize,
    pub environment: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub config: ConfigHealth,
}

#[derive(Debug, Serialize)]
pub struct ConfigHealth {
    pub available_countries: usize,
    pub config_loaded: bool,
    pub environment: String,
    /// Unix seconds of the live snapshot.
    pub loaded_at: Option<u64>,
}

/// Re-read the configuration directory and swap the snapshot.
pub async fn reload_config(
    State(ctx): State<AppContext>,
) -> Result<Json<ReloadResponse>, GatewayError> {
    let store = ctx.store.clone();
    let summary = tokio::task::spawn_blocking(move || store.reload())
        .await
        .map_err(|e| GatewayError::Task(e.to_string()))?
        .map_err(GatewayError::ReloadFailed)?;

    Ok(Json(ReloadResponse {
        message: "Configuration reloaded successfully",
        count: summary.countries.len(),
        environment: summary.environment,
        countries: summary.countries,
    }))
}

pub async fn list_countries(State(ctx): State<AppContext>) -> Json<CountriesResponse> {
    let countries = ctx.store.list_countries();
    Json(CountriesResponse {
        count: countries.len(),
        countries,
        environment: ctx.store.environment().to_string(),
    })
}

pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    let snapshot = ctx.store.snapshot().ok();
    let loaded_at = snapshot.as_ref().and_then(|s| {
        s.loaded_at()
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(|d| d.as_secs())
    });

    Json(HealthResponse {
        status: if snapshot.is_some() { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        config: ConfigHealth {
            available_countries: snapshot.as_ref().map_or(0, |s| s.len()),
            config_loaded: snapshot.is_some(),
            environment: ctx.store.environment().to_string(),
            loaded_at,
        },
    })
}
