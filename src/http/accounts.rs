//! Operation-mode account lookup.
//!
//! Only `GET /accounts` is exposed. The JSON body is parsed into a typed
//! request and re-marshaled for the country's `GetAccount` endpoint.

use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::config::snapshot::normalize_country;
use crate::config::validation::GET_ACCOUNT_OPERATION;
use crate::error::GatewayError;
use crate::http::handlers::{read_body, UNRESOLVED_COUNTRY};
use crate::http::tenant::Tenant;
use crate::lifecycle::startup::AppContext;
use crate::observability::metrics;

pub const ACCOUNTS_PATH: &str = "/accounts";

/// Body of an account lookup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccountRequest {
    pub mid: String,
}

pub async fn get_account(
    State(ctx): State<AppContext>,
    tenant: Result<Tenant, GatewayError>,
    request: Request,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    let (country, response) = match forward_account(&ctx, tenant, request).await {
        Ok((country, response)) => (country, response),
        Err(e) => (UNRESOLVED_COUNTRY.to_string(), e.into_response()),
    };

    tracing::info!(
        country = %country,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Account request completed"
    );
    metrics::record_request(method.as_str(), response.status().as_u16(), &country, start);

    response
}

async fn forward_account(
    ctx: &AppContext,
    tenant: Result<Tenant, GatewayError>,
    request: Request,
) -> Result<(String, Response), GatewayError> {
    let _permit = ctx.limiter.acquire().await?;
    let Tenant(country) = tenant?;
    let target = ctx
        .resolver
        .resolve_operation(&normalize_country(&country), GET_ACCOUNT_OPERATION)?;

    let (parts, body) = request.into_parts();
    let raw = read_body(body, &parts.headers, ctx.settings.security.max_body_size).await?;
    let account: AccountRequest =
        serde_json::from_slice(&raw).map_err(|e| GatewayError::MalformedBody(e.to_string()))?;
    let payload =
        serde_json::to_vec(&account).map_err(|e| GatewayError::MalformedBody(e.to_string()))?;

    let mut headers = parts.headers;
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let response = ctx.proxy.forward(&target, &headers, payload.into()).await?;
    Ok((target.country, response))
}
