//! Path-mode gateway handler.
//!
//! Every inbound path reaches this handler. Resolution happens against the
//! live snapshot per request, so paths added by a reload work without
//! touching the axum router.

use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::header::CONTENT_LENGTH;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};

use crate::config::snapshot::normalize_country;
use crate::error::GatewayError;
use crate::lifecycle::startup::AppContext;
use crate::observability::metrics;

/// Label used when a request never resolved to a configured country.
pub const UNRESOLVED_COUNTRY: &str = "none";

/// Resolve the request by country and path, then forward it.
pub async fn gateway_handler(State(ctx): State<AppContext>, request: Request) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let (country, response) = match proxy_request(&ctx, request).await {
        Ok((country, response)) => (country, response),
        Err(e) => (UNRESOLVED_COUNTRY.to_string(), e.into_response()),
    };

    tracing::info!(
        method = %method,
        path = %path,
        country = %country,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Gateway request completed"
    );
    metrics::record_request(method.as_str(), response.status().as_u16(), &country, start);

    response
}

async fn proxy_request(
    ctx: &AppContext,
    request: Request,
) -> Result<(String, Response), GatewayError> {
    let _permit = ctx.limiter.acquire().await?;
    let country = normalize_country(&ctx.tenant.extract(request.headers())?);

    let (parts, body) = request.into_parts();
    let target = ctx.resolver.resolve(
        &country,
        parts.uri.path(),
        parts.uri.query(),
        &parts.method,
    )?;

    tracing::debug!(
        country = %target.country,
        service = %target.service,
        operation = %target.operation,
        url = %target.url,
        "Request resolved"
    );

    let body = read_body(body, &parts.headers, ctx.settings.security.max_body_size).await?;
    let response = ctx.proxy.forward(&target, &parts.headers, body).await?;
    Ok((target.country, response))
}

/// Buffer the inbound body, refusing anything above `limit` bytes.
pub(crate) async fn read_body(
    body: Body,
    headers: &HeaderMap,
    limit: usize,
) -> Result<Bytes, GatewayError> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if matches!(declared, Some(len) if len > limit) {
        return Err(GatewayError::BodyRead(format!(
            "body exceeds {limit} bytes"
        )));
    }

    axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| GatewayError::BodyRead(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_body_limits() {
        let headers = HeaderMap::new();
        let bytes = read_body(Body::from("hello"), &headers, 16).await.unwrap();
        assert_eq!(&bytes[..], b"hello");

        let err = read_body(Body::from("hello world"), &headers, 4)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::BodyRead(_)));

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, "100".parse().unwrap());
        let err = read_body(Body::empty(), &headers, 10).await.unwrap_err();
        assert!(err.to_string().contains("10 bytes"));
    }
}
