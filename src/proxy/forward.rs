//! Upstream request execution.
//!
//! # Responsibilities
//! - Build the upstream request from a resolved `EndpointTarget`
//! - Execute it with a connect timeout and a bounded wait for headers
//! - Stream the upstream response back without buffering it
//!
//! # Design Decisions
//! - No retries; one attempt per inbound request
//! - Dropping the returned future cancels the upstream call
//! - Once headers arrive the body streams for as long as the upstream
//!   keeps sending; a gap between chunks longer than the idle timeout
//!   aborts the response

use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Response};
use futures_util::{stream, Stream, StreamExt, TryStreamExt};

use crate::config::settings::UpstreamSettings;
use crate::error::GatewayError;
use crate::proxy::headers::{filter_hop_by_hop, filter_request_headers};
use crate::routing::resolver::EndpointTarget;

/// Failure while relaying an upstream body that has already started.
#[derive(Debug, thiserror::Error)]
pub enum BodyStreamError {
    #[error("upstream body read failed: {0}")]
    Read(#[source] reqwest::Error),

    #[error("upstream body stalled for {0:?}")]
    Idle(Duration),
}

/// Forwards resolved requests to upstream services.
#[derive(Debug, Clone)]
pub struct ForwardingProxy {
    client: reqwest::Client,
    timeout: Duration,
    body_idle_timeout: Duration,
}

impl ForwardingProxy {
    pub fn new(settings: &UpstreamSettings) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(settings.pool_idle_timeout_secs));
        if !settings.use_env_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
            timeout: Duration::from_secs(settings.timeout_secs),
            body_idle_timeout: Duration::from_secs(settings.body_idle_timeout_secs),
        })
    }

    /// Override the allowed gap between upstream body chunks.
    pub fn with_body_idle_timeout(mut self, idle: Duration) -> Self {
        self.body_idle_timeout = idle;
        self
    }

    /// Override the wait for upstream response headers.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `body` and the filtered `headers` to `target`.
    pub async fn forward(
        &self,
        target: &EndpointTarget,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Response<Body>, GatewayError> {
        let mut request = self
            .client
            .request(target.method.clone(), target.url.clone())
            .headers(filter_request_headers(headers));
        if !body.is_empty() {
            request = request.body(body);
        }

        let started = Instant::now();
        let upstream = match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(
                    url = %target.url,
                    operation = %target.operation,
                    error = %e,
                    "Upstream request failed"
                );
                return Err(GatewayError::UpstreamRequest(e));
            }
            Err(_) => {
                tracing::warn!(
                    url = %target.url,
                    operation = %target.operation,
                    timeout = ?self.timeout,
                    "Upstream request timed out"
                );
                return Err(GatewayError::UpstreamTimeout(self.timeout));
            }
        };

        tracing::debug!(
            url = %target.url,
            status = upstream.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Upstream responded"
        );

        Ok(stream_response(upstream, self.body_idle_timeout))
    }
}

/// Turn an upstream response into a streamed downstream response.
///
/// The body fails with `BodyStreamError::Idle` if no chunk arrives within
/// `idle`, which resets the downstream response.
pub fn stream_response(upstream: reqwest::Response, idle: Duration) -> Response<Body> {
    let status = upstream.status();
    let headers = filter_hop_by_hop(upstream.headers());
    let stream = idle_bounded(upstream.bytes_stream(), idle)
        .inspect_err(|e| tracing::warn!(error = %e, "Upstream body stream failed"));

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Yield `body` chunks until it ends, errors, or stays silent for `idle`.
fn idle_bounded<S>(
    body: S,
    idle: Duration,
) -> impl Stream<Item = Result<Bytes, BodyStreamError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    stream::unfold(Some(Box::pin(body)), move |state| async move {
        let mut body = state?;
        match tokio::time::timeout(idle, body.next()).await {
            Ok(Some(Ok(chunk))) => Some((Ok(chunk), Some(body))),
            Ok(Some(Err(e))) => Some((Err(BodyStreamError::Read(e)), None)),
            Ok(None) => None,
            Err(_) => Some((Err(BodyStreamError::Idle(idle)), None)),
        }
    })
}
