//! Gateway error taxonomy and its HTTP mapping.
//!
//! Every failure produced before the upstream answers is rendered as
//! `{"error": <kind>, "details": <message>}`. Once an upstream response
//! exists its status and body are passed through untouched.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::config::loader::ConfigError;
use crate::http::tenant::TenantError;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("configuration has not been loaded")]
    ConfigNotInitialized,

    #[error("country {0:?} is not configured for this environment")]
    CountryNotSupported(String),

    #[error("path {path} is not supported: {reason}")]
    PathNotSupported { path: String, reason: String },

    #[error("operation {0} is not configured")]
    OperationNotSupported(String),

    #[error(transparent)]
    Tenant(#[from] TenantError),

    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("{0}")]
    ReloadFailed(ConfigError),

    #[error("upstream request failed: {0}")]
    UpstreamRequest(#[source] reqwest::Error),

    #[error("upstream did not respond within {0:?}")]
    UpstreamTimeout(Duration),

    #[error("background task failed: {0}")]
    Task(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::CountryNotSupported(_)
            | Self::PathNotSupported { .. }
            | Self::OperationNotSupported(_)
            | Self::BodyRead(_)
            | Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::Tenant(e) => e.status(),
            Self::ConfigNotInitialized
            | Self::ReloadFailed(_)
            | Self::UpstreamRequest(_)
            | Self::UpstreamTimeout(_)
            | Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short, stable error label for the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CountryNotSupported(_) => "country not supported",
            Self::PathNotSupported { .. } | Self::OperationNotSupported(_) => "path not supported",
            Self::Tenant(e) => e.kind(),
            Self::BodyRead(_) | Self::MalformedBody(_) => "bad request",
            Self::ReloadFailed(_) => "failed to reload configuration",
            Self::ConfigNotInitialized
            | Self::UpstreamRequest(_)
            | Self::UpstreamTimeout(_)
            | Self::Task(_) => "internal server error",
        }
    }
}

/// JSON body of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub details: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = ErrorBody {
            error: self.kind(),
            details: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
