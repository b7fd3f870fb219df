//! Bound on concurrently handled gateway requests.
//!
//! When the limit is reached, new requests wait until a slot becomes
//! available. A slot is held from resolution until the upstream response
//! headers have been received.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::GatewayError;

#[derive(Debug, Clone)]
pub struct RequestLimiter {
    permits: Arc<Semaphore>,
    max_requests: usize,
}

impl RequestLimiter {
    pub fn new(max_requests: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_requests)),
            max_requests,
        }
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> Result<RequestPermit, GatewayError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| GatewayError::Task("request limiter closed".to_string()))?;
        Ok(RequestPermit { _permit: permit })
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }
}

/// A request slot; released on drop, including on panic.
#[derive(Debug)]
pub struct RequestPermit {
    _permit: OwnedSemaphorePermit,
}
