//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, request ID, tracing, timeout)
//!     → tenant.rs (country from header or bearer token claim)
//!     → limit.rs (wait for a request slot)
//!     → handlers.rs (path mode) or accounts.rs (operation mode)
//!     → routing::Resolver → proxy::ForwardingProxy
//!     → streamed upstream response back to the client
//! ```

pub mod accounts;
pub mod handlers;
pub mod limit;
pub mod server;
pub mod tenant;

pub use server::{GatewayServer, X_REQUEST_ID};
