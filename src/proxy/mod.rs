//! Forwarding proxy subsystem.
//!
//! # Data Flow
//! ```text
//! EndpointTarget + inbound headers + body
//!     → headers.rs (drop hop-by-hop, Host, Content-Length)
//!     → forward.rs (reqwest call with timeouts)
//!     → headers.rs (drop hop-by-hop from the upstream response)
//!     → streamed Response<Body>
//! ```

pub mod forward;
pub mod headers;

pub use forward::ForwardingProxy;
