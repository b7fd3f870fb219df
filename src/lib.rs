//! Country-aware HTTP gateway library

pub mod admin;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;

pub use config::settings::GatewaySettings;
pub use error::GatewayError;
pub use http::GatewayServer;
pub use lifecycle::{AppContext, Shutdown};
