//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (country, path, query, method)
//!     → resolver.rs (country lookup in the live snapshot)
//!     → matcher.rs (exact, then pattern match against the country's routes)
//!     → Return: EndpointTarget or CountryNotSupported / PathNotSupported
//!
//! Route compilation (on every load):
//!     service endpoints
//!     → Parse URI templates
//!     → Sort by precedence
//!     → Freeze inside the snapshot
//! ```
//!
//! # Design Decisions
//! - Routes are compiled at load time, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod resolver;

pub use matcher::{PathParams, PathPattern, RouteTable};
pub use resolver::{EndpointTarget, Resolver};
