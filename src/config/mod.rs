//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config dir (YAML fragments)
//!     → source.rs (read countries, services, environments)
//!     → merger.rs (apply environment overrides, drop disabled countries)
//!     → validation.rs (semantic checks, all errors collected)
//!     → ConfigSnapshot (validated, immutable)
//!     → store.rs (published via atomic pointer swap)
//!
//! On reload (admin endpoint, SIGHUP or watcher.rs):
//!     store.rs builds a new snapshot off to the side
//!     → swap on success, keep the old one on failure
//!
//! Process settings (gateway.toml)
//!     → loader.rs → settings.rs
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable; changes require a full reload
//! - All settings have defaults to allow minimal files
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod merger;
pub mod schema;
pub mod settings;
pub mod snapshot;
pub mod source;
pub mod store;
pub mod validation;
pub mod watcher;

pub use loader::{load_settings, ConfigError};
pub use settings::GatewaySettings;
pub use snapshot::{ConfigSnapshot, ResolvedCountryConfig};
pub use source::ConfigSource;
pub use store::{ConfigStore, ReloadSummary};
