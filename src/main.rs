//! Country-aware HTTP gateway
//!
//! Routes each inbound request to the backend service configured for the
//! request's country, and streams the backend response back.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                       GATEWAY                        │
//!                    │                                                      │
//!  Client Request    │  ┌─────────┐   ┌──────────┐   ┌──────────────────┐   │
//!  ──────────────────┼─▶│  http   │──▶│  tenant  │──▶│ routing resolver │   │
//!                    │  │ server  │   │ (country)│   └────────┬─────────┘   │
//!                    │  └─────────┘   └──────────┘            │             │
//!                    │                                        ▼             │
//!  Client Response   │  ┌─────────────────────────────────────────────┐     │
//!  ◀─────────────────┼──│         proxy (forward + header hygiene)    │◀────┼──── Upstream
//!                    │  └─────────────────────────────────────────────┘     │     Service
//!                    │                                                      │
//!                    │  ┌────────────────────────────────────────────────┐  │
//!                    │  │ config store (snapshot, reload) │ admin │ obs  │  │
//!                    │  └────────────────────────────────────────────────┘  │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use country_gateway::config::loader::load_settings;
use country_gateway::config::settings::GatewaySettings;
use country_gateway::config::validation::validate_settings;
use country_gateway::config::watcher::ConfigWatcher;
use country_gateway::config::ConfigError;
use country_gateway::lifecycle::{shutdown, signals, AppContext, Shutdown};
use country_gateway::observability::{logging, metrics};
use country_gateway::GatewayServer;

/// Settings file picked up from the working directory when none is given.
const DEFAULT_SETTINGS_FILE: &str = "gateway.toml";

#[derive(Parser)]
#[command(name = "country-gateway")]
#[command(about = "Country-aware HTTP gateway", long_about = None)]
struct Cli {
    /// Settings file (TOML).
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Configuration directory (countries.yaml, services/, environments.yaml).
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:8080.
    #[arg(short, long)]
    bind: Option<String>,

    /// Active environment; overrides $ENVIRONMENT.
    #[arg(short, long)]
    environment: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;

    logging::init_logging(&settings.observability)?;
    tracing::info!("country-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    if settings.observability.metrics_enabled {
        let addr: SocketAddr = settings.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let bind_address = settings.listener.bind_address.clone();
    let shutdown_deadline = Duration::from_secs(settings.timeouts.shutdown_secs);
    let watch = settings.reload.watch;
    let debounce = Duration::from_millis(settings.reload.debounce_ms);

    let context = AppContext::initialize(settings)?;

    let shutdown = Shutdown::new();
    tokio::spawn(signals::listen(shutdown.clone(), context.store.clone()));

    // Dropping the watcher stops file events, so keep it for the process lifetime.
    let _watcher = if watch {
        Some(ConfigWatcher::new(context.store.clone(), debounce).run(shutdown.subscribe())?)
    } else {
        None
    };

    let listener = TcpListener::bind(&bind_address).await?;
    let server = GatewayServer::new(context);
    let mut serving = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let drain_deadline = {
        let rx = shutdown.subscribe();
        async move {
            shutdown::wait(rx).await;
            tokio::time::sleep(shutdown_deadline).await;
        }
    };

    tokio::select! {
        result = &mut serving => result??,
        _ = drain_deadline => {
            tracing::warn!(
                deadline_secs = shutdown_deadline.as_secs(),
                "Drain deadline reached, abandoning in-flight requests"
            );
            serving.abort();
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Settings file (explicit, or `gateway.toml` if present, or defaults) with
/// command line overrides applied.
fn resolve_settings(cli: &Cli) -> Result<GatewaySettings, ConfigError> {
    let mut settings = match &cli.settings {
        Some(path) => load_settings(path)?,
        None if Path::new(DEFAULT_SETTINGS_FILE).exists() => {
            load_settings(Path::new(DEFAULT_SETTINGS_FILE))?
        }
        None => GatewaySettings::default(),
    };

    if let Some(dir) = &cli.config_dir {
        settings.config_dir = dir.clone();
    }
    if let Some(bind) = &cli.bind {
        settings.listener.bind_address = bind.clone();
    }
    if let Some(environment) = &cli.environment {
        settings.environment = Some(environment.clone());
    }

    validate_settings(&settings).map_err(ConfigError::Validation)?;
    Ok(settings)
}
