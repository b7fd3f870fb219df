//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP)
//! - Translate signals to internal events
//! - Trigger appropriate actions (shutdown, reload)
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A second SIGTERM/SIGINT forces exit
//! - SIGHUP triggers config reload, not shutdown

use std::sync::Arc;

use crate::config::store::ConfigStore;
use crate::lifecycle::shutdown::Shutdown;

/// Listen for signals until the process exits. Spawn this as a task.
pub async fn listen(shutdown: Shutdown, store: Arc<ConfigStore>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                return;
            }
        };
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGHUP handler");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => on_terminate("SIGINT", &shutdown),
                _ = terminate.recv() => on_terminate("SIGTERM", &shutdown),
                _ = hangup.recv() => reload(&store).await,
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = store;
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                tracing::error!("Failed to install Ctrl+C handler");
                return;
            }
            on_terminate("Ctrl+C", &shutdown);
        }
    }
}

fn on_terminate(signal: &str, shutdown: &Shutdown) {
    if shutdown.trigger() {
        tracing::info!(signal, "Shutdown signal received, draining");
    } else {
        tracing::warn!(signal, "Second shutdown signal, exiting immediately");
        std::process::exit(1);
    }
}

#[cfg_attr(not(unix), allow(dead_code))]
async fn reload(store: &Arc<ConfigStore>) {
    tracing::info!(signal = "SIGHUP", "Reloading configuration");
    let store = store.clone();
    if let Err(e) = tokio::task::spawn_blocking(move || store.reload()).await {
        tracing::error!(error = %e, "Reload task failed");
    }
}
