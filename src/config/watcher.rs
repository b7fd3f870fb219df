//! Configuration directory watcher for hot reload.

use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};

use crate::config::loader::ConfigError;
use crate::config::store::ConfigStore;

/// Reloads a `ConfigStore` whenever files under its directory change.
pub struct ConfigWatcher {
    store: Arc<ConfigStore>,
    debounce: Duration,
}

impl ConfigWatcher {
    pub fn new(store: Arc<ConfigStore>, debounce: Duration) -> Self {
        Self { store, debounce }
    }

    /// Start watching.
    ///
    /// File events are collapsed until the directory has been quiet for the
    /// debounce window, then one reload runs on the blocking pool. The
    /// returned watcher stops delivering events when dropped.
    pub fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<RecommendedWatcher, ConfigError> {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let dir = self.store.source().dir().to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        let _ = event_tx.send(());
                    }
                }
                Err(e) => tracing::error!(error = %e, "Watch error"),
            },
            Config::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::Recursive)?;

        let store = self.store;
        let debounce = self.debounce;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    event = event_rx.recv() => {
                        if event.is_none() {
                            break;
                        }
                        // Wait for the burst to settle.
                        while let Ok(Some(())) = tokio::time::timeout(debounce, event_rx.recv()).await {}

                        tracing::info!("Configuration change detected, reloading");
                        let store = store.clone();
                        match tokio::task::spawn_blocking(move || store.reload()).await {
                            Ok(Ok(_)) => {}
                            // Already logged by the store.
                            Ok(Err(_)) => {}
                            Err(e) => tracing::error!(error = %e, "Reload task failed"),
                        }
                    }
                }
            }
            tracing::debug!("Config watcher stopped");
        });

        tracing::info!(dir = %dir.display(), "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::source::ConfigSource;
    use crate::config::testing::TempConfigDir;
    use std::time::Instant;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_file_change_triggers_reload() {
        let dir = TempConfigDir::sample();
        let store = Arc::new(ConfigStore::new(ConfigSource::new(dir.path()), "dev"));
        store.initialize().unwrap();
        assert_eq!(store.list_countries(), vec!["DE", "US"]);

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let _watcher = ConfigWatcher::new(store.clone(), Duration::from_millis(50))
            .run(shutdown_rx)
            .unwrap();

        dir.write("countries.yaml", "countries:\n  US:\n    service: atomic\n");

        let deadline = Instant::now() + Duration::from_secs(10);
        while store.list_countries() != vec!["US"] {
            assert!(Instant::now() < deadline, "reload was not triggered");
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let _ = shutdown_tx.send(());
    }
}
