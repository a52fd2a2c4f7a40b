//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::loader::load_config;
use crate::config::SharedConfig;

/// Reloads the config file on change and publishes it into a [`SharedConfig`].
pub struct ConfigWatcher {
    path: PathBuf,
    shared: SharedConfig,
}

impl ConfigWatcher {
    pub fn new(path: &Path, shared: SharedConfig) -> Self {
        Self {
            path: path.to_path_buf(),
            shared,
        }
    }

    /// Start watching the file. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let shared = self.shared.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    reload(&path, &shared);
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Swap in the file's current contents, keeping the old config on error.
pub fn reload(path: &Path, shared: &SharedConfig) -> bool {
    match load_config(Some(path)) {
        Ok(next) => {
            let previous = shared.load();
            if previous.listener.bind_address != next.listener.bind_address {
                tracing::warn!(
                    current = %previous.listener.bind_address,
                    requested = %next.listener.bind_address,
                    "Bind address changes need a restart"
                );
            }
            if previous.timeouts.request_secs != next.timeouts.request_secs {
                tracing::warn!(
                    current = previous.timeouts.request_secs,
                    requested = next.timeouts.request_secs,
                    "Request timeout changes need a restart"
                );
            }
            tracing::info!(
                allowed_namespaces = %next.tools.allowed_namespaces,
                max_output_bytes = next.tools.max_output_bytes,
                default_timeout_ms = next.tools.default_timeout_ms,
                "Configuration reloaded"
            );
            shared.store(std::sync::Arc::new(next));
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
            false
        }
    }
}
