use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::Status;
use common::config::BackendConfig;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The live backend configuration.
///
/// Readers wait for the first value; later values replace it atomically.
pub struct ConfigCell {
    tx: watch::Sender<Option<Arc<BackendConfig>>>,
}

impl Default for ConfigCell {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigCell {
    /// An empty cell. `get` blocks until [`ConfigCell::set`] is called.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn with_config(config: BackendConfig) -> Self {
        let (tx, _) = watch::channel(Some(Arc::new(config)));
        Self { tx }
    }

    pub fn set(&self, config: BackendConfig) {
        self.tx.send_replace(Some(Arc::new(config)));
    }

    pub fn current(&self) -> Option<Arc<BackendConfig>> {
        self.tx.borrow().clone()
    }

    pub async fn get(&self, cancel: &CancellationToken) -> Result<Arc<BackendConfig>, Status> {
        if let Some(config) = self.current() {
            return Ok(config);
        }
        let mut rx = self.tx.subscribe();
        tokio::select! {
            res = rx.wait_for(Option::is_some) => {
                let config = res
                    .map_err(|e| Status::unavailable("configuration source closed").with_cause(e))?
                    .clone();
                config.ok_or_else(|| Status::unavailable("configuration missing"))
            }
            _ = cancel.cancelled() => Err(Status::cancelled("cancelled waiting for configuration")),
        }
    }
}

/// Parse the `[backend]` table of a config file.
pub fn read_backend_config(path: &Path) -> anyhow::Result<BackendConfig> {
    #[derive(serde::Deserialize)]
    struct File {
        #[serde(default)]
        backend: BackendConfig,
    }
    let text = std::fs::read_to_string(path)?;
    let file: File = toml::from_str(&text)?;
    Ok(file.backend)
}

/// Reload `path` into `cell` whenever it changes. Bad edits keep the old value.
pub fn watch_config_file(cell: Arc<ConfigCell>, path: PathBuf) -> notify::Result<RecommendedWatcher> {
    let target = path.clone();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) => {
            match read_backend_config(&target) {
                Ok(config) => {
                    cell.set(config);
                    info!(path = %target.display(), "Reloaded backend configuration");
                }
                Err(e) => {
                    warn!(path = %target.display(), error = %e, "Ignoring bad configuration edit");
                }
            }
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Configuration watch error"),
    })?;
    watcher.watch(&path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
