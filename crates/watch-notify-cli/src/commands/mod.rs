pub mod check;
pub mod clear;
pub mod config;
pub mod daemon;
pub mod history;
pub mod prune;
pub mod status;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use watch_notify_config::{Config, PathManager};
use watch_notify_core::{DedupStore, JsonFileStore, Orchestrator, StateStore};
use watch_notify_sources::SourceSet;

/// Where things live for this invocation, and the validated config
pub struct AppContext {
    pub paths: PathManager,
    pub config_file: PathBuf,
    pub config: Config,
}

impl AppContext {
    /// Load and validate the config. Fails before any network call when a
    /// required credential is missing.
    pub fn load(config_override: Option<PathBuf>) -> Result<Self> {
        let paths = PathManager::default();
        let config_file = config_override.unwrap_or_else(|| paths.config_file());

        let config = Config::load(&config_file)
            .wrap_err_with(|| format!("Failed to load configuration from {}", config_file.display()))?;
        tracing::debug!(config_file = %config_file.display(), "Loaded configuration");

        Ok(Self {
            paths,
            config_file,
            config,
        })
    }

    /// Paths only, for commands that never touch the upstreams
    pub fn paths_only(config_override: Option<PathBuf>) -> Result<Self> {
        let paths = PathManager::default();
        let config_file = config_override.unwrap_or_else(|| paths.config_file());
        let config = if config_file.exists() {
            Config::load_from_file(&config_file)
                .wrap_err_with(|| format!("Failed to read {}", config_file.display()))?
        } else {
            Config::default()
        };

        Ok(Self {
            paths,
            config_file,
            config,
        })
    }

    pub fn state_file(&self) -> PathBuf {
        self.config
            .pipeline
            .state_file
            .clone()
            .unwrap_or_else(|| self.paths.state_file())
    }

    /// Lock next to the state file, so an overridden state location gets its own lock
    pub fn lock_file(&self) -> PathBuf {
        match &self.config.pipeline.state_file {
            Some(state) => state.with_extension("lock"),
            None => self.paths.lock_file(),
        }
    }

    pub fn lock_stale_after(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.config.pipeline.lock_stale_minutes as i64)
    }

    pub fn file_store(&self) -> Arc<JsonFileStore> {
        Arc::new(JsonFileStore::new(self.state_file()))
    }

    pub fn dedup(&self) -> DedupStore {
        DedupStore::new(self.file_store())
    }

    pub fn orchestrator(&self, store: Arc<dyn StateStore>) -> Orchestrator {
        let sources = SourceSet::from_config(&self.config);
        Orchestrator::from_config(&self.config, sources, store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_state_override_moves_lock() {
        let dir = TempDir::new().unwrap();
        let mut context = AppContext::paths_only(Some(dir.path().join("missing.toml"))).unwrap();
        assert_eq!(context.state_file(), context.paths.state_file());
        assert_eq!(context.lock_file(), context.paths.lock_file());

        context.config.pipeline.state_file = Some(dir.path().join("state.json"));
        assert_eq!(context.state_file(), dir.path().join("state.json"));
        assert_eq!(context.lock_file(), dir.path().join("state.lock"));
    }
}
