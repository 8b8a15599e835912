//! Subcommands.

pub mod batch;
pub mod config;
pub mod fingerprint;
pub mod learn;
pub mod process;
pub mod stats;

use std::path::PathBuf;

use tracing::debug;

use layoutcache_core::{CacheConfig, TemplateCache};

/// Options shared by every subcommand.
pub struct GlobalOptions {
    pub config: Option<String>,
    pub store: Option<String>,
}

impl GlobalOptions {
    /// The `--config` file, else the default location.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(config::default_config_path)
    }

    /// Explicit config file, else the default one if present, else defaults.
    pub fn load_config(&self) -> anyhow::Result<CacheConfig> {
        let path = self.config_path();
        let mut config = if self.config.is_some() || path.exists() {
            debug!("Using config {}", path.display());
            CacheConfig::from_file(&path)?
        } else {
            CacheConfig::default()
        };

        if let Some(store) = &self.store {
            config.store.path = PathBuf::from(store);
        }

        Ok(config)
    }

    pub fn open_cache(&self) -> anyhow::Result<(CacheConfig, TemplateCache)> {
        let config = self.load_config()?;
        let cache = TemplateCache::from_config(&config)?;
        Ok((config, cache))
    }
}
