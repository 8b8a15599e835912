//! Configuration structures for the template cache.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::template::matcher::DEFAULT_MIN_RELIABILITY;

/// Main configuration for the layoutcache pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Template store configuration.
    pub store: StoreConfig,

    /// Template matching configuration.
    pub matching: MatchingConfig,

    /// Document text loading configuration.
    pub source: SourceConfig,
}

/// Template store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the persisted template file.
    pub path: PathBuf,

    /// Pretty-print the persisted JSON.
    pub pretty: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("output/invoice_templates.json"),
            pretty: true,
        }
    }
}

/// Template matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// A template is trusted only when its reliability is strictly above this.
    pub min_reliability: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            min_reliability: DEFAULT_MIN_RELIABILITY,
        }
    }
}

/// Document text loading configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Minimum number of non-whitespace characters a document must yield
    /// (0 = accept anything, including empty text).
    pub min_text_length: usize,
}

impl CacheConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> crate::Result<()> {
        let threshold = self.matching.min_reliability;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(crate::CacheError::Config(format!(
                "matching.min_reliability must be within 0.0..=1.0, got {}",
                threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.matching.min_reliability, 0.7);
        assert_eq!(config.store.path, PathBuf::from("output/invoice_templates.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: CacheConfig =
            serde_json::from_str(r#"{"store": {"path": "/tmp/t.json"}}"#).unwrap();
        assert_eq!(config.store.path, PathBuf::from("/tmp/t.json"));
        assert!(config.store.pretty);
        assert_eq!(config.matching.min_reliability, 0.7);
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let mut config = CacheConfig::default();
        config.matching.min_reliability = 1.5;
        assert!(config.validate().is_err());
    }
}
