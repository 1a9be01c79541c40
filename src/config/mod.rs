//! Configuration module for bcr-ai.
//!
//! Values come from environment variables (a `.env` file is honored by the
//! binary) and are grouped into model, storage and engine settings.

mod engine_config;
mod storage_config;

pub use engine_config::EngineEnvConfig;
pub use storage_config::StorageEnvConfig;

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub model_path: PathBuf,
    pub data_dir: PathBuf,
    pub history_key: String,
    pub history_capacity: usize,
    pub export_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let engine = EngineEnvConfig::from_lookup(&lookup).context("Failed to load engine config")?;
        let storage = StorageEnvConfig::from_lookup(&lookup).context("Failed to load storage config")?;

        Ok(Self {
            model_path: engine.model_path,
            data_dir: storage.data_dir,
            history_key: storage.history_key,
            history_capacity: engine.history_capacity,
            export_path: storage.export_path,
        })
    }

    pub fn engine(&self) -> crate::application::engine::EngineConfig {
        crate::application::engine::EngineConfig {
            history_capacity: self.history_capacity,
            history_key: self.history_key.clone(),
            export_path: self.export_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[("HOME", "/home/dealer")])).unwrap();
        assert_eq!(config.model_path, PathBuf::from("tfjs_model/model.onnx"));
        assert_eq!(config.data_dir, PathBuf::from("/home/dealer/.bcr_ai"));
        assert_eq!(config.history_key, "bcr_history_v1");
        assert_eq!(config.history_capacity, 200);
        assert_eq!(config.export_path, PathBuf::from("baccarat_history.csv"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("BCR_MODEL_PATH", "/models/bcr.onnx"),
            ("BCR_DATA_DIR", "/var/lib/bcr"),
            ("BCR_HISTORY_KEY", "table_7"),
            ("BCR_HISTORY_CAPACITY", "50"),
        ]))
        .unwrap();
        assert_eq!(config.model_path, PathBuf::from("/models/bcr.onnx"));
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/bcr"));
        assert_eq!(config.engine().history_key, "table_7");
        assert_eq!(config.engine().history_capacity, 50);
    }

    #[test]
    fn test_invalid_capacity_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("BCR_HISTORY_CAPACITY", "lots")])).unwrap_err();
        assert!(format!("{:#}", err).contains("BCR_HISTORY_CAPACITY"));

        assert!(Config::from_lookup(lookup_from(&[("BCR_HISTORY_CAPACITY", "0")])).is_err());
    }
}
