//! Storage and export configuration parsing from environment variables.

use crate::application::export::DEFAULT_EXPORT_FILE;
use crate::infrastructure::history_persistence::DEFAULT_HISTORY_KEY;
use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct StorageEnvConfig {
    pub data_dir: PathBuf,
    pub history_key: String,
    pub export_path: PathBuf,
}

impl StorageEnvConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = match lookup("BCR_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = lookup("HOME").context("Neither BCR_DATA_DIR nor HOME is set")?;
                PathBuf::from(home).join(".bcr_ai")
            }
        };

        Ok(Self {
            data_dir,
            history_key: lookup("BCR_HISTORY_KEY")
                .unwrap_or_else(|| DEFAULT_HISTORY_KEY.to_string()),
            export_path: lookup("BCR_EXPORT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_FILE)),
        })
    }
}
