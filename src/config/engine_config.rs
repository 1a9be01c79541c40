//! Engine configuration parsing from environment variables.

use crate::domain::history::MAX_HISTORY;
use anyhow::{Context, Result, bail};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct EngineEnvConfig {
    pub model_path: PathBuf,
    pub history_capacity: usize,
}

impl EngineEnvConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_path = lookup("BCR_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("tfjs_model/model.onnx"));

        let history_capacity = match lookup("BCR_HISTORY_CAPACITY") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("Invalid BCR_HISTORY_CAPACITY: {}", raw))?,
            None => MAX_HISTORY,
        };
        if history_capacity == 0 {
            bail!("BCR_HISTORY_CAPACITY must be at least 1");
        }

        Ok(Self {
            model_path,
            history_capacity,
        })
    }
}
