use super::classifier::{ModelLoader, OutcomeClassifier};
use crate::domain::ml::feature_codec::{FEATURE_LEN, FeatureVector};
use crate::domain::outcome::Outcome;
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use ort::session::Session;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Classifier backed by an ONNX Runtime session.
///
/// The model takes a `[1, 15]` float tensor and returns one row of three
/// class probabilities.
pub struct OnnxClassifier {
    session: Arc<Mutex<Session>>,
    name: String,
}

impl OnnxClassifier {
    fn run_blocking(session: &Mutex<Session>, features: Vec<f32>) -> Result<Vec<f64>> {
        let mut session = session
            .lock()
            .map_err(|e| anyhow!("Session lock failed: {}", e))?;

        let shape = vec![1, FEATURE_LEN];
        let input_value = ort::value::Value::from_array((shape.as_slice(), features))
            .map_err(|e| anyhow!("Input value creation failed: {}", e))?;

        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| anyhow!("Inference failed: {}", e))?;

        let output_value = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or_else(|| anyhow!("No output found"))?;
        let data = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| anyhow!("Output extraction failed: {}", e))?;

        let probabilities: Vec<f64> = data.1.iter().map(|p| *p as f64).collect();
        if probabilities.len() != Outcome::ALL.len() {
            bail!(
                "Model returned {} values, expected {}",
                probabilities.len(),
                Outcome::ALL.len()
            );
        }
        Ok(probabilities)
    }
}

#[async_trait]
impl OutcomeClassifier for OnnxClassifier {
    async fn predict(&self, features: &FeatureVector) -> Result<Vec<f64>> {
        if features.len() != FEATURE_LEN {
            bail!("Expected {} features, got {}", FEATURE_LEN, features.len());
        }

        let session = Arc::clone(&self.session);
        let input = features.as_slice().to_vec();
        tokio::task::spawn_blocking(move || Self::run_blocking(&session, input))
            .await
            .context("Inference task panicked")?
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Loads an `.onnx` file on the blocking pool.
pub struct OnnxModelLoader {
    model_path: PathBuf,
}

impl OnnxModelLoader {
    pub fn new(model_path: PathBuf) -> Self {
        Self { model_path }
    }
}

#[async_trait]
impl ModelLoader for OnnxModelLoader {
    async fn load(&self) -> Result<Arc<dyn OutcomeClassifier>> {
        if !self.model_path.exists() {
            warn!("ONNX model file not found at {:?}", self.model_path);
            bail!("Model file not found: {}", self.model_path.display());
        }

        let path = self.model_path.clone();
        let session = tokio::task::spawn_blocking(move || -> Result<Session> {
            let builder =
                Session::builder().map_err(|e| anyhow!("Failed to create session builder: {}", e))?;
            builder
                .commit_from_file(&path)
                .map_err(|e| anyhow!("Failed to load ONNX model {}: {}", path.display(), e))
        })
        .await
        .context("Model load task panicked")??;

        info!("Successfully loaded ONNX model from {:?}", self.model_path);

        let name = self
            .model_path
            .file_stem()
            .map(|s| format!("onnx:{}", s.to_string_lossy()))
            .unwrap_or_else(|| "onnx".to_string());

        Ok(Arc::new(OnnxClassifier {
            session: Arc::new(Mutex::new(session)),
            name,
        }))
    }

    fn describe(&self) -> String {
        self.model_path.display().to_string()
    }
}
