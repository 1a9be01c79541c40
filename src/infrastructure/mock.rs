use crate::application::ml::classifier::{ModelLoader, OutcomeClassifier};
use crate::domain::ml::feature_codec::FeatureVector;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Classifier that always answers with the same distribution.
#[derive(Debug)]
pub struct StaticClassifier {
    probabilities: Vec<f64>,
    delay: Option<Duration>,
    fail_with: Option<String>,
    calls: AtomicUsize,
}

impl StaticClassifier {
    pub fn new(probabilities: Vec<f64>) -> Self {
        Self {
            probabilities,
            delay: None,
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Errors on every call.
    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            ..Self::new(Vec::new())
        }
    }

    /// Sleeps before answering, to simulate slow inference.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OutcomeClassifier for StaticClassifier {
    async fn predict(&self, _features: &FeatureVector) -> Result<Vec<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.fail_with {
            Some(reason) => Err(anyhow!("{}", reason)),
            None => Ok(self.probabilities.clone()),
        }
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Loader handing out a prepared classifier, or failing.
pub struct StaticModelLoader {
    classifier: Option<Arc<dyn OutcomeClassifier>>,
    error: String,
}

impl StaticModelLoader {
    pub fn new(classifier: impl OutcomeClassifier + 'static) -> Self {
        Self::shared(Arc::new(classifier))
    }

    /// Hands out a classifier the caller keeps a handle to.
    pub fn shared(classifier: Arc<dyn OutcomeClassifier>) -> Self {
        Self {
            classifier: Some(classifier),
            error: String::new(),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            classifier: None,
            error: reason.to_string(),
        }
    }
}

#[async_trait]
impl ModelLoader for StaticModelLoader {
    async fn load(&self) -> Result<Arc<dyn OutcomeClassifier>> {
        self.classifier
            .clone()
            .ok_or_else(|| anyhow!("{}", self.error))
    }

    fn describe(&self) -> String {
        "static model".to_string()
    }
}
