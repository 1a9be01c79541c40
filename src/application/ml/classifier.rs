use crate::domain::ml::feature_codec::FeatureVector;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Interface for next-round classifiers.
#[async_trait]
pub trait OutcomeClassifier: Send + Sync {
    /// Probability distribution over `[PlayerWin, BankerWin, Tie]`.
    async fn predict(&self, features: &FeatureVector) -> Result<Vec<f64>>;

    /// Get model name/type
    fn name(&self) -> &str;
}

/// Produces a ready classifier from some model resource.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn OutcomeClassifier>>;

    /// Human-readable description of the resource, used in logs.
    fn describe(&self) -> String;
}
