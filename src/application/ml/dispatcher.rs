//! Prediction dispatcher.
//!
//! Two states: `Idle` until a model has loaded, `Ready` afterwards. Every
//! prediction request carries a token from a monotonically increasing
//! counter; only the result for the most recently issued token becomes the
//! visible prediction, so overlapping requests may resolve in any order.
//! The token check and the store happen under the `latest` write guard, which
//! `invalidate` also holds while it bumps the counter.

use super::classifier::{ModelLoader, OutcomeClassifier};
use crate::domain::errors::EngineError;
use crate::domain::history::History;
use crate::domain::ml::feature_codec::{self, FEATURE_LEN, FeatureVector, WINDOW_SIZE};
use crate::domain::prediction::PredictionResult;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Ready,
}

#[derive(Default)]
struct Shared {
    classifier: RwLock<Option<Arc<dyn OutcomeClassifier>>>,
    latest_token: AtomicU64,
    latest: RwLock<Option<PredictionResult>>,
}

impl Shared {
    fn is_current(&self, token: u64) -> bool {
        self.latest_token.load(Ordering::SeqCst) == token
    }

    fn latest_guard(&self) -> RwLockWriteGuard<'_, Option<PredictionResult>> {
        match self.latest.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("PredictionDispatcher: prediction lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

/// Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct PredictionDispatcher {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for PredictionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionDispatcher")
            .field("state", &self.state())
            .field("latest_token", &self.shared.latest_token.load(Ordering::SeqCst))
            .finish()
    }
}

impl PredictionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DispatcherState {
        let ready = match self.shared.classifier.read() {
            Ok(guard) => guard.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        };
        if ready {
            DispatcherState::Ready
        } else {
            DispatcherState::Idle
        }
    }

    /// Loads the model once. On failure the dispatcher stays `Idle`; there is
    /// no automatic retry.
    pub async fn load_model(&self, loader: &dyn ModelLoader) -> Result<String, EngineError> {
        info!("PredictionDispatcher: loading model from {}", loader.describe());

        match loader.load().await {
            Ok(classifier) => {
                let name = classifier.name().to_string();
                self.install(classifier);
                info!("PredictionDispatcher: model '{}' ready", name);
                Ok(name)
            }
            Err(e) => {
                error!("PredictionDispatcher: model load failed: {:#}", e);
                Err(EngineError::ModelUnavailable {
                    reason: format!("{:#}", e),
                })
            }
        }
    }

    /// Makes an already constructed classifier available.
    pub fn install(&self, classifier: Arc<dyn OutcomeClassifier>) {
        match self.shared.classifier.write() {
            Ok(mut guard) => *guard = Some(classifier),
            Err(poisoned) => {
                error!("PredictionDispatcher: classifier lock poisoned, recovering");
                *poisoned.into_inner() = Some(classifier);
            }
        }
    }

    /// Builds a request if there is enough history.
    ///
    /// Returns `Ok(None)` while fewer than `WINDOW_SIZE` rounds are recorded
    /// and `ModelUnavailable` when history suffices but no model is loaded.
    pub fn prepare(&self, history: &History) -> Result<Option<PredictionRequest>, EngineError> {
        if history.len() < WINDOW_SIZE {
            return Ok(None);
        }

        let classifier = match self.shared.classifier.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        let Some(classifier) = classifier else {
            return Err(EngineError::ModelUnavailable {
                reason: "model not loaded yet".to_string(),
            });
        };

        let window = history.last_n(WINDOW_SIZE);
        let features = feature_codec::encode_window(&window);
        debug_assert_eq!(features.len(), FEATURE_LEN);

        let token = self.shared.latest_token.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("PredictionDispatcher: issued request #{}", token);

        Ok(Some(PredictionRequest {
            token,
            features,
            classifier,
            shared: Arc::clone(&self.shared),
        }))
    }

    /// Discards any in-flight result and clears the visible prediction.
    pub fn invalidate(&self) {
        let mut latest = self.shared.latest_guard();
        let token = self.shared.latest_token.fetch_add(1, Ordering::SeqCst) + 1;
        *latest = None;
        debug!("PredictionDispatcher: invalidated up to #{}", token);
    }

    pub fn latest(&self) -> Option<PredictionResult> {
        match self.shared.latest.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn latest_token(&self) -> u64 {
        self.shared.latest_token.load(Ordering::SeqCst)
    }
}

/// One classifier invocation, detached from the history it was built from.
pub struct PredictionRequest {
    token: u64,
    features: FeatureVector,
    classifier: Arc<dyn OutcomeClassifier>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for PredictionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionRequest")
            .field("token", &self.token)
            .field("classifier", &self.classifier.name())
            .finish()
    }
}

impl PredictionRequest {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn features(&self) -> &FeatureVector {
        &self.features
    }

    /// Invokes the classifier and publishes the result if still current.
    ///
    /// `Ok(None)` means a newer request was issued in the meantime and this
    /// result was dropped.
    pub async fn run(self) -> Result<Option<PredictionResult>, EngineError> {
        self.run_then(|_| {}).await
    }

    /// Like `run`, calling `on_visible` when the result becomes the visible
    /// prediction. The callback runs under the prediction lock, so anything it
    /// emits is ordered the same way as the stored results.
    pub async fn run_then<F>(self, on_visible: F) -> Result<Option<PredictionResult>, EngineError>
    where
        F: FnOnce(&PredictionResult) + Send,
    {
        let probabilities = self.classifier.predict(&self.features).await.map_err(|e| {
            warn!("PredictionDispatcher: request #{} failed: {:#}", self.token, e);
            EngineError::PredictionFailure {
                reason: format!("{:#}", e),
            }
        })?;

        let result = PredictionResult::from_probabilities(&probabilities, self.token)
            .inspect_err(|e| warn!("PredictionDispatcher: request #{}: {}", self.token, e))?;

        let mut latest = self.shared.latest_guard();
        if !self.shared.is_current(self.token) {
            debug!(
                "PredictionDispatcher: dropping stale result #{} (latest #{})",
                self.token,
                self.shared.latest_token.load(Ordering::SeqCst)
            );
            return Ok(None);
        }

        *latest = Some(result.clone());
        on_visible(&result);
        drop(latest);

        info!(
            "Prediction #{}: {} ({})",
            self.token,
            result.label,
            result.confidence_label()
        );
        Ok(Some(result))
    }
}
