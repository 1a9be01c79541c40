//! Round history engine.
//!
//! Owns the history and runs the per-round pipeline:
//! append → persist → alert re-evaluation → prediction request.
//!
//! All mutation happens through `&mut self`, one event at a time. Classifier
//! calls are the only asynchronous part; they are handed back to the caller
//! as `PredictionRequest`s, which may be awaited inline or spawned.

use crate::application::events::EngineEvent;
use crate::application::export;
use crate::application::ml::classifier::ModelLoader;
use crate::application::ml::dispatcher::{DispatcherState, PredictionDispatcher, PredictionRequest};
use crate::domain::alerts::{self, Alert};
use crate::domain::errors::EngineError;
use crate::domain::history::{History, LoadOutcome, MAX_HISTORY};
use crate::domain::outcome::Outcome;
use crate::domain::ports::KeyValueStore;
use crate::domain::prediction::PredictionResult;
use crate::infrastructure::history_persistence::{DEFAULT_HISTORY_KEY, HistoryPersistence};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub history_capacity: usize,
    pub history_key: String,
    pub export_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: MAX_HISTORY,
            history_key: DEFAULT_HISTORY_KEY.to_string(),
            export_path: PathBuf::from(export::DEFAULT_EXPORT_FILE),
        }
    }
}

pub struct Engine {
    config: EngineConfig,
    history: History,
    persistence: HistoryPersistence,
    dispatcher: PredictionDispatcher,
    alert: Option<Alert>,
    events: broadcast::Sender<EngineEvent>,
}

impl Engine {
    /// New engine with an empty history. Nothing is read from the store yet.
    pub fn create(config: EngineConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            history: History::with_capacity(config.history_capacity),
            persistence: HistoryPersistence::new(store, config.history_key.clone()),
            dispatcher: PredictionDispatcher::new(),
            alert: None,
            events,
            config,
        }
    }

    /// Rehydrates the history from the store and re-evaluates alerts.
    pub fn load_persisted(&mut self) -> LoadOutcome {
        let outcome = self.persistence.load_into(&mut self.history);
        self.publish(EngineEvent::HistoryChanged {
            len: self.history.len(),
        });
        self.refresh_alert();
        outcome
    }

    /// Loads the classifier. Failure leaves the engine without predictions
    /// and is surfaced as a warning.
    pub async fn load_model(&self, loader: &dyn ModelLoader) -> Result<(), EngineError> {
        load_and_publish(&self.dispatcher, loader, &self.events).await
    }

    /// Loads the classifier on a background task so rounds can be recorded
    /// meanwhile.
    pub fn spawn_model_load(
        &self,
        loader: Arc<dyn ModelLoader>,
    ) -> JoinHandle<Result<(), EngineError>> {
        let dispatcher = self.dispatcher.clone();
        let events = self.events.clone();
        tokio::spawn(async move { load_and_publish(&dispatcher, loader.as_ref(), &events).await })
    }

    /// Records a round and returns the prediction request it triggers, if any.
    pub fn submit_outcome(&mut self, outcome: Outcome) -> Option<PredictionRequest> {
        self.history.append(outcome);
        debug!("Round {} recorded: {}", self.history.len(), outcome);

        self.persistence.save(&self.history);
        self.publish(EngineEvent::HistoryChanged {
            len: self.history.len(),
        });
        self.refresh_alert();
        self.predict_current()
    }

    pub fn submit_token(&mut self, token: &str) -> Result<Option<PredictionRequest>, EngineError> {
        let outcome: Outcome = token.parse()?;
        Ok(self.submit_outcome(outcome))
    }

    /// Prediction request for the current history, e.g. right after startup.
    pub fn predict_current(&self) -> Option<PredictionRequest> {
        match self.dispatcher.prepare(&self.history) {
            Ok(request) => request,
            Err(e) => {
                warn!("Skipping prediction: {}", e);
                self.publish(EngineEvent::Warning(e.to_string()));
                None
            }
        }
    }

    /// Runs a request and reports its outcome on the event stream.
    pub async fn complete(&self, request: PredictionRequest) -> Option<PredictionResult> {
        run_and_publish(request, &self.events).await
    }

    /// Clears the whole history. Confirmation is the caller's job.
    pub fn reset_history(&mut self) {
        self.history.reset();
        info!("History reset");

        self.persistence.save(&self.history);
        self.publish(EngineEvent::HistoryChanged { len: 0 });
        self.refresh_alert();
        self.dispatcher.invalidate();
        self.publish(EngineEvent::PredictionCleared);
    }

    pub fn export_history(&self) -> Result<String, EngineError> {
        export::export_csv(&self.history)
    }

    /// Writes the export to `path`, or to the configured export path.
    pub fn export_to_file(&self, path: Option<&Path>) -> Result<PathBuf, EngineError> {
        let path = path.unwrap_or(self.config.export_path.as_path());
        export::write_export(&self.history, path)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn current_alert(&self) -> Option<Alert> {
        self.alert
    }

    pub fn latest_prediction(&self) -> Option<PredictionResult> {
        self.dispatcher.latest()
    }

    pub fn dispatcher_state(&self) -> DispatcherState {
        self.dispatcher.state()
    }

    /// Handle for spawned tasks that need to publish prediction results.
    pub fn event_sender(&self) -> broadcast::Sender<EngineEvent> {
        self.events.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Final save; in-flight predictions are discarded and the event stream
    /// closes once every sender is gone.
    pub fn dispose(self) {
        self.persistence.save(&self.history);
        self.dispatcher.invalidate();
        info!("Engine disposed with {} rounds", self.history.len());
    }

    fn refresh_alert(&mut self) {
        let alert = alerts::evaluate(&self.history);
        if let Some(a) = &alert {
            warn!("Alert: {}", a);
        }
        self.alert = alert;
        self.publish(EngineEvent::AlertChanged(alert));
    }

    fn publish(&self, event: EngineEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

async fn load_and_publish(
    dispatcher: &PredictionDispatcher,
    loader: &dyn ModelLoader,
    events: &broadcast::Sender<EngineEvent>,
) -> Result<(), EngineError> {
    match dispatcher.load_model(loader).await {
        Ok(name) => {
            let _ = events.send(EngineEvent::ModelReady { name });
            Ok(())
        }
        Err(e) => {
            let _ = events.send(EngineEvent::Warning(e.to_string()));
            Err(e)
        }
    }
}

/// Runs a prediction request outside the engine borrow.
///
/// `PredictionReady` is sent while the dispatcher still holds the prediction
/// lock, so subscribers see results in token order and never a stale one.
/// Failures become `Warning` events and never touch the history.
pub async fn run_and_publish(
    request: PredictionRequest,
    events: &broadcast::Sender<EngineEvent>,
) -> Option<PredictionResult> {
    let publish = |result: &PredictionResult| {
        let _ = events.send(EngineEvent::PredictionReady(result.clone()));
    };
    match request.run_then(publish).await {
        Ok(Some(result)) => Some(result),
        Ok(None) => None,
        Err(e) => {
            let _ = events.send(EngineEvent::Warning(e.to_string()));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::{StaticClassifier, StaticModelLoader};
    use crate::infrastructure::persistence::in_memory::InMemoryKeyValueStore;
    use Outcome::*;

    fn engine() -> (Arc<InMemoryKeyValueStore>, Engine) {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let engine = Engine::create(EngineConfig::default(), store.clone());
        (store, engine)
    }

    fn drain(rx: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_submit_persists_and_alerts_in_order() {
        let (store, mut engine) = engine();
        let mut rx = engine.subscribe();

        for _ in 0..4 {
            assert!(engine.submit_outcome(BankerWin).is_none());
        }

        assert_eq!(
            store.get(DEFAULT_HISTORY_KEY).unwrap().as_deref(),
            Some(r#"["B","B","B","B"]"#)
        );
        assert_eq!(
            engine.current_alert().map(|a| a.to_string()).as_deref(),
            Some("4 consecutive identical outcomes.")
        );

        let events = drain(&mut rx);
        assert_eq!(events[0], EngineEvent::HistoryChanged { len: 1 });
        assert_eq!(events[1], EngineEvent::AlertChanged(None));
        assert_eq!(
            events.last(),
            Some(&EngineEvent::AlertChanged(Some(Alert::RepeatedOutcome {
                outcome: BankerWin
            })))
        );
    }

    #[test]
    fn test_model_unavailable_is_a_warning() {
        let (_, mut engine) = engine();
        let mut rx = engine.subscribe();

        for o in [PlayerWin, BankerWin, PlayerWin, BankerWin, PlayerWin] {
            assert!(engine.submit_outcome(o).is_none());
        }
        assert_eq!(engine.history().len(), 5);

        let warnings: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, EngineEvent::Warning(_)))
            .collect();
        assert_eq!(warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_prediction_after_fifth_round() {
        let (_, mut engine) = engine();
        let loader = StaticModelLoader::new(StaticClassifier::new(vec![0.1, 0.7, 0.2]));
        engine.load_model(&loader).await.unwrap();
        assert_eq!(engine.dispatcher_state(), DispatcherState::Ready);

        for o in [PlayerWin, BankerWin, Tie, PlayerWin] {
            assert!(engine.submit_outcome(o).is_none());
        }
        let request = engine.submit_outcome(BankerWin).unwrap();
        let result = engine.complete(request).await.unwrap();

        assert_eq!(result.label, BankerWin);
        assert_eq!(result.confidence, 70.0);
        assert_eq!(engine.latest_prediction(), Some(result));
    }

    #[tokio::test]
    async fn test_prediction_failure_leaves_history_untouched() {
        let (_, mut engine) = engine();
        let loader = StaticModelLoader::new(StaticClassifier::failing("tensor shape mismatch"));
        engine.load_model(&loader).await.unwrap();
        let mut rx = engine.subscribe();

        let mut request = None;
        for o in [Tie, Tie, BankerWin, PlayerWin, PlayerWin] {
            request = engine.submit_outcome(o);
        }
        let before = engine.history().snapshot();
        assert!(engine.complete(request.unwrap()).await.is_none());

        assert_eq!(engine.history().snapshot(), before);
        assert!(engine.latest_prediction().is_none());
        assert!(drain(&mut rx).iter().any(|e| matches!(
            e,
            EngineEvent::Warning(msg) if msg.contains("tensor shape mismatch")
        )));
    }

    #[tokio::test]
    async fn test_reset_clears_history_alert_and_prediction() {
        let (store, mut engine) = engine();
        engine
            .load_model(&StaticModelLoader::new(StaticClassifier::new(vec![0.2, 0.2, 0.6])))
            .await
            .unwrap();

        let mut request = None;
        for _ in 0..6 {
            request = engine.submit_outcome(Tie);
        }
        engine.complete(request.unwrap()).await.unwrap();
        assert!(engine.current_alert().is_some());

        let pending = engine.predict_current().unwrap();
        engine.reset_history();

        assert!(engine.history().is_empty());
        assert!(engine.current_alert().is_none());
        assert!(engine.latest_prediction().is_none());
        assert_eq!(store.get(DEFAULT_HISTORY_KEY).unwrap().as_deref(), Some("[]"));
        assert!(engine.complete(pending).await.is_none());
    }

    #[test]
    fn test_invalid_token_is_rejected_without_mutation() {
        let (_, mut engine) = engine();
        let err = engine.submit_token("X").unwrap_err();
        assert!(matches!(err, EngineError::InvalidOutcome { .. }));
        assert!(engine.history().is_empty());

        assert!(engine.submit_token("tie").unwrap().is_none());
        assert_eq!(engine.history().snapshot(), vec![Tie]);
    }

    #[test]
    fn test_export_empty_and_filled() {
        let (_, mut engine) = engine();
        assert_eq!(engine.export_history(), Err(EngineError::EmptyExport));

        for o in [PlayerWin, BankerWin, Tie] {
            engine.submit_outcome(o);
        }
        assert_eq!(engine.export_history().unwrap(), "1,P\n2,B\n3,T");
    }

    #[test]
    fn test_load_persisted_restores_and_alerts() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        store
            .set(DEFAULT_HISTORY_KEY, r#"["T","P","P","P","P","P","P"]"#)
            .unwrap();

        let mut engine = Engine::create(EngineConfig::default(), store);
        assert_eq!(engine.load_persisted(), LoadOutcome::Restored { len: 7 });
        assert_eq!(
            engine.current_alert(),
            Some(Alert::LongStreak {
                outcome: PlayerWin,
                length: 6
            })
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_predictions_publish_only_the_newest() {
        let (_, mut engine) = engine();
        engine
            .load_model(&StaticModelLoader::new(StaticClassifier::new(vec![0.2, 0.5, 0.3])))
            .await
            .unwrap();
        for _ in 0..5 {
            engine.submit_outcome(PlayerWin);
        }

        let mut rx = engine.subscribe();
        let requests: Vec<_> = (0..16).map(|_| engine.predict_current().unwrap()).collect();
        let newest = requests.iter().map(|r| r.token()).max().unwrap();

        let handles: Vec<_> = requests
            .into_iter()
            .rev()
            .map(|request| {
                let events = engine.event_sender();
                tokio::spawn(async move { run_and_publish(request, &events).await })
            })
            .collect();
        let mut visible = Vec::new();
        for handle in handles {
            if let Some(result) = handle.await.unwrap() {
                visible.push(result.token);
            }
        }

        assert_eq!(visible, vec![newest]);
        let published: Vec<u64> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::PredictionReady(r) => Some(r.token),
                _ => None,
            })
            .collect();
        assert_eq!(published, vec![newest]);
        assert_eq!(engine.latest_prediction().map(|r| r.token), Some(newest));
    }
}
