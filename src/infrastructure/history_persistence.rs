use crate::domain::errors::EngineError;
use crate::domain::history::{History, LoadOutcome};
use crate::domain::ports::KeyValueStore;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Key the history has always been stored under.
pub const DEFAULT_HISTORY_KEY: &str = "bcr_history_v1";

/// Saves and restores the round history as a JSON array of tokens.
pub struct HistoryPersistence {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl HistoryPersistence {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Best-effort write; failures are logged and swallowed.
    pub fn save(&self, history: &History) {
        let content = match serde_json::to_string(&history.snapshot()) {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to serialize history: {}", e);
                return;
            }
        };

        if let Err(e) = self.store.set(&self.key, &content) {
            error!("Failed to persist history under '{}': {:#}", self.key, e);
        } else {
            debug!("Persisted {} rounds under '{}'", history.len(), self.key);
        }
    }

    /// Restores into `history`. Missing or corrupt state leaves it empty.
    pub fn load_into(&self, history: &mut History) -> LoadOutcome {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No persisted history under '{}'", self.key);
                history.reset();
                return LoadOutcome::Missing;
            }
            Err(e) => {
                history.reset();
                return self.recovered(EngineError::CorruptPersistedState {
                    reason: format!("store read failed: {:#}", e),
                });
            }
        };

        let value = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(v) => v,
            Err(e) => {
                history.reset();
                return self.recovered(EngineError::CorruptPersistedState {
                    reason: format!("malformed JSON: {}", e),
                });
            }
        };

        match history.load_from(value) {
            LoadOutcome::Recovered(e) => self.recovered(e),
            restored => {
                info!("Restored {} rounds from '{}'", history.len(), self.key);
                restored
            }
        }
    }

    pub fn load(&self, capacity: usize) -> History {
        let mut history = History::with_capacity(capacity);
        self.load_into(&mut history);
        history
    }

    fn recovered(&self, e: EngineError) -> LoadOutcome {
        warn!(
            recovery = "empty_history",
            "Discarding persisted history under '{}': {}", self.key, e
        );
        LoadOutcome::Recovered(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::outcome::Outcome::*;
    use crate::infrastructure::persistence::in_memory::InMemoryKeyValueStore;

    fn persistence() -> (Arc<InMemoryKeyValueStore>, HistoryPersistence) {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let persistence = HistoryPersistence::new(store.clone(), DEFAULT_HISTORY_KEY);
        (store, persistence)
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let (store, persistence) = persistence();
        let mut history = History::new();
        for o in [PlayerWin, PlayerWin, Tie, BankerWin] {
            history.append(o);
        }

        persistence.save(&history);
        assert_eq!(
            store.get(DEFAULT_HISTORY_KEY).unwrap().as_deref(),
            Some(r#"["P","P","T","B"]"#)
        );

        let loaded = persistence.load(200);
        assert_eq!(loaded.snapshot(), history.snapshot());
    }

    #[test]
    fn test_missing_key_is_empty() {
        let (_, persistence) = persistence();
        let mut history = History::new();
        history.append(Tie);
        assert_eq!(persistence.load_into(&mut history), LoadOutcome::Missing);
        assert!(history.is_empty());
    }

    #[test]
    fn test_corrupt_values_recover_to_empty() {
        let (store, persistence) = persistence();

        for raw in ["{not json", r#"{"a":1}"#, r#""PBT""#, r#"["P", null]"#] {
            store.set(DEFAULT_HISTORY_KEY, raw).unwrap();
            let mut history = History::new();
            history.append(BankerWin);
            let outcome = persistence.load_into(&mut history);
            assert!(
                matches!(
                    outcome,
                    LoadOutcome::Recovered(EngineError::CorruptPersistedState { .. })
                ),
                "{} should be treated as corrupt",
                raw
            );
            assert!(history.is_empty());
        }
    }
}
