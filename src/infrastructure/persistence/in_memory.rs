//! In-memory key/value store.
//!
//! Data is lost on restart; suitable for tests and throwaway sessions.

use crate::domain::ports::KeyValueStore;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(match self.entries.read() {
            Ok(guard) => guard.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        match self.entries.write() {
            Ok(mut guard) => {
                guard.insert(key.to_string(), value.to_string());
            }
            Err(poisoned) => {
                tracing::error!("InMemoryKeyValueStore: Lock poisoned during write, recovering");
                poisoned
                    .into_inner()
                    .insert(key.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entries.write() {
            Ok(mut guard) => {
                guard.remove(key);
            }
            Err(poisoned) => {
                poisoned.into_inner().remove(key);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_and_remove() {
        let store = InMemoryKeyValueStore::new();
        assert!(store.is_empty());

        store.set("k", "1").unwrap();
        store.set("k", "2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("2"));
        assert_eq!(store.len(), 1);

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
