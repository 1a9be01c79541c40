use anyhow::Result;

/// Blob key/value store the round history is persisted to.
///
/// Synchronous and best-effort: a write either lands or returns an error the
/// caller is free to ignore.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}
