pub mod history_persistence;
pub mod mock;
pub mod persistence;

pub use history_persistence::HistoryPersistence;
pub use persistence::{FileKeyValueStore, InMemoryKeyValueStore};
