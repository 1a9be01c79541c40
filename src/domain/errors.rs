use thiserror::Error;

/// Errors surfaced by the round-history engine.
///
/// None of these are fatal: callers either recover with a default or show
/// the message as a transient warning.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    #[error("Prediction failed: {reason}")]
    PredictionFailure { reason: String },

    #[error("Corrupt persisted history: {reason}")]
    CorruptPersistedState { reason: String },

    #[error("No history to export")]
    EmptyExport,

    #[error("Invalid outcome token: {token:?}")]
    InvalidOutcome { token: String },

    #[error("Export failed: {reason}")]
    Export { reason: String },
}
