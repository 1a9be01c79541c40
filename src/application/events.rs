use crate::domain::alerts::Alert;
use crate::domain::prediction::PredictionResult;
use std::fmt;

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    HistoryChanged { len: usize },
    AlertChanged(Option<Alert>),
    PredictionReady(PredictionResult),
    PredictionCleared,
    ModelReady { name: String },
    Warning(String),
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineEvent::HistoryChanged { len } => write!(f, "history: {} rounds", len),
            EngineEvent::AlertChanged(Some(alert)) => write!(f, "alert: {}", alert),
            EngineEvent::AlertChanged(None) => write!(f, "alert cleared"),
            EngineEvent::PredictionReady(result) => write!(
                f,
                "prediction: {} ({})",
                result.label,
                result.confidence_label()
            ),
            EngineEvent::PredictionCleared => write!(f, "prediction cleared"),
            EngineEvent::ModelReady { name } => write!(f, "model ready: {}", name),
            EngineEvent::Warning(msg) => write!(f, "warning: {}", msg),
        }
    }
}
