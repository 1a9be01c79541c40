// Round pipeline orchestration
pub mod engine;

// Notifications for the presentation layer
pub mod events;

// History export
pub mod export;

// Classifier seam and prediction dispatch
pub mod ml;
