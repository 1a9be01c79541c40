// Round results
pub mod outcome;

// Bounded round history
pub mod history;

// Streak detection
pub mod alerts;

// Classifier output normalization
pub mod prediction;

// Feature encoding for the classifier
pub mod ml;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
