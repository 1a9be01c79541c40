use crate::domain::history::History;
use crate::domain::outcome::Outcome;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identical trailing rounds that trigger the repeat warning.
pub const REPEAT_THRESHOLD: usize = 4;

/// Trailing run length reported as a long streak.
pub const LONG_STREAK_THRESHOLD: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alert {
    RepeatedOutcome { outcome: Outcome },
    LongStreak { outcome: Outcome, length: usize },
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alert::RepeatedOutcome { .. } => {
                write!(f, "{} consecutive identical outcomes.", REPEAT_THRESHOLD)
            }
            Alert::LongStreak { outcome, length } => {
                write!(f, "Long streak: {} consecutive {} outcomes.", length, outcome)
            }
        }
    }
}

/// The maximal run of identical rounds ending at the most recent one.
pub fn trailing_run(history: &History) -> Option<(Outcome, usize)> {
    let last = history.last()?;
    let length = history.iter().rev().take_while(|o| **o == last).count();
    Some((last, length))
}

/// Evaluates the alert rules against the current history.
///
/// Recomputed from scratch on every mutation; `None` clears any earlier alert.
/// A run that already qualifies as a long streak is reported with its length
/// rather than as a plain repeat.
pub fn evaluate(history: &History) -> Option<Alert> {
    let (outcome, length) = trailing_run(history)?;

    if history.len() >= LONG_STREAK_THRESHOLD && length >= LONG_STREAK_THRESHOLD {
        return Some(Alert::LongStreak { outcome, length });
    }
    if length >= REPEAT_THRESHOLD {
        return Some(Alert::RepeatedOutcome { outcome });
    }
    None
}
