//! Bounded round history.
//!
//! The history is the only record of what happened at the table. It is
//! append-only with FIFO eviction: once `capacity` rounds are stored, every
//! new round pushes the oldest one out.

use crate::domain::errors::EngineError;
use crate::domain::outcome::Outcome;
use serde_json::Value;
use std::collections::VecDeque;

/// Default number of rounds kept.
pub const MAX_HISTORY: usize = 200;

/// How a rehydration went.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Stored value was valid; `len` rounds were restored.
    Restored { len: usize },
    /// Nothing was stored.
    Missing,
    /// Stored value could not be used; history was reset to empty.
    Recovered(EngineError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct History {
    rounds: VecDeque<Outcome>,
    capacity: usize,
}

impl History {
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            rounds: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// Appends a round, evicting from the front while over capacity.
    pub fn append(&mut self, outcome: Outcome) {
        self.rounds.push_back(outcome);
        while self.rounds.len() > self.capacity {
            self.rounds.pop_front();
        }
    }

    pub fn reset(&mut self) {
        self.rounds.clear();
    }

    /// Ordered copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Outcome> {
        self.rounds.iter().copied().collect()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Outcome> + '_ {
        self.rounds.iter()
    }

    pub fn last(&self) -> Option<Outcome> {
        self.rounds.back().copied()
    }

    /// The last `n` rounds in chronological order (fewer if history is shorter).
    pub fn last_n(&self, n: usize) -> Vec<Outcome> {
        let skip = self.rounds.len().saturating_sub(n);
        self.rounds.iter().skip(skip).copied().collect()
    }

    /// Rounds shown by the rendering surface.
    pub fn recent(&self, n: usize) -> Vec<Outcome> {
        self.last_n(n)
    }

    /// Replaces the contents wholesale, keeping the most recent `capacity` rounds.
    pub fn replace(&mut self, outcomes: Vec<Outcome>) {
        self.rounds.clear();
        for outcome in outcomes {
            self.append(outcome);
        }
    }

    /// Replaces the contents from a decoded JSON value.
    ///
    /// Anything other than an array of outcome tokens leaves the history empty
    /// and reports `LoadOutcome::Recovered`.
    pub fn load_from(&mut self, value: Value) -> LoadOutcome {
        match decode_rounds(value) {
            Ok(outcomes) => {
                self.replace(outcomes);
                LoadOutcome::Restored { len: self.len() }
            }
            Err(e) => {
                self.reset();
                LoadOutcome::Recovered(e)
            }
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_rounds(value: Value) -> Result<Vec<Outcome>, EngineError> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(EngineError::CorruptPersistedState {
                reason: format!("expected an array, found {}", json_kind(&other)),
            });
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_str()
                .and_then(Outcome::parse_token)
                .ok_or_else(|| EngineError::CorruptPersistedState {
                    reason: format!("entry {} is not an outcome token: {}", i, item),
                })
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
