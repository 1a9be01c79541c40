use crate::domain::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Result of a single round.
///
/// Serialized as the single-letter tokens `"P"`, `"B"` and `"T"`; that is the
/// persisted format and the export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "P")]
    PlayerWin,
    #[serde(rename = "B")]
    BankerWin,
    #[serde(rename = "T")]
    Tie,
}

impl Outcome {
    /// Fixed class order shared by the codec and the classifier output.
    pub const ALL: [Outcome; 3] = [Outcome::PlayerWin, Outcome::BankerWin, Outcome::Tie];

    pub fn token(self) -> &'static str {
        match self {
            Outcome::PlayerWin => "P",
            Outcome::BankerWin => "B",
            Outcome::Tie => "T",
        }
    }

    /// Strict token parsing, exact `P`/`B`/`T` only.
    pub fn parse_token(token: &str) -> Option<Self> {
        match token {
            "P" => Some(Outcome::PlayerWin),
            "B" => Some(Outcome::BankerWin),
            "T" => Some(Outcome::Tie),
            _ => None,
        }
    }

    pub fn class_index(self) -> usize {
        match self {
            Outcome::PlayerWin => 0,
            Outcome::BankerWin => 1,
            Outcome::Tie => 2,
        }
    }

    pub fn from_class_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

impl FromStr for Outcome {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "p" | "player" => Ok(Outcome::PlayerWin),
            "b" | "banker" => Ok(Outcome::BankerWin),
            "t" | "tie" => Ok(Outcome::Tie),
            _ => Err(EngineError::InvalidOutcome {
                token: s.to_string(),
            }),
        }
    }
}
