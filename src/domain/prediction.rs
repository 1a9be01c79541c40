use crate::domain::errors::EngineError;
use crate::domain::outcome::Outcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Most likely next outcome and its probability as a percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: Outcome,
    /// Percentage in `[0, 100]`, rounded to two decimals.
    pub confidence: f64,
    /// Request token this result answers.
    pub token: u64,
    pub produced_at: DateTime<Utc>,
}

impl PredictionResult {
    /// Normalizes a classifier output in class order `[P, B, T]`.
    ///
    /// On equal maxima the lowest class index wins.
    pub fn from_probabilities(probabilities: &[f64], token: u64) -> Result<Self, EngineError> {
        if probabilities.len() != Outcome::ALL.len() {
            return Err(EngineError::PredictionFailure {
                reason: format!(
                    "expected {} probabilities, got {}",
                    Outcome::ALL.len(),
                    probabilities.len()
                ),
            });
        }
        if let Some(bad) = probabilities
            .iter()
            .find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0)
        {
            return Err(EngineError::PredictionFailure {
                reason: format!("probability out of range: {}", bad),
            });
        }

        let mut best = 0;
        for (i, p) in probabilities.iter().enumerate().skip(1) {
            if *p > probabilities[best] {
                best = i;
            }
        }

        let label = Outcome::from_class_index(best).ok_or_else(|| EngineError::PredictionFailure {
            reason: format!("class index {} out of range", best),
        })?;

        Ok(Self {
            label,
            confidence: round_to_cents(probabilities[best] * 100.0),
            token,
            produced_at: Utc::now(),
        })
    }

    /// Confidence as shown to the user, e.g. `70.00%`.
    pub fn confidence_label(&self) -> String {
        format!("{:.2}%", self.confidence)
    }
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_and_confidence() {
        let result = PredictionResult::from_probabilities(&[0.1, 0.7, 0.2], 1).unwrap();
        assert_eq!(result.label, Outcome::BankerWin);
        assert_eq!(result.confidence, 70.0);
        assert_eq!(result.confidence_label(), "70.00%");
        assert_eq!(result.token, 1);
    }

    #[test]
    fn test_f32_sourced_probabilities_round_cleanly() {
        let probs: Vec<f64> = [0.1f32, 0.7, 0.2].iter().map(|p| *p as f64).collect();
        let result = PredictionResult::from_probabilities(&probs, 1).unwrap();
        assert_eq!(result.confidence, 70.0);

        let result = PredictionResult::from_probabilities(&[0.123456, 0.5, 0.376544], 1).unwrap();
        assert_eq!(result.confidence, 50.0);
        let result = PredictionResult::from_probabilities(&[0.456789, 0.3, 0.243211], 1).unwrap();
        assert_eq!(result.confidence, 45.68);
    }

    #[test]
    fn test_tie_break_lowest_index_wins() {
        let result = PredictionResult::from_probabilities(&[0.2, 0.4, 0.4], 1).unwrap();
        assert_eq!(result.label, Outcome::BankerWin);

        let result = PredictionResult::from_probabilities(&[0.4, 0.2, 0.4], 1).unwrap();
        assert_eq!(result.label, Outcome::PlayerWin);
    }

    #[test]
    fn test_malformed_output_is_rejected() {
        assert!(matches!(
            PredictionResult::from_probabilities(&[0.5, 0.5], 1),
            Err(EngineError::PredictionFailure { .. })
        ));
        assert!(PredictionResult::from_probabilities(&[f64::NAN, 0.5, 0.5], 1).is_err());
        assert!(PredictionResult::from_probabilities(&[-0.1, 0.6, 0.5], 1).is_err());
        assert!(PredictionResult::from_probabilities(&[1.5, 0.0, 0.0], 1).is_err());
    }
}
