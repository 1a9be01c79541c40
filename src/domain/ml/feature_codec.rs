use crate::domain::outcome::Outcome;

/// Number of most recent outcomes fed to the classifier.
pub const WINDOW_SIZE: usize = 5;

/// Width of one encoded outcome.
pub const ENCODING_WIDTH: usize = 3;

/// Length of the classifier input.
pub const FEATURE_LEN: usize = WINDOW_SIZE * ENCODING_WIDTH;

/// Ordered list of feature names, oldest round of the window first.
/// This order MUST match the order used when the model was trained.
pub const FEATURE_NAMES: &[&str] = &[
    "t-4_player",
    "t-4_banker",
    "t-4_tie",
    "t-3_player",
    "t-3_banker",
    "t-3_tie",
    "t-2_player",
    "t-2_banker",
    "t-2_tie",
    "t-1_player",
    "t-1_banker",
    "t-1_tie",
    "t0_player",
    "t0_banker",
    "t0_tie",
];

/// Flat numeric input for the classifier.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

/// One-hot encoding in class order `[P, B, T]`.
pub fn encode(outcome: Outcome) -> [f32; ENCODING_WIDTH] {
    let mut encoded = [0.0; ENCODING_WIDTH];
    encoded[outcome.class_index()] = 1.0;
    encoded
}

/// Inverse of `encode`. Anything but an exact one-hot vector, including the
/// all-zero encoding of an unknown token, decodes to `None`.
pub fn decode(encoded: &[f32; ENCODING_WIDTH]) -> Option<Outcome> {
    let mut hot = None;
    for (index, value) in encoded.iter().enumerate() {
        if *value == 1.0 {
            if hot.is_some() {
                return None;
            }
            hot = Some(index);
        } else if *value != 0.0 {
            return None;
        }
    }
    hot.and_then(Outcome::from_class_index)
}

/// Encodes a raw token. Unknown tokens encode to all zeros.
pub fn encode_token(token: &str) -> [f32; ENCODING_WIDTH] {
    Outcome::parse_token(token)
        .map(encode)
        .unwrap_or([0.0; ENCODING_WIDTH])
}

/// Concatenates the encoding of every outcome in order.
/// Any length is accepted; the dispatcher is the one that enforces `WINDOW_SIZE`.
pub fn encode_window(outcomes: &[Outcome]) -> FeatureVector {
    FeatureVector(outcomes.iter().flat_map(|o| encode(*o)).collect())
}

pub fn encode_token_window(tokens: &[&str]) -> FeatureVector {
    FeatureVector(tokens.iter().flat_map(|t| encode_token(t)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use Outcome::*;

    #[test]
    fn test_feature_names_length() {
        assert_eq!(FEATURE_NAMES.len(), FEATURE_LEN);
    }

    #[test]
    fn test_encode_is_one_hot() {
        assert_eq!(encode(PlayerWin), [1.0, 0.0, 0.0]);
        assert_eq!(encode(BankerWin), [0.0, 1.0, 0.0]);
        assert_eq!(encode(Tie), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_decode_inverts_encode() {
        for outcome in Outcome::ALL {
            assert_eq!(decode(&encode(outcome)), Some(outcome));
        }
    }

    #[test]
    fn test_decode_rejects_non_one_hot() {
        assert_eq!(decode(&encode_token("X")), None);
        assert_eq!(decode(&[1.0, 1.0, 0.0]), None);
        assert_eq!(decode(&[0.0, 0.5, 0.0]), None);
        assert_eq!(decode(&[0.0, 1.0, f32::NAN]), None);
    }

    #[test]
    fn test_unknown_token_degrades_to_zeros() {
        assert_eq!(encode_token("X"), [0.0, 0.0, 0.0]);
        assert_eq!(encode_token(""), [0.0, 0.0, 0.0]);
        assert_eq!(encode_token("B"), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_window_is_chronological() {
        let fv = encode_window(&[PlayerWin, BankerWin, Tie, BankerWin, PlayerWin]);
        assert_eq!(fv.len(), FEATURE_LEN);
        assert_eq!(
            fv.as_slice(),
            &[
                1.0, 0.0, 0.0, // oldest
                0.0, 1.0, 0.0, //
                0.0, 0.0, 1.0, //
                0.0, 1.0, 0.0, //
                1.0, 0.0, 0.0, // most recent
            ]
        );
    }

    #[test]
    fn test_window_tolerates_any_length() {
        assert!(encode_window(&[]).is_empty());
        assert_eq!(encode_window(&[Tie, Tie]).len(), 6);
        assert_eq!(encode_token_window(&["P", "?", "T"]).as_slice()[3..6], [0.0f32; 3]);
    }
}
