//! Static hand-shape heuristics

use serde::{Deserialize, Serialize};

use crate::config::ClassifierConfig;
use crate::types::{HandObservation, FINGERTIPS};

/// Recognized static hand shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandPose {
    /// Fingers extended away from the wrist
    OpenPalm,
    /// Fingertips curled in close to the wrist
    ClosedFist,
}

/// Mean Euclidean distance from the wrist to each of the five fingertips
pub fn fingertip_spread(hand: &HandObservation) -> f64 {
    let wrist = hand.wrist();
    let total: f64 = hand.fingertips().map(|tip| tip.distance(&wrist)).sum();
    total / FINGERTIPS.len() as f64
}

/// Classify the hand shape, if it clears either spread threshold
pub fn classify_pose(hand: &HandObservation, config: &ClassifierConfig) -> Option<HandPose> {
    let spread = fingertip_spread(hand);
    if spread > config.open_palm_spread {
        Some(HandPose::OpenPalm)
    } else if spread < config.closed_fist_spread {
        Some(HandPose::ClosedFist)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Landmark, LANDMARK_COUNT, WRIST};

    /// Hand with every fingertip `spread` below the wrist
    fn hand_with_spread(spread: f64) -> HandObservation {
        let wrist = Landmark::new(0.5, 0.5);
        let mut raw = vec![wrist; LANDMARK_COUNT];
        for tip in FINGERTIPS {
            raw[tip] = Landmark::new(wrist.x, wrist.y - spread);
        }
        raw[WRIST] = wrist;
        HandObservation::from_landmarks(&raw).unwrap()
    }

    #[test]
    fn test_spread_is_mean_tip_distance() {
        let wrist = Landmark::new(0.5, 0.5);
        let mut raw = vec![wrist; LANDMARK_COUNT];
        raw[4] = Landmark::new(0.6, 0.5);
        raw[8] = Landmark::new(0.5, 0.3);
        let hand = HandObservation::from_landmarks(&raw).unwrap();

        // (0.1 + 0.2 + 0 + 0 + 0) / 5
        assert!((fingertip_spread(&hand) - 0.06).abs() < 1e-9);
    }

    #[test]
    fn test_open_palm() {
        let config = ClassifierConfig::default();
        assert_eq!(classify_pose(&hand_with_spread(0.15), &config), Some(HandPose::OpenPalm));
    }

    #[test]
    fn test_closed_fist() {
        let config = ClassifierConfig::default();
        assert_eq!(classify_pose(&hand_with_spread(0.04), &config), Some(HandPose::ClosedFist));
    }

    #[test]
    fn test_neutral_hand() {
        let config = ClassifierConfig::default();
        assert_eq!(classify_pose(&hand_with_spread(0.09), &config), None);
    }
}
