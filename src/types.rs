//! Core types for the gesture-dj engine
//!
//! This module defines the data that flows through the engine: landmarks and
//! validated hand observations coming in, gestures and gesture events going out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::GestureError;

/// Number of landmarks the estimator reports per hand
pub const LANDMARK_COUNT: usize = 21;

/// Wrist landmark index
pub const WRIST: usize = 0;
/// Thumb tip landmark index
pub const THUMB_TIP: usize = 4;
/// Index finger tip landmark index
pub const INDEX_TIP: usize = 8;
/// Middle finger tip landmark index
pub const MIDDLE_TIP: usize = 12;
/// Ring finger tip landmark index
pub const RING_TIP: usize = 16;
/// Pinky tip landmark index
pub const PINKY_TIP: usize = 20;

/// All five fingertips, thumb first
pub const FINGERTIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

/// A normalized 2D image point; (0, 0) is the top-left corner of the frame.
///
/// A `null` or missing coordinate on the wire reads as NaN, so the hand is
/// rejected by [`HandObservation::from_landmarks`] instead of failing the parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    #[serde(default = "missing_coordinate", deserialize_with = "coordinate")]
    pub x: f64,
    #[serde(default = "missing_coordinate", deserialize_with = "coordinate")]
    pub y: f64,
}

fn missing_coordinate() -> f64 {
    f64::NAN
}

fn coordinate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl Landmark {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Landmark) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Point halfway between this one and `other`
    pub fn midpoint(&self, other: &Landmark) -> Landmark {
        Landmark::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One detected hand in one frame, validated to hold exactly
/// [`LANDMARK_COUNT`] finite landmarks in anatomical order.
#[derive(Debug, Clone, PartialEq)]
pub struct HandObservation {
    landmarks: [Landmark; LANDMARK_COUNT],
}

impl HandObservation {
    /// Validate a raw landmark list reported by the estimator
    pub fn from_landmarks(raw: &[Landmark]) -> Result<Self, GestureError> {
        let landmarks: [Landmark; LANDMARK_COUNT] = raw.try_into().map_err(|_| {
            GestureError::MalformedObservation(format!(
                "expected {} landmarks, got {}",
                LANDMARK_COUNT,
                raw.len()
            ))
        })?;

        if let Some(index) = landmarks.iter().position(|l| !l.is_finite()) {
            return Err(GestureError::MalformedObservation(format!(
                "landmark {} has a non-finite coordinate",
                index
            )));
        }

        Ok(Self { landmarks })
    }

    pub fn landmark(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }

    pub fn landmarks(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.landmarks
    }

    pub fn wrist(&self) -> Landmark {
        self.landmarks[WRIST]
    }

    pub fn thumb_tip(&self) -> Landmark {
        self.landmarks[THUMB_TIP]
    }

    /// Tracking point for motion analysis: midpoint of wrist and thumb tip.
    /// Blending the two damps jitter from either point alone.
    pub fn reference_point(&self) -> Landmark {
        self.wrist().midpoint(&self.thumb_tip())
    }

    /// Fingertip landmarks, thumb first
    pub fn fingertips(&self) -> impl Iterator<Item = &Landmark> + '_ {
        FINGERTIPS.iter().map(move |&i| &self.landmarks[i])
    }
}

impl TryFrom<&[Landmark]> for HandObservation {
    type Error = GestureError;

    fn try_from(raw: &[Landmark]) -> Result<Self, Self::Error> {
        Self::from_landmarks(raw)
    }
}

/// Discrete control gestures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gesture {
    Play,
    Pause,
    SwipeLeft,
    SwipeRight,
    VolumeUp,
    VolumeDown,
    Quit,
}

impl Gesture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gesture::Play => "play",
            Gesture::Pause => "pause",
            Gesture::SwipeLeft => "swipe_left",
            Gesture::SwipeRight => "swipe_right",
            Gesture::VolumeUp => "volume_up",
            Gesture::VolumeDown => "volume_down",
            Gesture::Quit => "quit",
        }
    }

    pub fn category(&self) -> GestureCategory {
        match self {
            Gesture::SwipeLeft | Gesture::SwipeRight | Gesture::VolumeUp | Gesture::VolumeDown => {
                GestureCategory::Motion
            }
            Gesture::Play | Gesture::Pause => GestureCategory::Pose,
            Gesture::Quit => GestureCategory::Quit,
        }
    }
}

impl std::fmt::Display for Gesture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gesture families; each motion-bearing family has its own cooldown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureCategory {
    /// Swipes and vertical pans, derived from the motion window
    Motion,
    /// Held hand shapes (open palm, closed fist)
    Pose,
    /// Two raised hands
    Quit,
}

/// One processed video frame as reported by the landmark estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// Capture time of the frame
    pub timestamp: DateTime<Utc>,
    /// Raw landmark lists, one per detected hand. Validated by the classifier.
    #[serde(default)]
    pub hands: Vec<Vec<Landmark>>,
}

/// A gesture detected by the frame pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureEvent {
    /// Processing session the event belongs to
    pub session_id: Uuid,
    /// Zero-based index of the frame in the input stream (skipped frames included)
    pub frame_index: u64,
    /// Capture time of the frame that produced the gesture
    pub timestamp: DateTime<Utc>,
    pub gesture: Gesture,
    pub category: GestureCategory,
}
