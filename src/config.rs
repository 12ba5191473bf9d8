//! Engine configuration
//!
//! Every threshold the classifier uses lives here as a named field. The
//! distances, ratios and cooldowns are empirically tuned and can be overridden
//! from a partial JSON document; unspecified fields keep their defaults.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::GestureError;

/// Default motion window capacity (samples)
pub const DEFAULT_WINDOW_SIZE: usize = 3;

/// Default minimum number of samples before motion gestures are considered
pub const DEFAULT_MIN_SWIPE_FRAMES: usize = 3;

/// Largest accepted motion window capacity (samples)
pub const MAX_WINDOW_SIZE: usize = 1024;

/// Default cooldown after any gesture before a motion gesture may fire (seconds)
pub const DEFAULT_GESTURE_COOLDOWN_SECS: f64 = 0.3;

/// Default cooldown after any gesture before a pose gesture may fire (seconds)
pub const DEFAULT_PLAY_PAUSE_COOLDOWN_SECS: f64 = 2.0;

/// Classifier thresholds and cooldowns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Motion window capacity
    pub window_size: usize,
    /// Samples required before swipe / pan tests run
    pub min_swipe_frames: usize,
    /// Cooldown applied to swipes and volume pans (seconds)
    pub gesture_cooldown_secs: f64,
    /// Cooldown applied to play / pause (seconds)
    pub play_pause_cooldown_secs: f64,
    /// Minimum |net_x| for a swipe
    pub swipe_min_distance: f64,
    /// Maximum |net_y / net_x| for a swipe
    pub swipe_max_ratio: f64,
    /// |net_x| at or below which the swipe ratio is taken as zero
    pub ratio_epsilon: f64,
    /// |net_y| must exceed |net_x| times this factor for a volume pan
    pub vertical_dominance: f64,
    /// Minimum |net_y| for a volume pan
    pub vertical_min_distance: f64,
    /// Mean wrist-to-fingertip distance above which the hand is an open palm
    pub open_palm_spread: f64,
    /// Mean wrist-to-fingertip distance below which the hand is a closed fist
    pub closed_fist_spread: f64,
    /// Both wrists above this height (normalized y) means quit
    pub quit_wrist_height: f64,
    /// Emit a motion debug line every N evaluations (0 disables)
    pub debug_log_interval: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            min_swipe_frames: DEFAULT_MIN_SWIPE_FRAMES,
            gesture_cooldown_secs: DEFAULT_GESTURE_COOLDOWN_SECS,
            play_pause_cooldown_secs: DEFAULT_PLAY_PAUSE_COOLDOWN_SECS,
            swipe_min_distance: 0.08,
            swipe_max_ratio: 0.5,
            ratio_epsilon: 1e-3,
            vertical_dominance: 1.5,
            vertical_min_distance: 0.08,
            open_palm_spread: 0.12,
            closed_fist_spread: 0.06,
            quit_wrist_height: 0.3,
            debug_log_interval: 10,
        }
    }
}

impl ClassifierConfig {
    /// Load a configuration from JSON, filling unspecified fields with defaults
    pub fn from_json(json: &str) -> Result<Self, GestureError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty JSON
    pub fn to_json_pretty(&self) -> Result<String, GestureError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject configurations that would classify silently wrong
    pub fn validate(&self) -> Result<(), GestureError> {
        if self.min_swipe_frames < 2 {
            return Err(invalid(format!(
                "min_swipe_frames must be at least 2, got {}",
                self.min_swipe_frames
            )));
        }
        if self.window_size < self.min_swipe_frames {
            return Err(invalid(format!(
                "window_size ({}) must be >= min_swipe_frames ({})",
                self.window_size, self.min_swipe_frames
            )));
        }
        if self.window_size > MAX_WINDOW_SIZE {
            return Err(invalid(format!(
                "window_size must be at most {}, got {}",
                MAX_WINDOW_SIZE, self.window_size
            )));
        }

        let non_negative = [
            ("gesture_cooldown_secs", self.gesture_cooldown_secs),
            ("play_pause_cooldown_secs", self.play_pause_cooldown_secs),
            ("swipe_min_distance", self.swipe_min_distance),
            ("swipe_max_ratio", self.swipe_max_ratio),
            ("ratio_epsilon", self.ratio_epsilon),
            ("vertical_dominance", self.vertical_dominance),
            ("vertical_min_distance", self.vertical_min_distance),
            ("open_palm_spread", self.open_palm_spread),
            ("closed_fist_spread", self.closed_fist_spread),
            ("quit_wrist_height", self.quit_wrist_height),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }

        if self.closed_fist_spread > self.open_palm_spread {
            return Err(invalid(format!(
                "closed_fist_spread ({}) must not exceed open_palm_spread ({})",
                self.closed_fist_spread, self.open_palm_spread
            )));
        }

        Ok(())
    }

    pub fn gesture_cooldown(&self) -> Duration {
        secs_to_duration(self.gesture_cooldown_secs)
    }

    pub fn play_pause_cooldown(&self) -> Duration {
        secs_to_duration(self.play_pause_cooldown_secs)
    }
}

/// Frame pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(flatten)]
    pub classifier: ClassifierConfig,
    /// Classify only every Nth frame (1 = every frame)
    #[serde(default = "default_frame_stride")]
    pub process_every_n_frames: u32,
}

fn default_frame_stride() -> u32 {
    1
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            process_every_n_frames: default_frame_stride(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self, GestureError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GestureError> {
        if self.process_every_n_frames == 0 {
            return Err(invalid("process_every_n_frames must be at least 1".to_string()));
        }
        self.classifier.validate()
    }
}

fn invalid(message: String) -> GestureError {
    GestureError::InvalidConfig(message)
}

/// Convert validated, finite seconds to a chrono duration (microsecond precision)
pub(crate) fn secs_to_duration(secs: f64) -> Duration {
    Duration::microseconds((secs * 1_000_000.0).round() as i64)
}
