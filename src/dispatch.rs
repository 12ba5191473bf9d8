//! Gesture to media-action dispatch
//!
//! Maps detected gestures onto player actions and applies them to a
//! [`MediaController`]. The dispatcher keeps its own repeat throttle, separate
//! from the classifier cooldowns: the classifier governs detection, the
//! dispatcher governs how often the player is poked with the same command.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::secs_to_duration;
use crate::error::GestureError;
use crate::types::Gesture;

/// Default window in which an identical gesture is dropped (seconds)
pub const DEFAULT_REPEAT_COOLDOWN_SECS: f64 = 1.0;

/// Volume change per volume gesture (percent)
pub const VOLUME_STEP: u8 = 10;

/// Starting volume for a fresh player (percent)
pub const DEFAULT_VOLUME: u8 = 50;

/// Player commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaAction {
    Play,
    Pause,
    NextTrack,
    PreviousTrack,
    VolumeUp,
    VolumeDown,
    Quit,
}

impl MediaAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaAction::Play => "play",
            MediaAction::Pause => "pause",
            MediaAction::NextTrack => "next_track",
            MediaAction::PreviousTrack => "previous_track",
            MediaAction::VolumeUp => "volume_up",
            MediaAction::VolumeDown => "volume_down",
            MediaAction::Quit => "quit",
        }
    }
}

impl From<Gesture> for MediaAction {
    fn from(gesture: Gesture) -> Self {
        match gesture {
            Gesture::Play => MediaAction::Play,
            Gesture::Pause => MediaAction::Pause,
            Gesture::SwipeRight => MediaAction::NextTrack,
            Gesture::SwipeLeft => MediaAction::PreviousTrack,
            Gesture::VolumeUp => MediaAction::VolumeUp,
            Gesture::VolumeDown => MediaAction::VolumeDown,
            Gesture::Quit => MediaAction::Quit,
        }
    }
}

/// Something that can carry out player commands
pub trait MediaController {
    fn apply(&mut self, action: MediaAction) -> Result<(), GestureError>;
}

/// In-memory player model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalPlayer {
    pub is_playing: bool,
    /// Volume in percent, 0..=100
    pub volume: u8,
    /// Position in the play queue
    pub track_index: u32,
    /// Set once a quit action has been applied
    pub stopped: bool,
}

impl Default for LocalPlayer {
    fn default() -> Self {
        Self {
            is_playing: false,
            volume: DEFAULT_VOLUME,
            track_index: 0,
            stopped: false,
        }
    }
}

impl LocalPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    fn adjust_volume(&mut self, delta: i16) {
        let volume = (i16::from(self.volume) + delta).clamp(0, 100);
        self.volume = volume as u8;
        info!("Setting volume to {}", self.volume);
    }
}

impl MediaController for LocalPlayer {
    fn apply(&mut self, action: MediaAction) -> Result<(), GestureError> {
        if self.stopped {
            return Err(GestureError::DispatchError(format!(
                "player stopped, cannot apply {}",
                action.as_str()
            )));
        }

        match action {
            MediaAction::Play => self.is_playing = true,
            MediaAction::Pause => self.is_playing = false,
            MediaAction::NextTrack => self.track_index = self.track_index.saturating_add(1),
            MediaAction::PreviousTrack => self.track_index = self.track_index.saturating_sub(1),
            MediaAction::VolumeUp => self.adjust_volume(i16::from(VOLUME_STEP)),
            MediaAction::VolumeDown => self.adjust_volume(-i16::from(VOLUME_STEP)),
            MediaAction::Quit => {
                self.is_playing = false;
                self.stopped = true;
            }
        }
        Ok(())
    }
}

/// What the dispatcher did with a gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Applied(MediaAction),
    /// Same gesture as the previous one, inside the repeat cooldown
    Throttled,
}

/// Routes gestures to a controller, dropping rapid identical repeats
pub struct GestureDispatcher<C> {
    controller: C,
    repeat_cooldown: Duration,
    last: Option<(Gesture, DateTime<Utc>)>,
}

impl<C: MediaController> GestureDispatcher<C> {
    pub fn new(controller: C) -> Self {
        Self {
            controller,
            repeat_cooldown: secs_to_duration(DEFAULT_REPEAT_COOLDOWN_SECS),
            last: None,
        }
    }

    pub fn with_repeat_cooldown(controller: C, secs: f64) -> Result<Self, GestureError> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(GestureError::InvalidConfig(format!(
                "repeat cooldown must be a finite non-negative number, got {}",
                secs
            )));
        }
        Ok(Self {
            controller,
            repeat_cooldown: secs_to_duration(secs),
            last: None,
        })
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn into_controller(self) -> C {
        self.controller
    }

    /// Dispatch one gesture observed at `now`
    pub fn dispatch(
        &mut self,
        gesture: Gesture,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, GestureError> {
        if let Some((last_gesture, last_time)) = self.last {
            if last_gesture == gesture && now - last_time < self.repeat_cooldown {
                debug!("Ignoring repeated gesture: {}", gesture);
                return Ok(DispatchOutcome::Throttled);
            }
        }

        self.last = Some((gesture, now));
        let action = MediaAction::from(gesture);
        self.controller.apply(action)?;
        Ok(DispatchOutcome::Applied(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap() + Duration::milliseconds(ms)
    }

    #[test]
    fn test_gesture_mapping() {
        assert_eq!(MediaAction::from(Gesture::SwipeRight), MediaAction::NextTrack);
        assert_eq!(MediaAction::from(Gesture::SwipeLeft), MediaAction::PreviousTrack);
        assert_eq!(MediaAction::from(Gesture::Play), MediaAction::Play);
        assert_eq!(MediaAction::from(Gesture::Quit), MediaAction::Quit);
    }

    #[test]
    fn test_identical_repeat_is_throttled() {
        let mut dispatcher = GestureDispatcher::new(LocalPlayer::new());

        assert_eq!(
            dispatcher.dispatch(Gesture::SwipeRight, at(0)).unwrap(),
            DispatchOutcome::Applied(MediaAction::NextTrack)
        );
        assert_eq!(
            dispatcher.dispatch(Gesture::SwipeRight, at(400)).unwrap(),
            DispatchOutcome::Throttled
        );
        assert_eq!(
            dispatcher.dispatch(Gesture::SwipeRight, at(1_000)).unwrap(),
            DispatchOutcome::Applied(MediaAction::NextTrack)
        );
        assert_eq!(dispatcher.controller().track_index, 2);
    }

    #[test]
    fn test_different_gesture_is_not_throttled() {
        let mut dispatcher = GestureDispatcher::new(LocalPlayer::new());
        dispatcher.dispatch(Gesture::Play, at(0)).unwrap();
        assert_eq!(
            dispatcher.dispatch(Gesture::Pause, at(100)).unwrap(),
            DispatchOutcome::Applied(MediaAction::Pause)
        );
        assert!(!dispatcher.controller().is_playing);
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut player = LocalPlayer::new();
        for _ in 0..8 {
            player.apply(MediaAction::VolumeUp).unwrap();
        }
        assert_eq!(player.volume, 100);

        for _ in 0..12 {
            player.apply(MediaAction::VolumeDown).unwrap();
        }
        assert_eq!(player.volume, 0);
    }

    #[test]
    fn test_previous_track_stops_at_start() {
        let mut player = LocalPlayer::new();
        player.apply(MediaAction::PreviousTrack).unwrap();
        assert_eq!(player.track_index, 0);
    }

    #[test]
    fn test_quit_stops_player() {
        let mut dispatcher = GestureDispatcher::new(LocalPlayer::new());
        dispatcher.dispatch(Gesture::Play, at(0)).unwrap();
        dispatcher.dispatch(Gesture::Quit, at(100)).unwrap();

        let err = dispatcher.dispatch(Gesture::Play, at(5_000)).unwrap_err();
        assert!(matches!(err, GestureError::DispatchError(_)));

        let player = dispatcher.into_controller();
        assert_eq!(
            player,
            LocalPlayer {
                is_playing: false,
                volume: DEFAULT_VOLUME,
                track_index: 0,
                stopped: true,
            }
        );
    }

    #[test]
    fn test_rejects_negative_repeat_cooldown() {
        assert!(GestureDispatcher::with_repeat_cooldown(LocalPlayer::new(), -1.0).is_err());
    }
}
