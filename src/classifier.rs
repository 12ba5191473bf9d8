//! Gesture classification and debounce
//!
//! The classifier turns the hands seen in one frame into at most one
//! [`Gesture`]. Tests run in strict priority order:
//!
//! 1. two raised hands → quit (ignores cooldowns and tracking state)
//! 2. horizontal swipe over the motion window
//! 3. vertical pan over the motion window
//! 4. static hand pose (open palm / closed fist)
//!
//! Motion tests run before pose tests so a hand in mid-motion is never read as a
//! held pose. Pose gestures use a longer cooldown than motion gestures because a
//! held pose would otherwise fire repeatedly.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};

use crate::config::ClassifierConfig;
use crate::error::GestureError;
use crate::motion::{MotionTracker, NetMotion, TrackStatus};
use crate::pose::{classify_pose, HandPose};
use crate::types::{Frame, Gesture, GestureCategory, HandObservation, Landmark};

/// Hooks for what the classifier sees, so callers decide how to report it
pub trait ClassifierObserver {
    /// A frame contained a malformed hand and was treated as empty
    fn on_malformed(&mut self, _error: &GestureError) {}

    /// Net motion was evaluated against the swipe / pan thresholds
    fn on_motion(&mut self, _motion: &NetMotion, _since_last_gesture: Option<Duration>) {}

    /// A gesture was emitted
    fn on_gesture(&mut self, _gesture: Gesture, _timestamp: DateTime<Utc>) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ClassifierObserver for NoopObserver {}

/// Observer that reports through the `log` facade
#[derive(Debug, Clone)]
pub struct LogObserver {
    debug_interval: u32,
    ratio_epsilon: f64,
    evaluations: u32,
}

impl LogObserver {
    /// Log net motion at debug level every `debug_log_interval` evaluations (0 disables)
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            debug_interval: config.debug_log_interval,
            ratio_epsilon: config.ratio_epsilon,
            evaluations: 0,
        }
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}

impl ClassifierObserver for LogObserver {
    fn on_malformed(&mut self, error: &GestureError) {
        warn!("Dropping frame: {}", error);
    }

    fn on_motion(&mut self, motion: &NetMotion, since_last_gesture: Option<Duration>) {
        self.evaluations = self.evaluations.wrapping_add(1);
        if self.debug_interval == 0 || self.evaluations % self.debug_interval != 0 {
            return;
        }
        debug!(
            "net_x={:.3} net_y={:.3} ratio={:.3} samples={}",
            motion.net_x,
            motion.net_y,
            motion.ratio(self.ratio_epsilon),
            motion.samples
        );
        if let Some(elapsed) = since_last_gesture {
            debug!(
                "Time since last gesture: {:.2}s",
                elapsed.num_milliseconds() as f64 / 1000.0
            );
        }
    }

    fn on_gesture(&mut self, gesture: Gesture, _timestamp: DateTime<Utc>) {
        info!("Detected {} gesture", gesture);
    }
}

/// Most recently emitted gesture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastGesture {
    pub gesture: Gesture,
    pub timestamp: DateTime<Utc>,
}

/// Mutable state carried between frames
#[derive(Debug, Clone)]
pub struct GestureState {
    tracker: MotionTracker,
    last_gesture: Option<LastGesture>,
}

impl GestureState {
    fn new(window_size: usize) -> Self {
        Self {
            tracker: MotionTracker::new(window_size),
            last_gesture: None,
        }
    }

    pub fn tracker(&self) -> &MotionTracker {
        &self.tracker
    }

    pub fn last_gesture(&self) -> Option<LastGesture> {
        self.last_gesture
    }

    /// Time since the last emitted gesture of any kind
    pub fn since_last_gesture(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_gesture.map(|last| now - last.timestamp)
    }

    /// Whether `cooldown` has passed since the last gesture. With no prior gesture
    /// every cooldown has passed; a timestamp older than the last gesture has not.
    pub fn cooldown_elapsed(&self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        match self.since_last_gesture(now) {
            Some(elapsed) => elapsed >= cooldown,
            None => true,
        }
    }

    fn record(&mut self, gesture: Gesture, timestamp: DateTime<Utc>) {
        self.tracker.reset();
        self.last_gesture = Some(LastGesture { gesture, timestamp });
    }
}

/// Stateful per-stream gesture classifier.
///
/// One classifier per landmark stream; calls must be made in frame order.
#[derive(Debug)]
pub struct GestureClassifier<O = LogObserver> {
    config: ClassifierConfig,
    state: GestureState,
    observer: O,
}

impl GestureClassifier<LogObserver> {
    /// Create a classifier that reports through the `log` facade
    pub fn new(config: ClassifierConfig) -> Result<Self, GestureError> {
        let observer = LogObserver::from_config(&config);
        Self::with_observer(config, observer)
    }
}

impl<O: ClassifierObserver> GestureClassifier<O> {
    /// Create a classifier with a custom observer. Fails on invalid configuration.
    pub fn with_observer(config: ClassifierConfig, observer: O) -> Result<Self, GestureError> {
        config.validate()?;
        Ok(Self {
            state: GestureState::new(config.window_size),
            config,
            observer,
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Forget tracking history and cooldowns
    pub fn reset(&mut self) {
        self.state = GestureState::new(self.config.window_size);
    }

    /// Classify one estimator frame
    pub fn classify_frame(&mut self, frame: &Frame) -> Option<Gesture> {
        self.classify(&frame.hands, frame.timestamp)
    }

    /// Classify the raw landmark lists seen in one frame.
    ///
    /// A malformed hand (wrong landmark count, non-finite coordinate) makes the
    /// whole frame count as empty: tracking resets and the observer is told.
    /// Every hand is validated, but only the first two are kept.
    pub fn classify<H: AsRef<[Landmark]>>(
        &mut self,
        hands: &[H],
        now: DateTime<Utc>,
    ) -> Option<Gesture> {
        let mut observed: [Option<HandObservation>; 2] = [None, None];
        for (i, raw) in hands.iter().enumerate() {
            match HandObservation::from_landmarks(raw.as_ref()) {
                Ok(hand) => {
                    if let Some(slot) = observed.get_mut(i) {
                        *slot = Some(hand);
                    }
                }
                Err(e) => {
                    self.discard_frame(&e);
                    return None;
                }
            }
        }

        let [first, second] = &observed;
        self.classify_hands(first.as_ref(), second.as_ref(), now)
    }

    /// Classify validated hand observations seen in one frame
    pub fn classify_observations(
        &mut self,
        hands: &[HandObservation],
        now: DateTime<Utc>,
    ) -> Option<Gesture> {
        self.classify_hands(hands.first(), hands.get(1), now)
    }

    /// Treat the current frame as unusable: the observer is told and tracking
    /// resets. Cooldowns are kept.
    pub fn discard_frame(&mut self, error: &GestureError) {
        self.observer.on_malformed(error);
        self.state.tracker.reset();
    }

    fn classify_hands(
        &mut self,
        first: Option<&HandObservation>,
        second: Option<&HandObservation>,
        now: DateTime<Utc>,
    ) -> Option<Gesture> {
        if self.hands_raised(first, second) {
            self.observer.on_gesture(Gesture::Quit, now);
            return Some(Gesture::Quit);
        }

        // First hand wins; any others are ignored
        let Some(hand) = first else {
            self.state.tracker.reset();
            return None;
        };

        let point = hand.reference_point();
        if self.state.tracker.observe(point) == TrackStatus::NotReady {
            return None;
        }

        if let Some(motion) = self.state.tracker.net_motion(self.config.min_swipe_frames) {
            let since_last = self.state.since_last_gesture(now);
            self.observer.on_motion(&motion, since_last);

            let candidate = self.swipe(&motion).or_else(|| self.vertical_pan(&motion));
            if let Some(gesture) = candidate.and_then(|g| self.emit(g, now)) {
                return Some(gesture);
            }
        }

        let pose_gesture = classify_pose(hand, &self.config).map(|pose| match pose {
            HandPose::OpenPalm => Gesture::Play,
            HandPose::ClosedFist => Gesture::Pause,
        });
        if let Some(gesture) = pose_gesture.and_then(|g| self.emit(g, now)) {
            return Some(gesture);
        }

        self.state.tracker.rebase(point);
        None
    }

    /// Both of the first two wrists in the upper band of the frame
    fn hands_raised(
        &self,
        first: Option<&HandObservation>,
        second: Option<&HandObservation>,
    ) -> bool {
        let limit = self.config.quit_wrist_height;
        match (first, second) {
            (Some(first), Some(second)) => {
                first.wrist().y < limit && second.wrist().y < limit
            }
            _ => false,
        }
    }

    fn swipe(&self, motion: &NetMotion) -> Option<Gesture> {
        let ratio = motion.ratio(self.config.ratio_epsilon);
        if motion.net_x.abs() > self.config.swipe_min_distance
            && ratio < self.config.swipe_max_ratio
        {
            if motion.net_x > 0.0 {
                Some(Gesture::SwipeRight)
            } else {
                Some(Gesture::SwipeLeft)
            }
        } else {
            None
        }
    }

    fn vertical_pan(&self, motion: &NetMotion) -> Option<Gesture> {
        let vertical = motion.net_y.abs();
        if vertical > motion.net_x.abs() * self.config.vertical_dominance
            && vertical > self.config.vertical_min_distance
        {
            // Image y grows downward
            if motion.net_y < 0.0 {
                Some(Gesture::VolumeUp)
            } else {
                Some(Gesture::VolumeDown)
            }
        } else {
            None
        }
    }

    fn cooldown_for(&self, category: GestureCategory) -> Duration {
        match category {
            GestureCategory::Motion => self.config.gesture_cooldown(),
            GestureCategory::Pose => self.config.play_pause_cooldown(),
            GestureCategory::Quit => Duration::zero(),
        }
    }

    /// Emit `gesture` if its category's cooldown has passed, resetting tracking
    fn emit(&mut self, gesture: Gesture, now: DateTime<Utc>) -> Option<Gesture> {
        let cooldown = self.cooldown_for(gesture.category());
        if !self.state.cooldown_elapsed(now, cooldown) {
            return None;
        }
        self.state.record(gesture, now);
        self.observer.on_gesture(gesture, now);
        Some(gesture)
    }
}
