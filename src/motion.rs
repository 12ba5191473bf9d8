//! Hand motion tracking
//!
//! Converts the absolute per-frame hand position into a short rolling history of
//! displacements relative to a stored reference, so directional intent can be read
//! independently of where the hand sits in the frame.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::types::Landmark;

/// Displacement of the tracked point from the reference position
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub dx: f64,
    pub dy: f64,
}

/// Net motion across the window: newest sample minus oldest sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetMotion {
    pub net_x: f64,
    pub net_y: f64,
    /// Number of samples the net motion was computed over
    pub samples: usize,
}

impl NetMotion {
    /// |net_y / net_x|, or 0 when |net_x| is at or below `epsilon`
    pub fn ratio(&self, epsilon: f64) -> f64 {
        if self.net_x.abs() > epsilon {
            (self.net_y / self.net_x).abs()
        } else {
            0.0
        }
    }
}

/// Result of feeding one position into the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    /// First observation: the position became the reference, no sample recorded
    NotReady,
    /// A displacement sample was recorded
    Tracking,
}

/// Fixed-capacity FIFO of motion samples
#[derive(Debug, Clone)]
pub struct MotionWindow {
    samples: VecDeque<MotionSample>,
    capacity: usize,
}

impl MotionWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, dropping the oldest once over capacity
    pub fn push(&mut self, sample: MotionSample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn oldest(&self) -> Option<&MotionSample> {
        self.samples.front()
    }

    pub fn newest(&self) -> Option<&MotionSample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MotionSample> {
        self.samples.iter()
    }
}

/// Tracks one hand's reference point and its recent displacement history
#[derive(Debug, Clone)]
pub struct MotionTracker {
    reference: Option<Landmark>,
    window: MotionWindow,
}

impl MotionTracker {
    pub fn new(window_size: usize) -> Self {
        Self {
            reference: None,
            window: MotionWindow::new(window_size),
        }
    }

    /// Feed the current frame's tracking point.
    ///
    /// Without a stored reference the point becomes the reference and nothing is
    /// sampled. Otherwise the displacement from the reference is appended.
    pub fn observe(&mut self, point: Landmark) -> TrackStatus {
        let Some(reference) = self.reference else {
            self.reference = Some(point);
            self.window.clear();
            return TrackStatus::NotReady;
        };

        self.window.push(MotionSample {
            dx: point.x - reference.x,
            dy: point.y - reference.y,
        });
        TrackStatus::Tracking
    }

    /// Move the reference to `point`, keeping the accumulated window
    pub fn rebase(&mut self, point: Landmark) {
        self.reference = Some(point);
    }

    /// Forget the reference and every sample
    pub fn reset(&mut self) {
        self.reference = None;
        self.window.clear();
    }

    /// Net motion across the window, if it holds at least `min_samples` samples
    pub fn net_motion(&self, min_samples: usize) -> Option<NetMotion> {
        if self.window.len() < min_samples {
            return None;
        }
        let first = self.window.oldest()?;
        let last = self.window.newest()?;
        Some(NetMotion {
            net_x: last.dx - first.dx,
            net_y: last.dy - first.dy,
            samples: self.window.len(),
        })
    }

    pub fn reference(&self) -> Option<Landmark> {
        self.reference
    }

    pub fn window(&self) -> &MotionWindow {
        &self.window
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.window.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_observation_anchors() {
        let mut tracker = MotionTracker::new(3);
        assert_eq!(tracker.observe(Landmark::new(0.3, 0.5)), TrackStatus::NotReady);
        assert_eq!(tracker.reference(), Some(Landmark::new(0.3, 0.5)));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_displacement_is_relative_to_reference() {
        let mut tracker = MotionTracker::new(3);
        tracker.observe(Landmark::new(0.25, 0.5));
        assert_eq!(tracker.observe(Landmark::new(0.5, 0.25)), TrackStatus::Tracking);

        let sample = tracker.window().newest().copied().unwrap();
        assert_eq!(sample, MotionSample { dx: 0.25, dy: -0.25 });
    }

    #[test]
    fn test_window_never_exceeds_capacity() {
        let mut tracker = MotionTracker::new(3);
        tracker.observe(Landmark::new(0.0, 0.0));
        for i in 1..=50 {
            tracker.observe(Landmark::new(i as f64 * 0.01, 0.0));
            assert!(tracker.len() <= tracker.capacity());
        }
        assert_eq!(tracker.len(), 3);

        // FIFO: only the last three displacements survive
        let xs: Vec<f64> = tracker.window().iter().map(|s| s.dx).collect();
        assert_eq!(xs.len(), 3);
        assert!((xs[0] - 0.48).abs() < 1e-9);
        assert!((xs[2] - 0.50).abs() < 1e-9);
    }

    #[test]
    fn test_net_motion_requires_min_samples() {
        let mut tracker = MotionTracker::new(3);
        tracker.observe(Landmark::new(0.5, 0.5));
        tracker.observe(Landmark::new(0.55, 0.5));
        tracker.observe(Landmark::new(0.6, 0.5));
        assert!(tracker.net_motion(3).is_none());

        tracker.observe(Landmark::new(0.7, 0.45));
        let net = tracker.net_motion(3).unwrap();
        assert!((net.net_x - 0.15).abs() < 1e-9);
        assert!((net.net_y + 0.05).abs() < 1e-9);
        assert_eq!(net.samples, 3);
    }

    #[test]
    fn test_rebase_keeps_window() {
        let mut tracker = MotionTracker::new(3);
        tracker.observe(Landmark::new(0.5, 0.5));
        tracker.observe(Landmark::new(0.52, 0.5));
        tracker.rebase(Landmark::new(0.52, 0.5));

        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.reference(), Some(Landmark::new(0.52, 0.5)));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut tracker = MotionTracker::new(3);
        tracker.observe(Landmark::new(0.5, 0.5));
        tracker.observe(Landmark::new(0.6, 0.5));

        tracker.reset();
        let once = (tracker.reference(), tracker.len());
        tracker.reset();
        let twice = (tracker.reference(), tracker.len());

        assert_eq!(once, (None, 0));
        assert_eq!(once, twice);
        assert_eq!(tracker.observe(Landmark::new(0.9, 0.9)), TrackStatus::NotReady);
    }

    #[test]
    fn test_ratio_guards_small_horizontal_motion() {
        let flat = NetMotion {
            net_x: 0.0005,
            net_y: 0.2,
            samples: 3,
        };
        assert_eq!(flat.ratio(1e-3), 0.0);

        let diagonal = NetMotion {
            net_x: -0.1,
            net_y: 0.05,
            samples: 3,
        };
        assert!((diagonal.ratio(1e-3) - 0.5).abs() < 1e-12);
    }
}
