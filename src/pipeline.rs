//! Frame pipeline orchestration
//!
//! This module provides the public API for turning landmark frames into gesture
//! events. It orchestrates: frame parsing → frame skipping → classification →
//! event records.

use log::{debug, info};
use uuid::Uuid;

use crate::classifier::{ClassifierObserver, GestureClassifier, LogObserver};
use crate::config::PipelineConfig;
use crate::error::GestureError;
use crate::types::{Frame, GestureEvent};

/// Parse newline-delimited JSON frames. Blank lines are skipped.
pub fn parse_frames_ndjson(input: &str) -> Result<Vec<Frame>, GestureError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| parse_frame_line(line, i + 1))
        .collect()
}

/// Parse a JSON array of frames
pub fn parse_frames_array(input: &str) -> Result<Vec<Frame>, GestureError> {
    Ok(serde_json::from_str(input)?)
}

/// Parse one NDJSON line; `line_number` is 1-based and only used for errors
pub fn parse_frame_line(line: &str, line_number: usize) -> Result<Frame, GestureError> {
    serde_json::from_str(line.trim()).map_err(|e| {
        GestureError::ParseError(format!("line {}: {}", line_number, e))
    })
}

/// Convert NDJSON frames to gesture events (stateless, one-shot).
///
/// # Arguments
/// * `frames_ndjson` - One estimator frame per line
/// * `config` - Classifier thresholds and frame stride
///
/// # Returns
/// Every gesture detected in the stream, in frame order
///
/// # Example
/// ```ignore
/// let events = frames_to_gestures(&ndjson, PipelineConfig::default())?;
/// ```
pub fn frames_to_gestures(
    frames_ndjson: &str,
    config: PipelineConfig,
) -> Result<Vec<GestureEvent>, GestureError> {
    let frames = parse_frames_ndjson(frames_ndjson)?;
    let mut processor = GestureProcessor::new(config)?;
    Ok(processor.process_all(&frames))
}

/// Stateful processor for a single landmark stream.
///
/// Owns one classifier, applies the frame stride and stamps detected gestures
/// with the frame index and a per-processor session id.
pub struct GestureProcessor<O = LogObserver> {
    classifier: GestureClassifier<O>,
    process_every_n_frames: u64,
    frames_seen: u64,
    session_id: Uuid,
}

impl GestureProcessor<LogObserver> {
    /// Create a processor that logs through the `log` facade
    pub fn new(config: PipelineConfig) -> Result<Self, GestureError> {
        let observer = LogObserver::from_config(&config.classifier);
        Self::with_observer(config, observer)
    }
}

impl<O: ClassifierObserver> GestureProcessor<O> {
    pub fn with_observer(config: PipelineConfig, observer: O) -> Result<Self, GestureError> {
        config.validate()?;
        let processor = Self {
            classifier: GestureClassifier::with_observer(config.classifier, observer)?,
            process_every_n_frames: u64::from(config.process_every_n_frames),
            frames_seen: 0,
            session_id: Uuid::new_v4(),
        };
        info!(
            "Gesture session {} started (every {} frame(s))",
            processor.session_id, processor.process_every_n_frames
        );
        Ok(processor)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Number of frames offered so far, skipped ones included
    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    pub fn classifier(&self) -> &GestureClassifier<O> {
        &self.classifier
    }

    /// Offer one frame. Frames outside the stride are counted but never reach
    /// the classifier.
    pub fn process_frame(&mut self, frame: &Frame) -> Option<GestureEvent> {
        let frame_index = self.next_frame_index()?;

        let gesture = self.classifier.classify_frame(frame)?;
        debug!("Frame {} produced {}", frame_index, gesture);

        Some(GestureEvent {
            session_id: self.session_id,
            frame_index,
            timestamp: frame.timestamp,
            gesture,
            category: gesture.category(),
        })
    }

    /// Count a frame that could not be read. Inside the stride it is treated
    /// as a frame with no usable hands.
    pub fn discard_frame(&mut self, error: &GestureError) {
        if self.next_frame_index().is_some() {
            self.classifier.discard_frame(error);
        }
    }

    /// Advance the frame counter, returning the index when the frame is the
    /// last of its stride
    fn next_frame_index(&mut self) -> Option<u64> {
        let frame_index = self.frames_seen;
        self.frames_seen += 1;
        if (frame_index + 1) % self.process_every_n_frames == 0 {
            Some(frame_index)
        } else {
            None
        }
    }

    /// Offer a batch of frames in order
    pub fn process_all(&mut self, frames: &[Frame]) -> Vec<GestureEvent> {
        frames
            .iter()
            .filter_map(|frame| self.process_frame(frame))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::NoopObserver;
    use crate::config::ClassifierConfig;
    use crate::types::{Gesture, GestureCategory, Landmark, FINGERTIPS, LANDMARK_COUNT};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap() + Duration::milliseconds(ms)
    }

    fn hand_at(x: f64, y: f64) -> Vec<Landmark> {
        let mut raw = vec![Landmark::new(x, y); LANDMARK_COUNT];
        for tip in &FINGERTIPS[1..] {
            raw[*tip] = Landmark::new(x, y - 0.1125);
        }
        raw
    }

    fn frame(ms: i64, hands: Vec<Vec<Landmark>>) -> Frame {
        Frame {
            timestamp: at(ms),
            hands,
        }
    }

    fn flick_frames(start_ms: i64) -> Vec<Frame> {
        [(0.30, 0.50), (0.30, 0.50), (0.33, 0.50), (0.45, 0.51)]
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| frame(start_ms + 33 * i as i64, vec![hand_at(x, y)]))
            .collect()
    }

    fn to_ndjson(frames: &[Frame]) -> String {
        frames
            .iter()
            .map(|f| serde_json::to_string(f).unwrap())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_frames_to_gestures() {
        let ndjson = to_ndjson(&flick_frames(0));
        let events = frames_to_gestures(&ndjson, PipelineConfig::default()).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].gesture, Gesture::SwipeRight);
        assert_eq!(events[0].category, GestureCategory::Motion);
        assert_eq!(events[0].frame_index, 3);
        assert_eq!(events[0].timestamp, at(99));
    }

    #[test]
    fn test_event_serialization() {
        let ndjson = to_ndjson(&flick_frames(0));
        let events = frames_to_gestures(&ndjson, PipelineConfig::default()).unwrap();

        let value: serde_json::Value = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(value["gesture"], "swipe_right");
        assert_eq!(value["category"], "motion");
        assert_eq!(value["frame_index"], 3);
    }

    #[test]
    fn test_ndjson_skips_blank_lines() {
        let frames = flick_frames(0);
        let ndjson = format!(
            "\n{}\n\n{}\n",
            serde_json::to_string(&frames[0]).unwrap(),
            serde_json::to_string(&frames[1]).unwrap()
        );
        assert_eq!(parse_frames_ndjson(&ndjson).unwrap().len(), 2);
    }

    #[test]
    fn test_ndjson_reports_bad_line() {
        let good = serde_json::to_string(&flick_frames(0)[0]).unwrap();
        let input = format!("{}\nnot json\n", good);

        let err = parse_frames_ndjson(&input).unwrap_err();
        assert!(matches!(err, GestureError::ParseError(_)));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_array_input() {
        let json = serde_json::to_string(&flick_frames(0)).unwrap();
        let frames = parse_frames_array(&json).unwrap();
        assert_eq!(frames.len(), 4);
        assert!(parse_frames_array("{}").is_err());
    }

    #[test]
    fn test_stride_skips_frames_without_touching_state() {
        let config = PipelineConfig {
            process_every_n_frames: 2,
            ..PipelineConfig::default()
        };
        let mut processor = GestureProcessor::with_observer(config, NoopObserver).unwrap();

        // Frame 0 is skipped, frame 1 anchors the tracker
        assert_eq!(processor.process_frame(&frame(0, vec![hand_at(0.9, 0.9)])), None);
        assert_eq!(processor.classifier().state().tracker().reference(), None);
        assert_eq!(processor.process_frame(&frame(33, vec![hand_at(0.3, 0.5)])), None);
        assert_eq!(
            processor.classifier().state().tracker().reference(),
            Some(Landmark::new(0.3, 0.5))
        );

        // Frame 2 would be a huge jump, but it is skipped
        processor.process_frame(&frame(66, vec![hand_at(0.9, 0.1)]));
        assert!(processor.classifier().state().tracker().is_empty());
        assert_eq!(processor.frames_seen(), 3);
    }

    #[test]
    fn test_stride_events_keep_stream_index() {
        let config = PipelineConfig {
            process_every_n_frames: 2,
            ..PipelineConfig::default()
        };
        let mut processor = GestureProcessor::with_observer(config, NoopObserver).unwrap();

        // Every processed (odd) frame carries the flick; the even ones are noise
        let mut frames = Vec::new();
        for (i, f) in flick_frames(0).into_iter().enumerate() {
            frames.push(frame(66 * i as i64, vec![hand_at(0.9, 0.9)]));
            frames.push(Frame {
                timestamp: at(66 * i as i64 + 33),
                ..f
            });
        }

        let events = processor.process_all(&frames);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].gesture, Gesture::SwipeRight);
        assert_eq!(events[0].frame_index, 7);
    }

    #[test]
    fn test_null_coordinate_frame_resets_tracking_mid_stream() {
        let mut broken = hand_at(0.35, 0.50);
        broken[8].y = f64::NAN;

        let mut frames = vec![
            frame(0, vec![hand_at(0.30, 0.50)]),
            frame(33, vec![hand_at(0.30, 0.50)]),
            frame(66, vec![broken]),
        ];
        frames.extend(flick_frames(99));
        let ndjson = to_ndjson(&frames);
        assert!(ndjson.lines().nth(2).unwrap().contains(r#""y":null"#));

        let events = frames_to_gestures(&ndjson, PipelineConfig::default()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].gesture, Gesture::SwipeRight);
        assert_eq!(events[0].frame_index, 6);
    }

    #[test]
    fn test_discarded_frame_counts_and_resets() {
        let mut processor =
            GestureProcessor::with_observer(PipelineConfig::default(), NoopObserver).unwrap();
        processor.process_frame(&frame(0, vec![hand_at(0.3, 0.5)]));
        assert!(processor.classifier().state().tracker().reference().is_some());

        let err = parse_frame_line("{\"timestamp\": ", 2).unwrap_err();
        processor.discard_frame(&err);
        assert_eq!(processor.frames_seen(), 2);
        assert_eq!(processor.classifier().state().tracker().reference(), None);

        let events = processor.process_all(&flick_frames(66));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].frame_index, 5);
    }

    #[test]
    fn test_discarded_frame_outside_stride_is_only_counted() {
        let config = PipelineConfig {
            process_every_n_frames: 2,
            ..PipelineConfig::default()
        };
        let mut processor = GestureProcessor::with_observer(config, NoopObserver).unwrap();
        processor.discard_frame(&GestureError::ParseError("line 1: eof".to_string()));
        processor.process_frame(&frame(33, vec![hand_at(0.3, 0.5)]));
        assert!(processor.classifier().state().tracker().reference().is_some());

        processor.discard_frame(&GestureError::ParseError("line 3: eof".to_string()));
        assert!(processor.classifier().state().tracker().reference().is_some());
        assert_eq!(processor.frames_seen(), 3);
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = GestureProcessor::new(PipelineConfig::default()).unwrap();
        let b = GestureProcessor::new(PipelineConfig::default()).unwrap();
        assert_ne!(a.session_id(), b.session_id());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = PipelineConfig {
            classifier: ClassifierConfig {
                min_swipe_frames: 1,
                ..ClassifierConfig::default()
            },
            ..PipelineConfig::default()
        };
        assert!(GestureProcessor::new(config).is_err());
    }
}
