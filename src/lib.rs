//! gesture-dj - Hand-gesture classification engine for media control
//!
//! gesture-dj turns per-frame hand landmarks (from an external pose estimator)
//! into discrete control gestures through a deterministic pipeline:
//! frame parsing → motion tracking → gesture classification with cooldowns →
//! media-action dispatch.
//!
//! ## Modules
//!
//! - **Classifier**: Quit / swipe / volume pan / pose tests with debounce
//! - **Motion**: Rolling displacement window for the tracked hand
//! - **Pipeline**: NDJSON frame streams in, gesture events out
//! - **Dispatch**: Gesture to player-action mapping with a repeat throttle

pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod motion;
pub mod pipeline;
pub mod pose;
pub mod types;

pub use classifier::{ClassifierObserver, GestureClassifier, LogObserver, NoopObserver};
pub use config::{ClassifierConfig, PipelineConfig};
pub use error::GestureError;
pub use pipeline::{frames_to_gestures, GestureProcessor};
pub use types::{Frame, Gesture, GestureCategory, GestureEvent, HandObservation, Landmark};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
