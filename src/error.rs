//! Error types for gesture-dj

use thiserror::Error;

/// Errors that can occur while configuring or feeding the gesture engine
#[derive(Debug, Error)]
pub enum GestureError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed hand observation: {0}")]
    MalformedObservation(String),

    #[error("Failed to parse frame input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Dispatch error: {0}")]
    DispatchError(String),
}
