// src/error.rs
//
// Error taxonomy for the tracker, the event log and the input boundary.
// Configuration mistakes and bad upstream data are surfaced, never coerced.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("label '{0}' is not registered")]
    UnregisteredLabel(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid input: {0}")]
    Input(#[from] InputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TrackerError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn unregistered<S: Into<String>>(label: S) -> Self {
        Self::UnregisteredLabel(label.into())
    }
}

/// A detections entry that was rejected at the boundary.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("'{label}' box #{index} has negative extent (w={w}, h={h})")]
    NegativeExtent {
        label: String,
        index: usize,
        w: i64,
        h: i64,
    },

    #[error("'{label}' box #{index} is malformed: {reason}")]
    MalformedBox {
        label: String,
        index: usize,
        reason: String,
    },

    #[error("'{label}' does not map to a sequence of boxes")]
    NotASequence { label: String },

    #[error("line {line} is not valid UTF-8")]
    InvalidUtf8 { line: u64 },

    #[error("detections frame must be a JSON object")]
    NotAnObject,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl InputError {
    pub fn malformed<S: Into<String>>(label: &str, index: usize, reason: S) -> Self {
        Self::MalformedBox {
            label: label.to_string(),
            index,
            reason: reason.into(),
        }
    }
}
