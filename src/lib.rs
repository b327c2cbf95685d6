// src/lib.rs
//
// Per-frame world model for object detections: persistent entities,
// confirmed new-instance counts, label-pair interactions, and the
// chronological event log built from them.

pub mod analysis;
pub mod config;
pub mod detections;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod types;

pub use analysis::{EntityTracker, Interaction, StateDelta, TrackerConfig};
pub use detections::Detections;
pub use error::{InputError, Result, TrackerError};
pub use geometry::{BoundingBox, Point};
pub use pipeline::{EventLog, LogEntry, Session};
pub use types::Config;
