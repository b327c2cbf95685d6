// src/pipeline/mod.rs

pub mod event_log;
pub mod frame_source;
pub mod metrics;
pub mod session;

pub use event_log::{EventLog, LogEntry};
pub use frame_source::{FrameSource, SourceFrame};
pub use metrics::{MetricsSummary, SessionMetrics};
pub use session::Session;
