// src/pipeline/session.rs
//
// Frame loop: detections → tracker → event log, one call each per frame.
// The session owns the event log, so its file is closed on every exit path:
// `finish` on the normal path, `Drop` if the caller bails out early.

use crate::analysis::EntityTracker;
use crate::error::{Result, TrackerError};
use crate::pipeline::event_log::{EventLog, LogEntry};
use crate::pipeline::frame_source::{FrameSource, SourceFrame};
use crate::pipeline::metrics::{MetricsSummary, SessionMetrics};
use crate::detections::Detections;
use std::io::{BufRead, Stdout, Write};
use tracing::{info, warn};

pub struct Session<W: Write = Stdout> {
    tracker: EntityTracker,
    event_log: EventLog<W>,
    metrics: SessionMetrics,
    /// Abort on the first rejected input instead of dropping it
    strict: bool,
}

impl<W: Write> Session<W> {
    pub fn new(tracker: EntityTracker, event_log: EventLog<W>, strict: bool) -> Self {
        Self {
            tracker,
            event_log,
            metrics: SessionMetrics::new(),
            strict,
        }
    }

    /// Feed every frame from `source`. Stops at the first fatal error.
    pub fn run<R: BufRead>(&mut self, mut source: FrameSource<R>) -> Result<()> {
        while let Some(item) = source.next() {
            let frame = match item {
                Ok(frame) => frame,
                Err(TrackerError::Input(e)) if !self.strict => {
                    // The line was consumed, so its index is behind the cursor.
                    let index = source.position().saturating_sub(1);
                    warn!("⚠️  Frame {:05} rejected, treating as empty: {}", index, e);
                    SourceFrame {
                        index,
                        detections: Detections::new(),
                        rejected: vec![e],
                    }
                }
                Err(e) => return Err(e),
            };
            self.process_frame(frame)?;
        }
        Ok(())
    }

    pub fn process_frame(&mut self, frame: SourceFrame) -> Result<Vec<LogEntry>> {
        let SourceFrame {
            index,
            detections,
            rejected,
        } = frame;

        if self.strict {
            if let Some(e) = rejected.into_iter().next() {
                return Err(e.into());
            }
            return self.step(index, &detections, 0);
        }

        for e in &rejected {
            warn!("⚠️  Frame {:05}: {}", index, e);
        }
        self.step(index, &detections, rejected.len())
    }

    fn step(&mut self, index: u64, detections: &Detections, rejected: usize) -> Result<Vec<LogEntry>> {
        let delta = self.tracker.update(detections, index);
        let entries = self.event_log.update_state(index, &delta)?;
        self.metrics
            .record_frame(detections, rejected, &delta, entries.len());
        Ok(entries)
    }

    /// Close the event log (writing totals) and return the run summary.
    pub fn finish(self) -> Result<MetricsSummary> {
        let Session {
            tracker,
            event_log,
            mut metrics,
            ..
        } = self;

        let closing = event_log.close()?;
        metrics.events_logged += closing.len() as u64;

        let summary = metrics.summary(tracker.stats());
        info!("✓ Session finished after {} frame(s)", summary.total_frames);
        Ok(summary)
    }

    pub fn tracker(&self) -> &EntityTracker {
        &self.tracker
    }

    pub fn event_log(&self) -> &EventLog<W> {
        &self.event_log
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }
}
