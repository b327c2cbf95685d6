// src/pipeline/metrics.rs
//
// Session counters. Reported through tracing at the end of a run; the
// event log itself never carries them.

use crate::analysis::{StateDelta, TrackerStats};
use crate::detections::Detections;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone)]
pub struct SessionMetrics {
    pub total_frames: u64,
    pub total_detections: u64,
    pub rejected_entries: u64,
    pub graduations: u64,
    pub frames_with_interactions: u64,
    pub events_logged: u64,
    pub started_at: Instant,
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: 0,
            total_detections: 0,
            rejected_entries: 0,
            graduations: 0,
            frames_with_interactions: 0,
            events_logged: 0,
            started_at: Instant::now(),
        }
    }

    pub fn record_frame(
        &mut self,
        detections: &Detections,
        rejected: usize,
        delta: &StateDelta,
        events: usize,
    ) {
        self.total_frames += 1;
        self.total_detections += detections.total_boxes() as u64;
        self.rejected_entries += rejected as u64;
        self.graduations += delta.new_instances.values().map(|&c| c as u64).sum::<u64>();
        if !delta.interactions.is_empty() {
            self.frames_with_interactions += 1;
        }
        self.events_logged += events as u64;
    }

    pub fn summary(&self, tracker: TrackerStats) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames,
            elapsed: self.started_at.elapsed(),
            total_detections: self.total_detections,
            rejected_entries: self.rejected_entries,
            entities_spawned: tracker.spawned,
            entities_culled: tracker.culled,
            entities_confirmed: tracker.graduated,
            graduations: self.graduations,
            frames_with_interactions: self.frames_with_interactions,
            events_logged: self.events_logged,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub elapsed: Duration,
    pub total_detections: u64,
    pub rejected_entries: u64,
    pub entities_spawned: u64,
    pub entities_culled: u64,
    /// Confirmations across every label, registered for counting or not
    pub entities_confirmed: u64,
    /// Confirmations of registered labels only
    pub graduations: u64,
    pub frames_with_interactions: u64,
    pub events_logged: u64,
}

impl MetricsSummary {
    /// Frames per second over the whole run; 0 for runs too short to time.
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs < 1e-3 {
            return 0.0;
        }
        self.total_frames as f64 / secs
    }

    pub fn log(&self) {
        info!(
            "  Total frames: {} in {:.2}s ({:.1} fps)",
            self.total_frames,
            self.elapsed.as_secs_f64(),
            self.fps()
        );
        info!("  Detections: {}", self.total_detections);
        if self.rejected_entries > 0 {
            info!("  ⚠️  Rejected entries: {}", self.rejected_entries);
        }
        info!(
            "  Entities spawned: {}, culled: {}",
            self.entities_spawned, self.entities_culled
        );
        info!(
            "  Graduations (all labels): {}, counted new instances: {}",
            self.entities_confirmed, self.graduations
        );
        info!(
            "  Frames with interactions: {}",
            self.frames_with_interactions
        );
        info!("  Events logged: {}", self.events_logged);
    }
}
