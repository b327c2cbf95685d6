// src/analysis/mod.rs
//
// World-state analysis.
//
// Signal flow:
//   Detections (label → boxes) → entity_tracker → StateDelta ─→ pipeline::event_log

pub mod entity_tracker;

pub use entity_tracker::{
    Entity, EntityState, EntityTracker, Interaction, InteractionRule, StateDelta, TrackerConfig,
    TrackerStats,
};
