// src/analysis/entity_tracker.rs
//
// Label-aware entity tracker. Turns noisy per-frame detections into
// persistent entities, confirmed "new instance" counts and interactions
// between registered label pairs.
//
// Design:
//   - Greedy first-match centroid association, per label, in stored order
//   - Entities graduate exactly once when observation_count reaches the
//     confirmation threshold
//   - Stale entities are culled after association and spawn of the same
//     frame, so a freshly spawned entity always survives its first frame
//   - Interactions are fractional bbox overlap between registered label pairs

use crate::detections::Detections;
use crate::error::{Result, TrackerError};
use crate::geometry::{intersection_area, BoundingBox, Point};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace, warn};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Max centroid distance (pixels, exclusive) for a detection to re-associate
    pub movement_threshold_px: f64,
    /// Observations required before an entity counts as a genuine instance
    pub confirmation_threshold: u32,
    /// Frames an entity survives without being re-associated
    pub last_seen_threshold: u64,
    /// Frames an unconfirmed entity survives without being re-associated
    pub fast_prune_window: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            movement_threshold_px: 30.0,
            confirmation_threshold: 5,
            last_seen_threshold: 90, // 3s at 30fps
            fast_prune_window: 10,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.movement_threshold_px.is_finite() || self.movement_threshold_px <= 0.0 {
            return Err(TrackerError::config(format!(
                "movement_threshold_px must be a positive number, got {}",
                self.movement_threshold_px
            )));
        }
        if self.confirmation_threshold == 0 {
            return Err(TrackerError::config(
                "confirmation_threshold must be at least 1",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Unconfirmed,
    Confirmed,
}

/// A tracked instance of one object type.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: u64,
    pub object_type: String,
    pub bbox: BoundingBox,
    pub observation_count: u32,
    pub last_seen: u64,
    pub state: EntityState,
}

impl Entity {
    fn new(id: u64, object_type: &str, bbox: BoundingBox, frame_index: u64) -> Self {
        Self {
            id,
            object_type: object_type.to_string(),
            bbox,
            observation_count: 1,
            last_seen: frame_index,
            state: EntityState::Unconfirmed,
        }
    }

    pub fn centroid(&self) -> Point {
        self.bbox.centroid()
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == EntityState::Confirmed
    }

    fn observe(&mut self, bbox: BoundingBox, frame_index: u64) {
        self.bbox = bbox;
        self.observation_count += 1;
        self.last_seen = frame_index;
    }

    fn is_stale(&self, frame_index: u64, config: &TrackerConfig) -> bool {
        let expired = self.last_seen.saturating_add(config.last_seen_threshold) < frame_index;
        let noise = self.observation_count < config.confirmation_threshold
            && self.last_seen.saturating_add(config.fast_prune_window) < frame_index;
        expired || noise
    }
}

/// `object_a` and `object_b` interact when their boxes overlap by at least
/// `threshold` of the smaller box's area.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionRule {
    pub object_a: String,
    pub object_b: String,
    pub threshold: f64,
    pub verb: String,
}

impl InteractionRule {
    pub fn is_satisfied_by(&self, a: &BoundingBox, b: &BoundingBox) -> bool {
        let overlap = intersection_area(a, b) as f64;
        let required = self.threshold * a.area().min(b.area()) as f64;
        overlap >= required
    }

    pub fn interaction(&self) -> Interaction {
        Interaction {
            object_a: self.object_a.clone(),
            object_b: self.object_b.clone(),
            verb: self.verb.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interaction {
    pub object_a: String,
    pub object_b: String,
    pub verb: String,
}

impl Interaction {
    pub fn new(object_a: &str, object_b: &str, verb: &str) -> Self {
        Self {
            object_a: object_a.to_string(),
            object_b: object_b.to_string(),
            verb: verb.to_string(),
        }
    }
}

impl fmt::Display for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.object_a, self.verb, self.object_b)
    }
}

/// Per-frame tracker output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDelta {
    /// Graduations this frame for every registered label, in registration order
    pub new_instances: IndexMap<String, u32>,
    /// Every rule-satisfying pair this frame; may repeat a tuple
    pub interactions: Vec<Interaction>,
}

/// Running lifecycle counters since the tracker was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStats {
    pub spawned: u64,
    pub culled: u64,
    pub graduated: u64,
}

// ============================================================================
// MAIN TRACKER
// ============================================================================

pub struct EntityTracker {
    config: TrackerConfig,
    entities: Vec<Entity>,
    next_id: u64,
    /// Registered new-instance labels → graduations seen so far
    instance_totals: IndexMap<String, u64>,
    rules: Vec<InteractionRule>,
    stats: TrackerStats,
    last_frame: Option<u64>,
}

impl Default for EntityTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl EntityTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            entities: Vec::with_capacity(32),
            next_id: 1,
            instance_totals: IndexMap::new(),
            rules: Vec::new(),
            stats: TrackerStats::default(),
            last_frame: None,
        }
    }

    /// Count graduations of `label` in every subsequent `StateDelta`.
    /// Registering the same label again keeps its running total.
    pub fn register_new_instance_type(&mut self, label: &str) {
        self.instance_totals.entry(label.to_string()).or_insert(0);
    }

    /// Append an interaction rule. Duplicate rules apply independently.
    pub fn register_interaction(
        &mut self,
        object_a: &str,
        object_b: &str,
        threshold: f64,
        verb: &str,
    ) -> Result<()> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(TrackerError::config(format!(
                "intersection threshold for '{object_a}' {verb} '{object_b}' must be in (0, 1], got {threshold}"
            )));
        }
        self.rules.push(InteractionRule {
            object_a: object_a.to_string(),
            object_b: object_b.to_string(),
            threshold,
            verb: verb.to_string(),
        });
        Ok(())
    }

    /// Process one frame. Must be called once per frame with increasing
    /// `frame_index`.
    pub fn update(&mut self, detections: &Detections, frame_index: u64) -> StateDelta {
        if let Some(last) = self.last_frame {
            if frame_index <= last {
                warn!(
                    "⚠️  Frame {} is not after frame {}; culling and graduation assume increasing frames",
                    frame_index, last
                );
            }
        }
        self.last_frame = Some(frame_index);

        let candidates = self.associate(detections, frame_index);
        self.spawn(candidates, frame_index);
        self.cull(frame_index);
        let new_instances = self.confirm_new_instances(frame_index);
        let interactions = self.detect_interactions();

        StateDelta {
            new_instances,
            interactions,
        }
    }

    // ========================================================================
    // PHASE 1: GREEDY FIRST-MATCH ASSOCIATION
    //
    // The first same-label entity (in stored order) whose centroid is within
    // the movement threshold takes the detection. Not nearest-match: two
    // entities closer than the threshold to each other can swap detections.
    // An entity takes at most one detection per frame.
    // ========================================================================
    fn associate<'d>(
        &mut self,
        detections: &'d Detections,
        frame_index: u64,
    ) -> Vec<(&'d str, BoundingBox)> {
        let threshold = self.config.movement_threshold_px;
        let mut matched = vec![false; self.entities.len()];
        let mut candidates = Vec::new();

        for (label, boxes) in detections.iter() {
            for bbox in boxes {
                let centroid = bbox.centroid();
                let hit = self.entities.iter().enumerate().position(|(i, e)| {
                    !matched[i]
                        && e.object_type == label
                        && e.centroid().distance_to(&centroid) < threshold
                });

                match hit {
                    Some(i) => {
                        matched[i] = true;
                        let entity = &mut self.entities[i];
                        entity.observe(*bbox, frame_index);
                        trace!(
                            "Entity {} ({}) re-associated, observations={}",
                            entity.id,
                            entity.object_type,
                            entity.observation_count
                        );
                    }
                    None => candidates.push((label, *bbox)),
                }
            }
        }

        candidates
    }

    // ========================================================================
    // PHASE 2: SPAWN
    // ========================================================================
    fn spawn(&mut self, candidates: Vec<(&str, BoundingBox)>, frame_index: u64) {
        for (label, bbox) in candidates {
            let entity = Entity::new(self.next_id, label, bbox, frame_index);
            debug!(
                "🆕 Entity {} spawned: {} at [{}, {}, {}, {}]",
                entity.id, label, bbox.x, bbox.y, bbox.w, bbox.h
            );
            self.next_id += 1;
            self.stats.spawned += 1;
            self.entities.push(entity);
        }
    }

    // ========================================================================
    // PHASE 3: CULL
    //
    // Mark first, then compact in one pass.
    // ========================================================================
    fn cull(&mut self, frame_index: u64) {
        let stale: Vec<bool> = self
            .entities
            .iter()
            .map(|e| e.is_stale(frame_index, &self.config))
            .collect();

        let mut culled = 0u64;
        let mut flags = stale.iter();
        self.entities.retain(|e| {
            let remove = flags.next().copied().unwrap_or(false);
            if remove {
                debug!(
                    "🗑️  Entity {} ({}) culled: last seen {}, observations={}",
                    e.id, e.object_type, e.last_seen, e.observation_count
                );
                culled += 1;
            }
            !remove
        });
        self.stats.culled += culled;
    }

    // ========================================================================
    // PHASE 4: NEW-INSTANCE CONFIRMATION
    //
    // Unconfirmed → Confirmed happens exactly once per entity, on the frame
    // its observation_count reaches the threshold.
    // ========================================================================
    fn confirm_new_instances(&mut self, frame_index: u64) -> IndexMap<String, u32> {
        let mut new_instances: IndexMap<String, u32> = self
            .instance_totals
            .keys()
            .map(|label| (label.clone(), 0))
            .collect();

        let threshold = self.config.confirmation_threshold;
        for entity in &mut self.entities {
            if entity.state != EntityState::Unconfirmed || entity.observation_count < threshold {
                continue;
            }
            entity.state = EntityState::Confirmed;
            self.stats.graduated += 1;

            if let Some(count) = new_instances.get_mut(&entity.object_type) {
                *count += 1;
                if let Some(total) = self.instance_totals.get_mut(&entity.object_type) {
                    *total += 1;
                }
                debug!(
                    "✅ Entity {} confirmed as new {} at frame {}",
                    entity.id, entity.object_type, frame_index
                );
            }
        }

        new_instances
    }

    // ========================================================================
    // PHASE 5: INTERACTIONS
    //
    // Cartesian product of known entities (confirmed or not) per rule.
    // Same-label rules skip the entity paired with itself.
    // ========================================================================
    fn detect_interactions(&self) -> Vec<Interaction> {
        let mut interactions = Vec::new();

        for rule in &self.rules {
            for (i, a) in self.entities.iter().enumerate() {
                if a.object_type != rule.object_a {
                    continue;
                }
                for (j, b) in self.entities.iter().enumerate() {
                    if i == j || b.object_type != rule.object_b {
                        continue;
                    }
                    if rule.is_satisfied_by(&a.bbox, &b.bbox) {
                        interactions.push(rule.interaction());
                    }
                }
            }
        }

        interactions
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Total graduations so far for a registered new-instance label.
    pub fn instance_count(&self, label: &str) -> Result<u64> {
        self.instance_totals
            .get(label)
            .copied()
            .ok_or_else(|| TrackerError::unregistered(label))
    }

    /// Currently known entities that have reached the confirmation
    /// threshold, counted per label in first-seen order.
    pub fn summarise_known_objects(&self) -> IndexMap<String, usize> {
        let mut counts: IndexMap<String, usize> = IndexMap::new();
        for entity in &self.entities {
            if entity.observation_count < self.config.confirmation_threshold {
                continue;
            }
            *counts.entry(entity.object_type.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: u64) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn registered_new_instance_types(&self) -> impl Iterator<Item = &str> {
        self.instance_totals.keys().map(String::as_str)
    }

    pub fn interaction_rules(&self) -> &[InteractionRule] {
        &self.rules
    }

    pub fn stats(&self) -> TrackerStats {
        self.stats
    }
}

// ============================================================================
// TESTS
// ============================================================================
