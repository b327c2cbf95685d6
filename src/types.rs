// src/types.rs
//
// Session configuration schema, read from YAML before the frame loop starts.

use crate::analysis::TrackerConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub world_state: TrackerConfig,
    /// Labels whose confirmed first appearances are counted
    #[serde(default)]
    pub new_instances_to_track: Vec<String>,
    #[serde(default)]
    pub interactions_to_track: Vec<InteractionConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Either `{ object_a, object_b, verb, intersection_threshold }` or the
/// compact `[object_a, object_b, verb, intersection_threshold]` form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InteractionConfig {
    Compact(String, String, String, f64),
    Full {
        object_a: String,
        object_b: String,
        #[serde(default = "default_verb")]
        verb: String,
        #[serde(default = "default_intersection_threshold")]
        intersection_threshold: f64,
    },
}

impl InteractionConfig {
    pub fn object_a(&self) -> &str {
        match self {
            Self::Compact(a, ..) | Self::Full { object_a: a, .. } => a,
        }
    }

    pub fn object_b(&self) -> &str {
        match self {
            Self::Compact(_, b, ..) | Self::Full { object_b: b, .. } => b,
        }
    }

    pub fn verb(&self) -> &str {
        match self {
            Self::Compact(_, _, verb, _) | Self::Full { verb, .. } => verb,
        }
    }

    pub fn intersection_threshold(&self) -> f64 {
        match self {
            Self::Compact(.., t) => *t,
            Self::Full {
                intersection_threshold,
                ..
            } => *intersection_threshold,
        }
    }
}

fn default_verb() -> String {
    "interacting with".to_string()
}

fn default_intersection_threshold() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
