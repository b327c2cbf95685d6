use crate::analysis::EntityTracker;
use crate::error::{Result, TrackerError};
use crate::types::Config;
use std::fs;
use std::path::Path;
use tracing::debug;

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.world_state.validate()?;

        if let Some(label) = self.new_instances_to_track.iter().find(|l| l.trim().is_empty()) {
            return Err(TrackerError::config(format!(
                "new_instances_to_track contains an empty label: {label:?}"
            )));
        }

        for (i, rule) in self.interactions_to_track.iter().enumerate() {
            if rule.object_a().trim().is_empty() || rule.object_b().trim().is_empty() {
                return Err(TrackerError::config(format!(
                    "interactions_to_track[{i}] has an empty label"
                )));
            }
            if rule.verb().trim().is_empty() {
                return Err(TrackerError::config(format!(
                    "interactions_to_track[{i}] has an empty verb"
                )));
            }
            let t = rule.intersection_threshold();
            if !(t > 0.0 && t <= 1.0) {
                return Err(TrackerError::config(format!(
                    "interactions_to_track[{i}] threshold must be in (0, 1], got {t}"
                )));
            }
        }

        Ok(())
    }

    /// Tracker with every configured label and rule registered, in file order.
    pub fn build_tracker(&self) -> Result<EntityTracker> {
        let mut tracker = EntityTracker::new(self.world_state.clone());

        for label in &self.new_instances_to_track {
            tracker.register_new_instance_type(label);
        }
        for rule in &self.interactions_to_track {
            tracker.register_interaction(
                rule.object_a(),
                rule.object_b(),
                rule.intersection_threshold(),
                rule.verb(),
            )?;
        }

        debug!(
            "Tracker configured: {} new-instance label(s), {} interaction rule(s)",
            self.new_instances_to_track.len(),
            self.interactions_to_track.len()
        );
        Ok(tracker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::TrackerConfig;
    use crate::types::InteractionConfig;

    const SAMPLE: &str = r#"
world_state:
  movement_threshold_px: 40
  confirmation_threshold: 3
new_instances_to_track:
  - petri dish filled
interactions_to_track:
  - { object_a: left hand, object_b: petri dish empty, verb: touching, intersection_threshold: 0.4 }
  - { object_a: right hand, object_b: bottle }
  - [bottle cap, bottle, attached to, 0.5]
logging:
  level: debug
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::from_yaml_str(SAMPLE).unwrap();

        assert_eq!(config.world_state.movement_threshold_px, 40.0);
        assert_eq!(config.world_state.confirmation_threshold, 3);
        // Unspecified fields keep their defaults.
        assert_eq!(config.world_state.last_seen_threshold, 90);
        assert_eq!(config.world_state.fast_prune_window, 10);

        assert_eq!(config.new_instances_to_track, vec!["petri dish filled"]);
        assert_eq!(config.logging.level, "debug");

        let rules = &config.interactions_to_track;
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].verb(), "touching");
        assert_eq!(rules[0].intersection_threshold(), 0.4);
        assert_eq!(rules[1].verb(), "interacting with");
        assert_eq!(rules[1].intersection_threshold(), 0.5);
        assert_eq!(rules[2].object_a(), "bottle cap");
        assert_eq!(rules[2].object_b(), "bottle");
        assert_eq!(rules[2].verb(), "attached to");
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::from_yaml_str("{}").unwrap();
        assert_eq!(config.world_state, TrackerConfig::default());
        assert!(config.new_instances_to_track.is_empty());
        assert!(config.interactions_to_track.is_empty());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_build_tracker_registers_everything() {
        let tracker = Config::from_yaml_str(SAMPLE).unwrap().build_tracker().unwrap();

        assert_eq!(tracker.config().confirmation_threshold, 3);
        assert_eq!(
            tracker.registered_new_instance_types().collect::<Vec<_>>(),
            vec!["petri dish filled"]
        );
        assert_eq!(tracker.instance_count("petri dish filled").unwrap(), 0);
        assert_eq!(tracker.interaction_rules().len(), 3);
        assert_eq!(tracker.interaction_rules()[2].verb, "attached to");
    }

    #[test]
    fn test_invalid_threshold_is_a_configuration_error() {
        let yaml = "interactions_to_track:\n  - [hand, dish, touching, 1.5]\n";
        assert!(matches!(
            Config::from_yaml_str(yaml),
            Err(TrackerError::Configuration(_))
        ));

        let config = Config {
            interactions_to_track: vec![InteractionConfig::Compact(
                "hand".into(),
                "dish".into(),
                "touching".into(),
                0.0,
            )],
            ..Config::default()
        };
        assert!(config.validate().is_err());
        assert!(config.build_tracker().is_err());
    }

    #[test]
    fn test_invalid_world_state_is_rejected() {
        let yaml = "world_state:\n  confirmation_threshold: 0\n";
        assert!(matches!(
            Config::from_yaml_str(yaml),
            Err(TrackerError::Configuration(_))
        ));
    }

    #[test]
    fn test_malformed_yaml_is_reported() {
        assert!(matches!(
            Config::from_yaml_str("world_state: [1, 2"),
            Err(TrackerError::Yaml(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.interactions_to_track.len(), 3);

        assert!(matches!(
            Config::load(dir.path().join("missing.yaml")),
            Err(TrackerError::Io(_))
        ));
    }
}
