//! Rule-based detection of trait and relationship changes in narrative text.
//!
//! Everything here is pure: detectors read events and return proposals,
//! they never touch storage. Absence of matches yields an empty result.
//!
//! - [`detect_traits_from_event`] - keyword hits in a single event
//! - [`detect_traits_from_patterns`] - repeated behavior across a window of events
//! - [`detect_relationships_from_event`] - dimension impacts on a target or witnesses
//! - [`aggregate_relationship_changes`] - summed impacts for one actor/target pair

pub mod catalog;
mod relationships;
mod traits;

use serde::{Deserialize, Serialize};

use crate::entity::EntityRef;
use crate::narrative::NarrativeEvent;

pub use catalog::{contains_keyword, RELATIONSHIP_CATALOG, TRAIT_CATALOG};
pub use relationships::{relationship_detection_to_evolution_input, RelationshipDetection};
pub use traits::{trait_detection_to_evolution_input, TraitDetection};

/// Tunable thresholds for the detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Distinct matching events needed before a pattern becomes a trait.
    pub pattern_threshold: usize,
    /// Minimum absolute summed change for an aggregated dimension.
    pub significance_threshold: f64,
    /// Magnitude multiplier for impacts on bystanders.
    pub witness_factor: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            pattern_threshold: 3,
            significance_threshold: 0.1,
            witness_factor: 0.5,
        }
    }
}

/// Detector bound to a configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedDetector {
    config: DetectionConfig,
}

impl RuleBasedDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn traits_from_event(&self, event: &NarrativeEvent, actor: &EntityRef) -> Vec<TraitDetection> {
        traits::from_event(event, actor)
    }

    pub fn traits_from_patterns(
        &self,
        events: &[NarrativeEvent],
        actor: &EntityRef,
    ) -> Vec<TraitDetection> {
        traits::from_patterns(events, actor, self.config.pattern_threshold)
    }

    pub fn relationships_from_event(
        &self,
        event: &NarrativeEvent,
        actor: &EntityRef,
        target: Option<&EntityRef>,
    ) -> Vec<RelationshipDetection> {
        relationships::from_event(event, actor, target, self.config.witness_factor)
    }

    pub fn aggregate_relationships(
        &self,
        events: &[NarrativeEvent],
        actor: &EntityRef,
        target: &EntityRef,
    ) -> Vec<RelationshipDetection> {
        relationships::aggregate(events, actor, target, &self.config)
    }
}

/// Trait detections for `actor` in a single event, at most one per category.
pub fn detect_traits_from_event(event: &NarrativeEvent, actor: &EntityRef) -> Vec<TraitDetection> {
    RuleBasedDetector::default().traits_from_event(event, actor)
}

/// Trait detections for categories matched by at least `threshold` distinct events.
pub fn detect_traits_from_patterns(
    events: &[NarrativeEvent],
    actor: &EntityRef,
    threshold: usize,
) -> Vec<TraitDetection> {
    traits::from_patterns(events, actor, threshold)
}

/// Relationship impacts of one event, seen by `target` or else by the witnesses.
pub fn detect_relationships_from_event(
    event: &NarrativeEvent,
    actor: &EntityRef,
    target: Option<&EntityRef>,
) -> Vec<RelationshipDetection> {
    RuleBasedDetector::default().relationships_from_event(event, actor, target)
}

/// Significant summed impacts of `events` on `target`'s view of `actor`.
pub fn aggregate_relationship_changes(
    events: &[NarrativeEvent],
    actor: &EntityRef,
    target: &EntityRef,
) -> Vec<RelationshipDetection> {
    RuleBasedDetector::default().aggregate_relationships(events, actor, target)
}
