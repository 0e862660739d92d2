//! Relationship detection and aggregation.

use serde::{Deserialize, Serialize};

use super::catalog::{contains_keyword, RELATIONSHIP_CATALOG};
use super::DetectionConfig;
use crate::entity::{EntityRef, EntityType};
use crate::evolution::{CreateEvolutionInput, EvolutionChange, EvolutionSuggestion};
use crate::ids::{GameId, NarrativeEventId};
use crate::narrative::NarrativeEvent;
use crate::relationship::{clamp_unit, RelationshipDimension};

/// Number of contributing reasons quoted in an aggregated detection.
const MAX_AGGREGATE_REASONS: usize = 2;

/// Float slack for the significance comparison; sums of catalog deltas are inexact.
const SIGNIFICANCE_EPSILON: f64 = 1e-9;

/// A proposed change to `from`'s view of `to` along one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDetection {
    pub from: EntityRef,
    pub to: EntityRef,
    pub dimension: RelationshipDimension,
    pub change: f64,
    pub reason: String,
    pub source_event_id: Option<NarrativeEventId>,
    pub turn: u32,
}

impl RelationshipDetection {
    pub fn to_suggestion(&self) -> EvolutionSuggestion {
        EvolutionSuggestion::RelationshipChange {
            subject: self.from.clone(),
            target: self.to.clone(),
            dimension: self.dimension,
            change: self.change,
            reason: self.reason.clone(),
        }
    }
}

/// Queue input for a relationship detection against the current dimension value.
///
/// `new_value` is `current_value + change`, clamped into `[0, 1]`.
pub fn relationship_detection_to_evolution_input(
    detection: &RelationshipDetection,
    game_id: GameId,
    current_value: f64,
) -> CreateEvolutionInput {
    let old_value = clamp_unit(current_value);
    CreateEvolutionInput {
        game_id,
        turn: detection.turn,
        subject: detection.from.clone(),
        change: EvolutionChange::RelationshipChange {
            target: detection.to.clone(),
            dimension: detection.dimension,
            old_value,
            new_value: clamp_unit(old_value + detection.change),
        },
        reason: detection.reason.clone(),
        source_event_id: detection.source_event_id,
    }
}

pub(super) fn from_event(
    event: &NarrativeEvent,
    actor: &EntityRef,
    target: Option<&EntityRef>,
    witness_factor: f64,
) -> Vec<RelationshipDetection> {
    let content = event.content.to_lowercase();
    let matched: Vec<_> = RELATIONSHIP_CATALOG
        .iter()
        .filter(|(keyword, _)| contains_keyword(&content, keyword))
        .collect();

    if matched.is_empty() {
        return Vec::new();
    }

    let mut detections = Vec::new();
    match target {
        Some(target) => {
            for (keyword, impacts) in &matched {
                for (dimension, delta) in impacts.iter() {
                    detections.push(RelationshipDetection {
                        from: target.clone(),
                        to: actor.clone(),
                        dimension: *dimension,
                        change: *delta,
                        reason: format!(
                            "Turn {}: {} reacted to \"{}\" by {}",
                            event.turn, target, keyword, actor
                        ),
                        source_event_id: Some(event.id),
                        turn: event.turn,
                    });
                }
            }
        }
        None => {
            let witnesses = event
                .witnesses
                .iter()
                .map(|id| EntityRef::new(EntityType::Npc, id.clone()))
                .filter(|witness| witness != actor);
            for witness in witnesses {
                for (keyword, impacts) in &matched {
                    for (dimension, delta) in impacts.iter() {
                        detections.push(RelationshipDetection {
                            from: witness.clone(),
                            to: actor.clone(),
                            dimension: *dimension,
                            change: delta * witness_factor,
                            reason: format!(
                                "Turn {}: {} witnessed \"{}\" by {}",
                                event.turn, witness, keyword, actor
                            ),
                            source_event_id: Some(event.id),
                            turn: event.turn,
                        });
                    }
                }
            }
        }
    }
    detections
}

pub(super) fn aggregate(
    events: &[NarrativeEvent],
    actor: &EntityRef,
    target: &EntityRef,
    config: &DetectionConfig,
) -> Vec<RelationshipDetection> {
    struct Tally<'a> {
        sum: f64,
        reasons: Vec<String>,
        latest: Option<&'a NarrativeEvent>,
    }

    let mut tallies: Vec<(RelationshipDimension, Tally)> = RelationshipDimension::ALL
        .iter()
        .map(|d| {
            (
                *d,
                Tally {
                    sum: 0.0,
                    reasons: Vec::new(),
                    latest: None,
                },
            )
        })
        .collect();

    for event in events {
        for detection in from_event(event, actor, Some(target), config.witness_factor) {
            if let Some((_, tally)) = tallies.iter_mut().find(|(d, _)| *d == detection.dimension) {
                tally.sum += detection.change;
                tally.reasons.push(detection.reason);
                if tally.latest.map_or(true, |e| e.turn <= event.turn) {
                    tally.latest = Some(event);
                }
            }
        }
    }

    tallies
        .into_iter()
        .filter(|(_, tally)| {
            tally.sum.abs() + SIGNIFICANCE_EPSILON >= config.significance_threshold
        })
        .map(|(dimension, tally)| {
            let mut reason = tally
                .reasons
                .iter()
                .take(MAX_AGGREGATE_REASONS)
                .cloned()
                .collect::<Vec<_>>()
                .join("; ");
            if tally.reasons.len() > MAX_AGGREGATE_REASONS {
                reason.push_str("; ...");
            }
            RelationshipDetection {
                from: target.clone(),
                to: actor.clone(),
                dimension,
                change: tally.sum,
                reason,
                source_event_id: tally.latest.map(|e| e.id),
                turn: tally.latest.map_or(0, |e| e.turn),
            }
        })
        .collect()
}
