//! Running the rule-based detector and queueing what it finds.

use taleweaver_domain::{EntityRef, EvolutionSuggestion, NarrativeEvent, PendingEvolution, RelationshipDetection};

use super::{EvolutionError, EvolutionService};

impl EvolutionService {
    /// Detect and queue changes implied by a single event.
    ///
    /// With a `target`, relationship impacts are the target's view of the
    /// actor; without one, each witness reacts at reduced strength.
    pub async fn scan_event(
        &self,
        event: &NarrativeEvent,
        actor: &EntityRef,
        target: Option<&EntityRef>,
    ) -> Result<Vec<PendingEvolution>, EvolutionError> {
        let traits = self.detector.traits_from_event(event, actor);
        let relationships = merge_same_dimension(
            self.detector.relationships_from_event(event, actor, target),
        );
        tracing::debug!(
            event_id = %event.id,
            actor = %actor,
            traits = traits.len(),
            relationships = relationships.len(),
            "Scanned narrative event"
        );

        let suggestions = traits
            .iter()
            .map(|d| d.to_suggestion())
            .chain(relationships.iter().map(|d| d.to_suggestion()))
            .collect();
        self.detect_evolutions(event.game_id, event.event_ref(), suggestions)
            .await
    }

    /// Detect and queue repeated behavior across a window of events.
    ///
    /// Records are attributed to the latest event in the window.
    pub async fn scan_window(
        &self,
        events: &[NarrativeEvent],
        actor: &EntityRef,
        target: Option<&EntityRef>,
    ) -> Result<Vec<PendingEvolution>, EvolutionError> {
        let Some(latest) = events.iter().max_by_key(|e| e.turn) else {
            return Ok(Vec::new());
        };
        if events.iter().any(|e| e.game_id != latest.game_id) {
            return Err(EvolutionError::Validation(
                "event window spans more than one game".into(),
            ));
        }

        let traits = self.detector.traits_from_patterns(events, actor);
        let relationships = target
            .map(|target| self.detector.aggregate_relationships(events, actor, target))
            .unwrap_or_default();
        tracing::debug!(
            events = events.len(),
            actor = %actor,
            traits = traits.len(),
            relationships = relationships.len(),
            "Scanned event window"
        );

        let suggestions: Vec<EvolutionSuggestion> = traits
            .iter()
            .map(|d| d.to_suggestion())
            .chain(relationships.iter().map(|d| d.to_suggestion()))
            .collect();
        self.detect_evolutions(latest.game_id, latest.event_ref(), suggestions)
            .await
    }
}

/// Fold detections that hit the same `(from, to, dimension)` into one.
///
/// A single sentence can trip several keywords on one axis ("betrayed ...
/// lied"); queueing them separately would freeze each against the same base.
fn merge_same_dimension(detections: Vec<RelationshipDetection>) -> Vec<RelationshipDetection> {
    let mut merged: Vec<RelationshipDetection> = Vec::with_capacity(detections.len());
    for detection in detections {
        match merged.iter_mut().find(|m| {
            m.from == detection.from && m.to == detection.to && m.dimension == detection.dimension
        }) {
            Some(existing) => {
                existing.change += detection.change;
                existing.reason.push_str("; ");
                existing.reason.push_str(&detection.reason);
            }
            None => merged.push(detection),
        }
    }
    merged
}
