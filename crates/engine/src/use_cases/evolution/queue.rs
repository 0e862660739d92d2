//! Suggestion intake.

use taleweaver_domain::{
    clamp_unit, CreateEvolutionInput, EvolutionChange, EvolutionEvent, EvolutionSuggestion, GameId,
    NarrativeEventRef, PendingEvolution,
};

use super::{EvolutionError, EvolutionService};

impl EvolutionService {
    /// Queue suggestions produced for one narrative event.
    ///
    /// Trait additions the subject already holds, or that are already
    /// waiting for review, are dropped. Relationship changes are frozen
    /// against the current value. Returns only the records actually queued.
    pub async fn detect_evolutions(
        &self,
        game_id: GameId,
        event: NarrativeEventRef,
        suggestions: Vec<EvolutionSuggestion>,
    ) -> Result<Vec<PendingEvolution>, EvolutionError> {
        if event.game_id != game_id {
            return Err(EvolutionError::Validation(format!(
                "event {} belongs to game {}, not {}",
                event.id, event.game_id, game_id
            )));
        }
        if suggestions.is_empty() {
            return Ok(Vec::new());
        }

        let _guard = self.locks.lock(game_id).await;
        let mut created = Vec::new();

        for suggestion in suggestions {
            let Some(input) = self.prepare(game_id, &event, suggestion).await? else {
                continue;
            };
            let evolution = PendingEvolution::new(input, self.clock.now());
            self.evolutions.insert(&evolution).await?;
            tracing::info!(
                game_id = %game_id,
                evolution_id = %evolution.id,
                evolution_type = %evolution.evolution_type(),
                subject = %evolution.subject,
                "Queued evolution for DM review"
            );
            // Announced per record; a later insert failure must not hide this one.
            self.publish(EvolutionEvent::Created(evolution.clone()));
            created.push(evolution);
        }

        Ok(created)
    }

    /// Build the queue input for one suggestion, or `None` if it is a duplicate.
    async fn prepare(
        &self,
        game_id: GameId,
        event: &NarrativeEventRef,
        suggestion: EvolutionSuggestion,
    ) -> Result<Option<CreateEvolutionInput>, EvolutionError> {
        let (subject, change, reason) = match suggestion {
            EvolutionSuggestion::TraitAdd {
                subject,
                trait_name,
                reason,
            } => {
                let held = self.traits.find_active(game_id, &subject).await?;
                if held.iter().any(|t| t.matches(&trait_name)) {
                    tracing::debug!(subject = %subject, trait_name = %trait_name, "Trait already held, skipping");
                    return Ok(None);
                }
                if self
                    .evolutions
                    .find_pending_by_entity_trait(game_id, &subject, &trait_name)
                    .await?
                    .is_some()
                {
                    tracing::debug!(subject = %subject, trait_name = %trait_name, "Trait already pending, skipping");
                    return Ok(None);
                }
                (subject, EvolutionChange::TraitAdd { trait_name }, reason)
            }
            EvolutionSuggestion::TraitRemove {
                subject,
                trait_name,
                reason,
            } => (subject, EvolutionChange::TraitRemove { trait_name }, reason),
            EvolutionSuggestion::RelationshipChange {
                subject,
                target,
                dimension,
                change,
                reason,
            } => {
                let current = self
                    .relationships
                    .get(game_id, &subject, &target)
                    .await?
                    .get(dimension);
                let old_value = clamp_unit(current);
                let change = EvolutionChange::RelationshipChange {
                    target,
                    dimension,
                    old_value,
                    new_value: clamp_unit(old_value + change),
                };
                (subject, change, reason)
            }
        };

        Ok(Some(CreateEvolutionInput {
            game_id,
            turn: event.turn,
            subject,
            change,
            reason,
            source_event_id: Some(event.id),
        }))
    }
}
