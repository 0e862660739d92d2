//! Read-side queries: the review queue, entity summaries and labels.

use serde::Serialize;
use taleweaver_domain::{
    compute_labels, EntityRef, EntityType, GameId, PendingEvolution, Relationship,
    RelationshipLabel, RelationshipLabels,
};

use super::{EvolutionError, EvolutionService};

/// An entity's active traits and how it regards everyone it has a relationship with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySummary {
    pub traits: Vec<String>,
    pub relationships: Vec<RelationshipSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipSummary {
    pub target_type: EntityType,
    pub target_id: String,
    pub label: RelationshipLabel,
    pub labels: RelationshipLabels,
}

impl RelationshipSummary {
    fn from_relationship(relationship: &Relationship) -> Self {
        let labels = relationship.labels();
        Self {
            target_type: relationship.to.entity_type,
            target_id: relationship.to.entity_id.clone(),
            label: labels.primary,
            labels,
        }
    }
}

impl EvolutionService {
    /// Records for a game, oldest first.
    pub async fn get_pending_evolutions(
        &self,
        game_id: GameId,
        pending_only: bool,
    ) -> Result<Vec<PendingEvolution>, EvolutionError> {
        Ok(self.evolutions.list(game_id, pending_only).await?)
    }

    /// Every evolution ever proposed for `entity`, newest first.
    pub async fn get_entity_history(
        &self,
        game_id: GameId,
        entity: &EntityRef,
    ) -> Result<Vec<PendingEvolution>, EvolutionError> {
        Ok(self.evolutions.list_for_entity(game_id, entity).await?)
    }

    pub async fn get_entity_summary(
        &self,
        game_id: GameId,
        entity: &EntityRef,
    ) -> Result<EntitySummary, EvolutionError> {
        let traits = self
            .traits
            .find_active(game_id, entity)
            .await?
            .into_iter()
            .map(|t| t.name)
            .collect();
        let relationships = self
            .relationships
            .list_from(game_id, entity)
            .await?
            .iter()
            .map(RelationshipSummary::from_relationship)
            .collect();

        Ok(EntitySummary {
            traits,
            relationships,
        })
    }

    pub fn compute_aggregate_label(&self, relationship: &Relationship) -> RelationshipLabel {
        compute_labels(&relationship.values).primary
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::harness;
    use super::*;
    use crate::infrastructure::ports::{RelationshipRepo, TraitRepo};
    use chrono::Utc;
    use taleweaver_domain::{DimensionUpdate, EvolutionSuggestion, NarrativeEvent, RelationshipDimension};

    #[tokio::test]
    async fn summary_combines_traits_and_labelled_relationships() {
        let h = harness();
        let game = GameId::new();
        let mira = EntityRef::npc("mira");
        let player = EntityRef::player("player-1");
        h.traits.add(game, &mira, "loyal", 1).await.unwrap();
        h.relationships
            .upsert(
                game,
                &mira,
                &player,
                4,
                DimensionUpdate::new()
                    .with(RelationshipDimension::Trust, 0.9)
                    .with(RelationshipDimension::Respect, 0.85)
                    .with(RelationshipDimension::Affection, 0.9),
            )
            .await
            .unwrap();
        h.relationships
            .upsert(
                game,
                &mira,
                &EntityRef::npc("bandit-chief"),
                4,
                DimensionUpdate::single(RelationshipDimension::Fear, 0.8),
            )
            .await
            .unwrap();

        let summary = h.service.get_entity_summary(game, &mira).await.unwrap();

        assert_eq!(summary.traits, vec!["loyal".to_string()]);
        assert_eq!(summary.relationships.len(), 2);
        let toward_player = &summary.relationships[0];
        assert_eq!(toward_player.target_type, EntityType::Player);
        assert_eq!(toward_player.target_id, "player-1");
        assert_eq!(toward_player.label, RelationshipLabel::Devoted);
        assert_eq!(toward_player.labels.summary, "Deeply devoted and loyal");
        assert_eq!(summary.relationships[1].label, RelationshipLabel::Terrified);
    }

    #[tokio::test]
    async fn summary_for_unknown_entity_is_empty() {
        let h = harness();
        let summary = h
            .service
            .get_entity_summary(GameId::new(), &EntityRef::npc("nobody"))
            .await
            .unwrap();

        assert!(summary.traits.is_empty());
        assert!(summary.relationships.is_empty());
    }

    #[tokio::test]
    async fn history_includes_resolved_records_newest_first() {
        let h = harness();
        let game = GameId::new();
        let player = EntityRef::player("player-1");
        let suggestions = ["bitter", "hopeful"]
            .into_iter()
            .map(|t| EvolutionSuggestion::TraitAdd {
                subject: player.clone(),
                trait_name: t.into(),
                reason: "mood".into(),
            })
            .collect();
        let event = NarrativeEvent::new(game, 3, "Rain.").event_ref();
        let queued = h
            .service
            .detect_evolutions(game, event, suggestions)
            .await
            .unwrap();
        h.service.refuse(queued[0].id, None).await.unwrap();

        let history = h.service.get_entity_history(game, &player).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, queued[1].id);

        let pending = h.service.get_pending_evolutions(game, true).await.unwrap();
        assert_eq!(pending.len(), 1);
        let all = h.service.get_pending_evolutions(game, false).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn aggregate_label_delegates_to_label_rules() {
        let h = harness();
        let mut rel = Relationship::with_defaults(
            GameId::new(),
            EntityRef::npc("guard"),
            EntityRef::player("player-1"),
            Utc::now(),
        );
        assert_eq!(h.service.compute_aggregate_label(&rel), RelationshipLabel::Indifferent);

        rel.values.fear = 0.8;
        rel.values.resentment = 0.6;
        assert_eq!(h.service.compute_aggregate_label(&rel), RelationshipLabel::Terrified);
    }
}
