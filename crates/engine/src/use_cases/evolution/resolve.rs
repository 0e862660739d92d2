//! DM resolution: approve, edit, refuse.

use taleweaver_domain::common::none_if_blank;
use taleweaver_domain::{
    clamp_unit, DimensionUpdate, EvolutionChange, EvolutionEdit, EvolutionEvent, EvolutionId,
    EvolutionStatus, PendingEvolution,
};

use super::{EvolutionError, EvolutionService};

/// Differences below this are rounding, not drift.
const DRIFT_EPSILON: f64 = 1e-9;

impl EvolutionService {
    /// Apply the proposed change as queued.
    pub async fn approve(
        &self,
        id: EvolutionId,
        dm_notes: Option<String>,
    ) -> Result<PendingEvolution, EvolutionError> {
        self.resolve(id, EvolutionStatus::Approved, None, dm_notes)
            .await
    }

    /// Merge DM changes into the record, then apply it.
    pub async fn edit(
        &self,
        id: EvolutionId,
        changes: EvolutionEdit,
        dm_notes: Option<String>,
    ) -> Result<PendingEvolution, EvolutionError> {
        self.resolve(id, EvolutionStatus::Edited, Some(&changes), dm_notes)
            .await
    }

    /// Close the record without touching traits or relationships.
    pub async fn refuse(
        &self,
        id: EvolutionId,
        dm_notes: Option<String>,
    ) -> Result<PendingEvolution, EvolutionError> {
        self.resolve(id, EvolutionStatus::Refused, None, dm_notes)
            .await
    }

    async fn resolve(
        &self,
        id: EvolutionId,
        status: EvolutionStatus,
        edit: Option<&EvolutionEdit>,
        dm_notes: Option<String>,
    ) -> Result<PendingEvolution, EvolutionError> {
        let game_id = self.load(id).await?.game_id;
        let _guard = self.locks.lock(game_id).await;

        // Re-read under the lock; a concurrent resolution may have won.
        let mut evolution = self.load(id).await?;
        if !evolution.is_pending() {
            return Err(EvolutionError::InvalidStatus {
                id,
                status: evolution.status,
            });
        }

        let queued = evolution.clone();
        if let Some(edit) = edit {
            evolution.apply_edit(edit)?;
        }
        evolution.resolve(status, none_if_blank(dm_notes), self.clock.now())?;

        // The record is closed before state changes; if the change cannot be
        // applied it is reopened, so state is never ahead of the record.
        self.evolutions.update(&evolution).await?;
        if status != EvolutionStatus::Refused {
            if let Err(e) = self.apply_change(&evolution).await {
                self.reopen(&queued).await;
                return Err(e);
            }
        }

        tracing::info!(
            game_id = %evolution.game_id,
            evolution_id = %id,
            status = %status,
            "Evolution resolved"
        );
        self.publish(EvolutionEvent::for_status(evolution.clone()));
        Ok(evolution)
    }

    /// Restore a record to its queued form after a failed apply.
    async fn reopen(&self, queued: &PendingEvolution) {
        if let Err(e) = self.evolutions.update(queued).await {
            tracing::error!(
                evolution_id = %queued.id,
                error = %e,
                "Failed to reopen evolution after its change could not be applied"
            );
        }
    }

    async fn load(&self, id: EvolutionId) -> Result<PendingEvolution, EvolutionError> {
        self.evolutions
            .find_by_id(id)
            .await?
            .ok_or(EvolutionError::NotFound(id))
    }

    /// Write the record's change to the trait or relationship store.
    async fn apply_change(&self, evolution: &PendingEvolution) -> Result<(), EvolutionError> {
        let game_id = evolution.game_id;
        let subject = &evolution.subject;

        match &evolution.change {
            EvolutionChange::TraitAdd { trait_name } => {
                self.traits
                    .add(game_id, subject, trait_name, evolution.turn)
                    .await?;
            }
            EvolutionChange::TraitRemove { trait_name } => {
                self.traits.remove(game_id, subject, trait_name).await?;
            }
            EvolutionChange::RelationshipChange {
                target,
                dimension,
                old_value,
                new_value,
            } => {
                let current = self
                    .relationships
                    .get(game_id, subject, target)
                    .await?
                    .get(*dimension);
                if (current - old_value).abs() > DRIFT_EPSILON {
                    tracing::warn!(
                        evolution_id = %evolution.id,
                        dimension = %dimension,
                        queued = old_value,
                        current,
                        "Relationship changed since the evolution was queued; applying queued value"
                    );
                }
                self.relationships
                    .upsert(
                        game_id,
                        subject,
                        target,
                        evolution.turn,
                        DimensionUpdate::single(*dimension, clamp_unit(*new_value)),
                    )
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{harness, Harness};
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::memory::InMemoryEvolutionRepo;
    use crate::infrastructure::ports::{
        MockEvolutionEventPublisher, MockPendingEvolutionRepo, MockRelationshipRepo,
        MockTraitRepo, PendingEvolutionRepo, RelationshipRepo, RepoError, TraitRepo,
    };
    use crate::stores::GameLocks;
    use chrono::Utc;
    use mockall::predicate::*;
    use mockall::Sequence;
    use std::sync::Arc;
    use taleweaver_domain::{
        CreateEvolutionInput, EntityRef, EvolutionSuggestion, GameId, NarrativeEvent,
        RelationshipDimension, RuleBasedDetector, Trait,
    };

    fn pending_trait_add(game: GameId, subject: EntityRef, name: &str) -> PendingEvolution {
        PendingEvolution::new(
            CreateEvolutionInput {
                game_id: game,
                turn: 2,
                subject,
                change: EvolutionChange::TraitAdd {
                    trait_name: name.into(),
                },
                reason: "stood their ground".into(),
                source_event_id: None,
            },
            Utc::now(),
        )
    }

    async fn queue(
        h: &Harness,
        game: GameId,
        suggestion: EvolutionSuggestion,
    ) -> PendingEvolution {
        let event = NarrativeEvent::new(game, 6, "Something happened.").event_ref();
        h.service
            .detect_evolutions(game, event, vec![suggestion])
            .await
            .unwrap()
            .remove(0)
    }

    fn trait_add(subject: &EntityRef, name: &str) -> EvolutionSuggestion {
        EvolutionSuggestion::TraitAdd {
            subject: subject.clone(),
            trait_name: name.into(),
            reason: "showed mercy".into(),
        }
    }

    #[tokio::test]
    async fn approving_trait_add_makes_trait_active() {
        let h = harness();
        let game = GameId::new();
        let player = EntityRef::player("player-1");
        let queued = queue(&h, game, trait_add(&player, "merciful")).await;

        let approved = h
            .service
            .approve(queued.id, Some("Good call".into()))
            .await
            .unwrap();

        assert_eq!(approved.status, EvolutionStatus::Approved);
        assert_eq!(approved.dm_notes.as_deref(), Some("Good call"));
        assert!(approved.resolved_at.is_some());
        let active = h.traits.find_active(game, &player).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "merciful");
        assert_eq!(active[0].acquired_turn, 6);
    }

    #[tokio::test]
    async fn refusing_leaves_traits_unchanged() {
        let h = harness();
        let game = GameId::new();
        let player = EntityRef::player("player-1");
        let queued = queue(&h, game, trait_add(&player, "merciful")).await;

        let refused = h.service.refuse(queued.id, Some("  ".into())).await.unwrap();

        assert_eq!(refused.status, EvolutionStatus::Refused);
        assert_eq!(refused.dm_notes, None);
        assert!(h.traits.find_active(game, &player).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_resolution_is_invalid_status() {
        let h = harness();
        let game = GameId::new();
        let queued = queue(&h, game, trait_add(&EntityRef::player("player-1"), "bitter")).await;

        h.service.approve(queued.id, None).await.unwrap();

        for result in [
            h.service.approve(queued.id, None).await,
            h.service.refuse(queued.id, None).await,
            h.service
                .edit(queued.id, EvolutionEdit::default(), None)
                .await,
        ] {
            match result {
                Err(EvolutionError::InvalidStatus { id, status }) => {
                    assert_eq!(id, queued.id);
                    assert_eq!(status, EvolutionStatus::Approved);
                }
                other => panic!("expected InvalidStatus, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let h = harness();
        let missing = EvolutionId::new();

        let err = h.service.refuse(missing, None).await.unwrap_err();

        assert!(matches!(err, EvolutionError::NotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn approving_duplicate_trait_is_a_no_op() {
        let h = harness();
        let game = GameId::new();
        let player = EntityRef::player("player-1");
        let queued = queue(&h, game, trait_add(&player, "hopeful")).await;
        // Trait granted through another path while the record waited.
        h.traits.add(game, &player, "Hopeful", 3).await.unwrap();

        h.service.approve(queued.id, None).await.unwrap();

        let active = h.traits.find_active(game, &player).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Hopeful");
    }

    #[tokio::test]
    async fn approving_trait_remove_deactivates_trait() {
        let h = harness();
        let game = GameId::new();
        let player = EntityRef::player("player-1");
        h.traits.add(game, &player, "naive", 1).await.unwrap();
        let queued = queue(
            &h,
            game,
            EvolutionSuggestion::TraitRemove {
                subject: player.clone(),
                trait_name: "Naive".into(),
                reason: "learned the hard way".into(),
            },
        )
        .await;

        h.service.approve(queued.id, None).await.unwrap();

        assert!(h.traits.find_active(game, &player).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn approval_applies_frozen_value_despite_drift() {
        let h = harness();
        let game = GameId::new();
        let mira = EntityRef::npc("mira");
        let player = EntityRef::player("player-1");
        let queued = queue(
            &h,
            game,
            EvolutionSuggestion::RelationshipChange {
                subject: mira.clone(),
                target: player.clone(),
                dimension: RelationshipDimension::Trust,
                change: -0.3,
                reason: "betrayal".into(),
            },
        )
        .await;
        // Relationship moves before the DM gets to it.
        h.relationships
            .upsert(
                game,
                &mira,
                &player,
                7,
                DimensionUpdate::single(RelationshipDimension::Trust, 0.9),
            )
            .await
            .unwrap();

        h.service.approve(queued.id, None).await.unwrap();

        let trust = h
            .relationships
            .get(game, &mira, &player)
            .await
            .unwrap()
            .get(RelationshipDimension::Trust);
        assert!((trust - 0.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn edit_applies_edited_values() {
        let h = harness();
        let game = GameId::new();
        let mira = EntityRef::npc("mira");
        let player = EntityRef::player("player-1");
        let queued = queue(
            &h,
            game,
            EvolutionSuggestion::RelationshipChange {
                subject: mira.clone(),
                target: player.clone(),
                dimension: RelationshipDimension::Fear,
                change: 0.15,
                reason: "threatened".into(),
            },
        )
        .await;

        let edited = h
            .service
            .edit(
                queued.id,
                EvolutionEdit {
                    dimension: Some(RelationshipDimension::Respect),
                    new_value: Some(1.4),
                    reason: Some("stood firm".into()),
                    ..Default::default()
                },
                Some("respect, not fear".into()),
            )
            .await
            .unwrap();

        assert_eq!(edited.status, EvolutionStatus::Edited);
        assert_eq!(edited.reason, "stood firm");
        let rel = h.relationships.get(game, &mira, &player).await.unwrap();
        assert_eq!(rel.get(RelationshipDimension::Respect), 1.0);
        assert_eq!(rel.get(RelationshipDimension::Fear), 0.0);
    }

    #[tokio::test]
    async fn invalid_edit_leaves_record_pending() {
        let h = harness();
        let game = GameId::new();
        let queued = queue(&h, game, trait_add(&EntityRef::player("player-1"), "cunning")).await;

        let err = h
            .service
            .edit(
                queued.id,
                EvolutionEdit {
                    dimension: Some(RelationshipDimension::Trust),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EvolutionError::Validation(_)));
        let stored = h.service.get_pending_evolutions(game, true).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, EvolutionStatus::Pending);
    }

    #[tokio::test]
    async fn refuse_never_touches_stores() {
        let game = GameId::new();
        let pending = PendingEvolution::new(
            CreateEvolutionInput {
                game_id: game,
                turn: 2,
                subject: EntityRef::npc("mira"),
                change: EvolutionChange::TraitAdd {
                    trait_name: "feared".into(),
                },
                reason: "whispers".into(),
                source_event_id: None,
            },
            Utc::now(),
        );
        let id = pending.id;

        let mut evolutions = MockPendingEvolutionRepo::new();
        let stored = pending.clone();
        evolutions
            .expect_find_by_id()
            .with(eq(id))
            .times(2)
            .returning(move |_| Ok(Some(stored.clone())));
        evolutions
            .expect_update()
            .withf(|e| e.status == EvolutionStatus::Refused)
            .times(1)
            .returning(|_| Ok(()));

        // No expectations: any trait or relationship call fails the test.
        let traits = MockTraitRepo::new();
        let relationships = MockRelationshipRepo::new();

        let mut publisher = MockEvolutionEventPublisher::new();
        publisher
            .expect_publish()
            .withf(|event| event.name() == "evolution:refused")
            .times(1)
            .returning(|_| Ok(()));

        let service = EvolutionService::new(
            Arc::new(traits),
            Arc::new(relationships),
            Arc::new(evolutions),
            Arc::new(publisher),
            Arc::new(FixedClock(Utc::now())),
            Arc::new(GameLocks::new()),
            RuleBasedDetector::default(),
        );

        let refused = service.refuse(id, Some("not yet".into())).await.unwrap();
        assert_eq!(refused.status, EvolutionStatus::Refused);
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_repo_error() {
        let game = GameId::new();
        let pending = PendingEvolution::new(
            CreateEvolutionInput {
                game_id: game,
                turn: 2,
                subject: EntityRef::player("player-1"),
                change: EvolutionChange::TraitAdd {
                    trait_name: "brave".into(),
                },
                reason: "charged the line".into(),
                source_event_id: None,
            },
            Utc::now(),
        );
        let id = pending.id;

        let mut evolutions = MockPendingEvolutionRepo::new();
        evolutions
            .expect_find_by_id()
            .returning(move |_| Ok(Some(pending.clone())));
        let mut seq = Sequence::new();
        evolutions
            .expect_update()
            .withf(|e| e.status == EvolutionStatus::Approved)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        // Reopened once the trait write fails.
        evolutions
            .expect_update()
            .withf(|e| e.status == EvolutionStatus::Pending && e.resolved_at.is_none())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let mut traits = MockTraitRepo::new();
        traits
            .expect_add()
            .returning(|_, _, _, _| Err(RepoError::database("add_trait", "disk I/O error")));

        let service = EvolutionService::new(
            Arc::new(traits),
            Arc::new(MockRelationshipRepo::new()),
            Arc::new(evolutions),
            Arc::new(MockEvolutionEventPublisher::new()),
            Arc::new(FixedClock(Utc::now())),
            Arc::new(GameLocks::new()),
            RuleBasedDetector::default(),
        );

        let err = service.approve(id, None).await.unwrap_err();
        assert!(matches!(err, EvolutionError::Repo(RepoError::Database { .. })));
    }

    #[tokio::test]
    async fn failed_record_write_applies_nothing_and_stays_refusable() {
        let game = GameId::new();
        let pending = pending_trait_add(game, EntityRef::player("player-1"), "bitter");
        let id = pending.id;

        let mut evolutions = MockPendingEvolutionRepo::new();
        evolutions
            .expect_find_by_id()
            .returning(move |_| Ok(Some(pending.clone())));
        let mut seq = Sequence::new();
        evolutions
            .expect_update()
            .withf(|e| e.status == EvolutionStatus::Approved)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(RepoError::database("update_evolution", "database is locked")));
        evolutions
            .expect_update()
            .withf(|e| e.status == EvolutionStatus::Refused)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        // No expectations: the failed approval must not reach the trait store.
        let traits = MockTraitRepo::new();

        let mut publisher = MockEvolutionEventPublisher::new();
        publisher
            .expect_publish()
            .withf(|event| event.name() == "evolution:refused")
            .times(1)
            .returning(|_| Ok(()));

        let service = EvolutionService::new(
            Arc::new(traits),
            Arc::new(MockRelationshipRepo::new()),
            Arc::new(evolutions),
            Arc::new(publisher),
            Arc::new(FixedClock(Utc::now())),
            Arc::new(GameLocks::new()),
            RuleBasedDetector::default(),
        );

        let err = service.approve(id, None).await.unwrap_err();
        assert!(matches!(err, EvolutionError::Repo(RepoError::Database { .. })));

        let refused = service.refuse(id, None).await.unwrap();
        assert_eq!(refused.status, EvolutionStatus::Refused);
    }

    #[tokio::test]
    async fn failed_apply_reopens_record_for_retry() {
        let h = harness();
        let game = GameId::new();
        let player = EntityRef::player("player-1");
        let queued = queue(&h, game, trait_add(&player, "hopeful")).await;

        let mut traits = MockTraitRepo::new();
        traits
            .expect_add()
            .times(1)
            .returning(|_, _, _, _| Err(RepoError::database("add_trait", "disk I/O error")));
        let service = EvolutionService::new(
            Arc::new(traits),
            h.relationships.clone(),
            h.evolutions.clone(),
            Arc::new(MockEvolutionEventPublisher::new()),
            Arc::new(FixedClock(Utc::now())),
            Arc::new(GameLocks::new()),
            RuleBasedDetector::default(),
        );

        assert!(service.approve(queued.id, None).await.is_err());

        let stored = h.evolutions.find_by_id(queued.id).await.unwrap().unwrap();
        assert_eq!(stored, queued);

        // The original stores can still approve it.
        h.service.approve(queued.id, None).await.unwrap();
        assert_eq!(h.traits.find_active(game, &player).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_approvals_apply_once() {
        let game = GameId::new();
        let player = EntityRef::player("player-1");
        let evolutions = Arc::new(InMemoryEvolutionRepo::new());
        let pending = pending_trait_add(game, player.clone(), "steadfast");
        let id = pending.id;
        evolutions.insert(&pending).await.unwrap();

        let mut traits = MockTraitRepo::new();
        traits
            .expect_add()
            .times(1)
            .returning(|game_id, entity, name, turn| {
                Ok(Trait::new(game_id, entity.clone(), name, turn, Utc::now()))
            });
        let mut publisher = MockEvolutionEventPublisher::new();
        publisher
            .expect_publish()
            .withf(|event| event.name() == "evolution:approved")
            .times(1)
            .returning(|_| Ok(()));

        let service = EvolutionService::new(
            Arc::new(traits),
            Arc::new(MockRelationshipRepo::new()),
            evolutions.clone(),
            Arc::new(publisher),
            Arc::new(FixedClock(Utc::now())),
            Arc::new(GameLocks::new()),
            RuleBasedDetector::default(),
        );

        let (first, second) = tokio::join!(service.approve(id, None), service.approve(id, None));

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(
                    r,
                    Err(EvolutionError::InvalidStatus {
                        status: EvolutionStatus::Approved,
                        ..
                    })
                ))
                .count(),
            1
        );
        let stored = evolutions.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status, EvolutionStatus::Approved);
    }
}
