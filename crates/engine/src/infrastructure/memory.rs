//! In-memory repositories for development, replay and tests.
//!
//! Nothing here is persisted; state lives as long as the process.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use taleweaver_domain::{
    DimensionUpdate, EntityRef, EvolutionChange, EvolutionId, GameId, PendingEvolution,
    Relationship, Trait, TraitStatus,
};

use crate::infrastructure::ports::{
    ClockPort, PendingEvolutionRepo, RelationshipRepo, RepoError, TraitRepo,
};

// =============================================================================
// Traits
// =============================================================================

pub struct InMemoryTraitRepo {
    traits: Arc<RwLock<Vec<Trait>>>,
    clock: Arc<dyn ClockPort>,
}

impl InMemoryTraitRepo {
    pub fn new(clock: Arc<dyn ClockPort>) -> Self {
        Self {
            traits: Arc::new(RwLock::new(Vec::new())),
            clock,
        }
    }
}

#[async_trait]
impl TraitRepo for InMemoryTraitRepo {
    async fn find_active(
        &self,
        game_id: GameId,
        entity: &EntityRef,
    ) -> Result<Vec<Trait>, RepoError> {
        let traits = self.traits.read().await;
        Ok(traits
            .iter()
            .filter(|t| t.game_id == game_id && &t.entity == entity && t.is_active())
            .cloned()
            .collect())
    }

    async fn add(
        &self,
        game_id: GameId,
        entity: &EntityRef,
        trait_name: &str,
        turn: u32,
    ) -> Result<Trait, RepoError> {
        let mut traits = self.traits.write().await;
        if let Some(existing) = traits.iter().find(|t| {
            t.game_id == game_id && &t.entity == entity && t.is_active() && t.matches(trait_name)
        }) {
            return Ok(existing.clone());
        }

        let added = Trait::new(
            game_id,
            entity.clone(),
            trait_name.trim(),
            turn,
            self.clock.now(),
        );
        traits.push(added.clone());
        Ok(added)
    }

    async fn remove(
        &self,
        game_id: GameId,
        entity: &EntityRef,
        trait_name: &str,
    ) -> Result<(), RepoError> {
        let mut traits = self.traits.write().await;
        for t in traits.iter_mut().filter(|t| {
            t.game_id == game_id && &t.entity == entity && t.is_active() && t.matches(trait_name)
        }) {
            t.status = TraitStatus::Removed;
        }
        Ok(())
    }
}

// =============================================================================
// Relationships
// =============================================================================

pub struct InMemoryRelationshipRepo {
    relationships: Arc<RwLock<Vec<Relationship>>>,
    clock: Arc<dyn ClockPort>,
}

impl InMemoryRelationshipRepo {
    pub fn new(clock: Arc<dyn ClockPort>) -> Self {
        Self {
            relationships: Arc::new(RwLock::new(Vec::new())),
            clock,
        }
    }
}

fn same_pair(r: &Relationship, game_id: GameId, from: &EntityRef, to: &EntityRef) -> bool {
    r.game_id == game_id && &r.from == from && &r.to == to
}

#[async_trait]
impl RelationshipRepo for InMemoryRelationshipRepo {
    async fn get(
        &self,
        game_id: GameId,
        from: &EntityRef,
        to: &EntityRef,
    ) -> Result<Relationship, RepoError> {
        let relationships = self.relationships.read().await;
        Ok(relationships
            .iter()
            .find(|r| same_pair(r, game_id, from, to))
            .cloned()
            .unwrap_or_else(|| {
                Relationship::with_defaults(game_id, from.clone(), to.clone(), self.clock.now())
            }))
    }

    async fn upsert(
        &self,
        game_id: GameId,
        from: &EntityRef,
        to: &EntityRef,
        turn: u32,
        update: DimensionUpdate,
    ) -> Result<Relationship, RepoError> {
        let now = self.clock.now();
        let mut relationships = self.relationships.write().await;

        if let Some(existing) = relationships
            .iter_mut()
            .find(|r| same_pair(r, game_id, from, to))
        {
            existing.apply(&update, turn, now);
            return Ok(existing.clone());
        }

        let mut created = Relationship::with_defaults(game_id, from.clone(), to.clone(), now);
        created.apply(&update, turn, now);
        relationships.push(created.clone());
        Ok(created)
    }

    async fn list_from(
        &self,
        game_id: GameId,
        from: &EntityRef,
    ) -> Result<Vec<Relationship>, RepoError> {
        let relationships = self.relationships.read().await;
        Ok(relationships
            .iter()
            .filter(|r| r.game_id == game_id && &r.from == from)
            .cloned()
            .collect())
    }
}

// =============================================================================
// Pending Evolution Queue
// =============================================================================

#[derive(Default)]
pub struct InMemoryEvolutionRepo {
    evolutions: Arc<RwLock<Vec<PendingEvolution>>>,
}

impl InMemoryEvolutionRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingEvolutionRepo for InMemoryEvolutionRepo {
    async fn insert(&self, evolution: &PendingEvolution) -> Result<(), RepoError> {
        let mut evolutions = self.evolutions.write().await;
        if evolutions.iter().any(|e| e.id == evolution.id) {
            return Err(RepoError::constraint(format!(
                "evolution {} already exists",
                evolution.id
            )));
        }
        evolutions.push(evolution.clone());
        Ok(())
    }

    async fn update(&self, evolution: &PendingEvolution) -> Result<(), RepoError> {
        let mut evolutions = self.evolutions.write().await;
        let slot = evolutions
            .iter_mut()
            .find(|e| e.id == evolution.id)
            .ok_or_else(|| RepoError::not_found("PendingEvolution", evolution.id))?;
        *slot = evolution.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: EvolutionId) -> Result<Option<PendingEvolution>, RepoError> {
        let evolutions = self.evolutions.read().await;
        Ok(evolutions.iter().find(|e| e.id == id).cloned())
    }

    async fn find_pending_by_entity_trait(
        &self,
        game_id: GameId,
        entity: &EntityRef,
        trait_name: &str,
    ) -> Result<Option<PendingEvolution>, RepoError> {
        let evolutions = self.evolutions.read().await;
        Ok(evolutions
            .iter()
            .find(|e| {
                e.game_id == game_id
                    && &e.subject == entity
                    && e.is_pending()
                    && matches!(&e.change, EvolutionChange::TraitAdd { trait_name: t }
                        if taleweaver_domain::same_trait(t, trait_name))
            })
            .cloned())
    }

    async fn list(
        &self,
        game_id: GameId,
        pending_only: bool,
    ) -> Result<Vec<PendingEvolution>, RepoError> {
        let evolutions = self.evolutions.read().await;
        let mut listed: Vec<PendingEvolution> = evolutions
            .iter()
            .filter(|e| e.game_id == game_id && (!pending_only || e.is_pending()))
            .cloned()
            .collect();
        // Stable sort keeps insertion order for identical timestamps.
        listed.sort_by_key(|e| e.created_at);
        Ok(listed)
    }

    async fn list_for_entity(
        &self,
        game_id: GameId,
        entity: &EntityRef,
    ) -> Result<Vec<PendingEvolution>, RepoError> {
        let evolutions = self.evolutions.read().await;
        let mut listed: Vec<PendingEvolution> = evolutions
            .iter()
            .filter(|e| e.game_id == game_id && &e.subject == entity)
            .cloned()
            .collect();
        listed.reverse();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }
}
