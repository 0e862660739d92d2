//! Repository port traits for durable state.
//!
//! All state is scoped by `GameId`; nothing here crosses games.

use async_trait::async_trait;
use taleweaver_domain::{
    DimensionUpdate, EntityRef, EvolutionId, GameId, PendingEvolution, Relationship, Trait,
};

use super::error::RepoError;

// =============================================================================
// Traits
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TraitRepo: Send + Sync {
    /// Active traits held by the entity, oldest first.
    async fn find_active(&self, game_id: GameId, entity: &EntityRef)
        -> Result<Vec<Trait>, RepoError>;

    /// Add an active trait. If the entity already holds it (case-insensitively),
    /// the existing row is returned and nothing is written.
    async fn add(
        &self,
        game_id: GameId,
        entity: &EntityRef,
        trait_name: &str,
        turn: u32,
    ) -> Result<Trait, RepoError>;

    /// Mark matching active traits removed. No-op if none match.
    async fn remove(
        &self,
        game_id: GameId,
        entity: &EntityRef,
        trait_name: &str,
    ) -> Result<(), RepoError>;
}

// =============================================================================
// Relationships
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RelationshipRepo: Send + Sync {
    /// Current relationship, or defaults (unsaved) if the pair has no row yet.
    async fn get(
        &self,
        game_id: GameId,
        from: &EntityRef,
        to: &EntityRef,
    ) -> Result<Relationship, RepoError>;

    /// Merge `update` over current values, clamp, stamp `turn`, and persist.
    /// Creates the row on first write.
    async fn upsert(
        &self,
        game_id: GameId,
        from: &EntityRef,
        to: &EntityRef,
        turn: u32,
        update: DimensionUpdate,
    ) -> Result<Relationship, RepoError>;

    /// Persisted relationships where `from` is the observer.
    async fn list_from(
        &self,
        game_id: GameId,
        from: &EntityRef,
    ) -> Result<Vec<Relationship>, RepoError>;
}

// =============================================================================
// Pending Evolution Queue
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PendingEvolutionRepo: Send + Sync {
    async fn insert(&self, evolution: &PendingEvolution) -> Result<(), RepoError>;

    /// Overwrite an existing record. Fails with `NotFound` for unknown ids.
    async fn update(&self, evolution: &PendingEvolution) -> Result<(), RepoError>;

    async fn find_by_id(&self, id: EvolutionId) -> Result<Option<PendingEvolution>, RepoError>;

    /// The still-pending `trait_add` record for this entity and trait, if any.
    async fn find_pending_by_entity_trait(
        &self,
        game_id: GameId,
        entity: &EntityRef,
        trait_name: &str,
    ) -> Result<Option<PendingEvolution>, RepoError>;

    /// Records for a game, oldest first.
    async fn list(
        &self,
        game_id: GameId,
        pending_only: bool,
    ) -> Result<Vec<PendingEvolution>, RepoError>;

    /// Every record whose subject is `entity`, newest first.
    async fn list_for_entity(
        &self,
        game_id: GameId,
        entity: &EntityRef,
    ) -> Result<Vec<PendingEvolution>, RepoError>;
}
