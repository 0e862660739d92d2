//! Entity evolution use cases.
//!
//! The service is the only place where the detector, the pending queue and
//! the trait/relationship stores meet:
//! - `queue` - turning suggestions into pending records (with dedup)
//! - `resolve` - DM approve / edit / refuse, applying the change
//! - `summary` - read-side queries and labels
//! - `scan` - running the rule-based detector over narrative events

mod queue;
mod resolve;
mod scan;
mod summary;

pub use summary::{EntitySummary, RelationshipSummary};

use std::sync::Arc;

use taleweaver_domain::{
    DomainError, EvolutionEvent, EvolutionId, EvolutionStatus, RuleBasedDetector,
};

use crate::infrastructure::ports::{
    ClockPort, EvolutionEventPublisher, PendingEvolutionRepo, RelationshipRepo, RepoError,
    TraitRepo,
};
use crate::stores::GameLocks;

/// Errors surfaced by evolution operations.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("Evolution not found: {0}")]
    NotFound(EvolutionId),

    #[error("Evolution {id} is already {status}")]
    InvalidStatus {
        id: EvolutionId,
        status: EvolutionStatus,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<DomainError> for EvolutionError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(message) => EvolutionError::Validation(message),
            other => EvolutionError::Validation(other.to_string()),
        }
    }
}

/// Orchestrates suggestion intake, DM resolution and entity summaries.
pub struct EvolutionService {
    traits: Arc<dyn TraitRepo>,
    relationships: Arc<dyn RelationshipRepo>,
    evolutions: Arc<dyn PendingEvolutionRepo>,
    publisher: Arc<dyn EvolutionEventPublisher>,
    clock: Arc<dyn ClockPort>,
    locks: Arc<GameLocks>,
    detector: RuleBasedDetector,
}

impl EvolutionService {
    pub fn new(
        traits: Arc<dyn TraitRepo>,
        relationships: Arc<dyn RelationshipRepo>,
        evolutions: Arc<dyn PendingEvolutionRepo>,
        publisher: Arc<dyn EvolutionEventPublisher>,
        clock: Arc<dyn ClockPort>,
        locks: Arc<GameLocks>,
        detector: RuleBasedDetector,
    ) -> Self {
        Self {
            traits,
            relationships,
            evolutions,
            publisher,
            clock,
            locks,
            detector,
        }
    }

    /// Fire-and-forget; delivery problems never undo a state change.
    fn publish(&self, event: EvolutionEvent) {
        let name = event.name();
        let id = event.evolution().id;
        if let Err(e) = self.publisher.publish(event) {
            tracing::warn!(event = name, evolution_id = %id, error = %e, "Lifecycle event not delivered");
        }
    }
}
