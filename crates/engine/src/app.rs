//! Application state and composition.

use std::sync::Arc;

use taleweaver_domain::RuleBasedDetector;

use crate::infrastructure::{
    clock::SystemClock,
    config::EngineConfig,
    events::BroadcastEventPublisher,
    memory::{InMemoryEvolutionRepo, InMemoryRelationshipRepo, InMemoryTraitRepo},
    ports::{ClockPort, PendingEvolutionRepo, RelationshipRepo, RepoError, TraitRepo},
    sqlite::SqliteStore,
};
use crate::stores::GameLocks;
use crate::use_cases::EvolutionService;

/// Main application state.
///
/// Holds the evolution service and the lifecycle event channel that
/// broadcasters subscribe to.
pub struct App {
    pub evolution: Arc<EvolutionService>,
    pub events: Arc<BroadcastEventPublisher>,
}

/// The three stores the evolution service needs.
pub struct Repositories {
    pub traits: Arc<dyn TraitRepo>,
    pub relationships: Arc<dyn RelationshipRepo>,
    pub evolutions: Arc<dyn PendingEvolutionRepo>,
}

impl Repositories {
    pub fn in_memory(clock: Arc<dyn ClockPort>) -> Self {
        Self {
            traits: Arc::new(InMemoryTraitRepo::new(clock.clone())),
            relationships: Arc::new(InMemoryRelationshipRepo::new(clock)),
            evolutions: Arc::new(InMemoryEvolutionRepo::new()),
        }
    }

    pub fn sqlite(store: &SqliteStore) -> Self {
        Self {
            traits: Arc::new(store.traits()),
            relationships: Arc::new(store.relationships()),
            evolutions: Arc::new(store.evolutions()),
        }
    }
}

impl App {
    /// Build from configuration: SQLite when a database path is set,
    /// in-memory stores otherwise.
    pub async fn from_config(config: &EngineConfig) -> Result<Self, RepoError> {
        let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());
        let repos = match &config.database_path {
            Some(path) => {
                let store = SqliteStore::connect(path, clock.clone()).await?;
                Repositories::sqlite(&store)
            }
            None => {
                tracing::info!("TALEWEAVER_DB not set, using in-memory stores");
                Repositories::in_memory(clock.clone())
            }
        };
        Ok(Self::new(repos, clock, config))
    }

    /// Create a new App with all dependencies wired up.
    pub fn new(repos: Repositories, clock: Arc<dyn ClockPort>, config: &EngineConfig) -> Self {
        let events = Arc::new(BroadcastEventPublisher::new(config.event_channel_capacity));

        let evolution = Arc::new(EvolutionService::new(
            repos.traits,
            repos.relationships,
            repos.evolutions,
            events.clone(),
            clock,
            Arc::new(GameLocks::new()),
            RuleBasedDetector::new(config.detection),
        ));

        Self { evolution, events }
    }
}
