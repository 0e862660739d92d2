//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Durable state (traits, relationships, the evolution queue)
//! - Lifecycle event delivery (could swap in-process broadcast -> WebSocket fan-out)
//! - Clock (for testing)

mod error;
mod external;
mod repos;
mod testing;

// =============================================================================
// Repository Ports
// =============================================================================
pub use repos::{PendingEvolutionRepo, RelationshipRepo, TraitRepo};

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::EvolutionEventPublisher;

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use repos::{MockPendingEvolutionRepo, MockRelationshipRepo, MockTraitRepo};

#[cfg(test)]
pub use external::MockEvolutionEventPublisher;

#[cfg(test)]
pub use testing::MockClockPort;

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::ClockPort;

// =============================================================================
// Error Types
// =============================================================================
pub use error::{PublishError, RepoError};
