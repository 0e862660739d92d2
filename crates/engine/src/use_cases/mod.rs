//! Use cases - User story orchestration.
//!
//! Use cases orchestrate across ports to fulfill user stories.

pub mod evolution;

pub use evolution::{EntitySummary, EvolutionError, EvolutionService, RelationshipSummary};
