//! Taleweaver domain: entity evolution types and pure rules.
//!
//! ## Structure
//!
//! - `entity`, `traits`, `relationship` - durable facts about entities
//! - `evolution` - pending evolutions, suggestions and DM edits
//! - `lifecycle` - events emitted when evolutions are created or resolved
//! - `detection` - rule-based keyword detector
//! - `labels` - qualitative relationship labels

extern crate self as taleweaver_domain;

pub mod common;
pub mod detection;
pub mod entity;
pub mod error;
pub mod evolution;
pub mod ids;
pub mod labels;
pub mod lifecycle;
pub mod narrative;
pub mod relationship;
pub mod traits;

pub use error::DomainError;

pub use detection::{
    aggregate_relationship_changes, detect_relationships_from_event,
    detect_traits_from_event, detect_traits_from_patterns,
    relationship_detection_to_evolution_input, trait_detection_to_evolution_input,
    DetectionConfig, RelationshipDetection, RuleBasedDetector, TraitDetection,
};

pub use entity::{EntityRef, EntityType};

pub use evolution::{
    CreateEvolutionInput, EvolutionChange, EvolutionEdit, EvolutionStatus, EvolutionSuggestion,
    EvolutionType, PendingEvolution, RawEvolutionSuggestion,
};

pub use ids::{EvolutionId, GameId, NarrativeEventId, RelationshipId, TraitId};

pub use labels::{
    compute_labels, label_valence, short_label, LabelEntry, LabelValence, RelationshipLabel,
    RelationshipLabels,
};

pub use lifecycle::EvolutionEvent;

pub use narrative::{NarrativeEvent, NarrativeEventRef};

pub use relationship::{
    clamp_unit, DimensionUpdate, DimensionValues, Relationship, RelationshipDimension,
};

pub use traits::{same_trait, Trait, TraitStatus};
