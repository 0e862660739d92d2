//! Pending evolutions - proposed trait and relationship changes awaiting DM review.
//!
//! ## Lifecycle
//!
//! A record is created `pending` when a suggestion is queued and moves exactly
//! once to `approved`, `edited` or `refused`. Records are never deleted; they
//! form the review history of the session.
//!
//! ## Suggestions
//!
//! Upstream producers (the rule-based detector, the AI pipeline) hand over
//! [`EvolutionSuggestion`]s. Untyped input is parsed as
//! [`RawEvolutionSuggestion`] and validated into the tagged union before it
//! reaches the evolution service.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{EntityRef, EntityType};
use crate::error::DomainError;
use crate::ids::{EvolutionId, GameId, NarrativeEventId};
use crate::relationship::{clamp_unit, RelationshipDimension};

/// Kind of change an evolution proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvolutionType {
    TraitAdd,
    TraitRemove,
    RelationshipChange,
}

impl EvolutionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvolutionType::TraitAdd => "trait_add",
            EvolutionType::TraitRemove => "trait_remove",
            EvolutionType::RelationshipChange => "relationship_change",
        }
    }
}

impl fmt::Display for EvolutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvolutionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "trait_add" => Ok(EvolutionType::TraitAdd),
            "trait_remove" => Ok(EvolutionType::TraitRemove),
            "relationship_change" => Ok(EvolutionType::RelationshipChange),
            _ => Err(DomainError::parse(format!("Unknown evolution type: {}", s))),
        }
    }
}

/// Review status of a pending evolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvolutionStatus {
    Pending,
    Approved,
    Edited,
    Refused,
}

impl EvolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvolutionStatus::Pending => "pending",
            EvolutionStatus::Approved => "approved",
            EvolutionStatus::Edited => "edited",
            EvolutionStatus::Refused => "refused",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, EvolutionStatus::Pending)
    }

    /// Only `pending -> {approved, edited, refused}` is allowed.
    pub fn can_transition_to(&self, next: EvolutionStatus) -> bool {
        matches!(self, EvolutionStatus::Pending) && next.is_terminal()
    }
}

impl fmt::Display for EvolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvolutionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(EvolutionStatus::Pending),
            "approved" => Ok(EvolutionStatus::Approved),
            "edited" => Ok(EvolutionStatus::Edited),
            "refused" => Ok(EvolutionStatus::Refused),
            _ => Err(DomainError::parse(format!("Unknown evolution status: {}", s))),
        }
    }
}

/// The concrete change a record proposes, discriminated by evolution type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "evolutionType", rename_all = "snake_case")]
pub enum EvolutionChange {
    TraitAdd {
        #[serde(rename = "trait")]
        trait_name: String,
    },
    TraitRemove {
        #[serde(rename = "trait")]
        trait_name: String,
    },
    #[serde(rename_all = "camelCase")]
    RelationshipChange {
        target: EntityRef,
        dimension: RelationshipDimension,
        old_value: f64,
        new_value: f64,
    },
}

impl EvolutionChange {
    pub fn evolution_type(&self) -> EvolutionType {
        match self {
            EvolutionChange::TraitAdd { .. } => EvolutionType::TraitAdd,
            EvolutionChange::TraitRemove { .. } => EvolutionType::TraitRemove,
            EvolutionChange::RelationshipChange { .. } => EvolutionType::RelationshipChange,
        }
    }

    pub fn trait_name(&self) -> Option<&str> {
        match self {
            EvolutionChange::TraitAdd { trait_name } | EvolutionChange::TraitRemove { trait_name } => {
                Some(trait_name.as_str())
            }
            EvolutionChange::RelationshipChange { .. } => None,
        }
    }
}

/// Everything needed to queue a new pending evolution.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateEvolutionInput {
    pub game_id: GameId,
    pub turn: u32,
    pub subject: EntityRef,
    pub change: EvolutionChange,
    pub reason: String,
    pub source_event_id: Option<NarrativeEventId>,
}

/// The unit of DM review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEvolution {
    pub id: EvolutionId,
    pub game_id: GameId,
    pub turn: u32,
    /// Entity proposing or receiving the change.
    #[serde(flatten)]
    pub subject: EntityRef,
    #[serde(flatten)]
    pub change: EvolutionChange,
    pub reason: String,
    pub source_event_id: Option<NarrativeEventId>,
    pub status: EvolutionStatus,
    pub dm_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl PendingEvolution {
    pub fn new(input: CreateEvolutionInput, created_at: DateTime<Utc>) -> Self {
        Self {
            id: EvolutionId::new(),
            game_id: input.game_id,
            turn: input.turn,
            subject: input.subject,
            change: input.change,
            reason: input.reason,
            source_event_id: input.source_event_id,
            status: EvolutionStatus::Pending,
            dm_notes: None,
            created_at,
            resolved_at: None,
        }
    }

    pub fn evolution_type(&self) -> EvolutionType {
        self.change.evolution_type()
    }

    pub fn is_pending(&self) -> bool {
        self.status == EvolutionStatus::Pending
    }

    /// Close the record. Fails if it has already been resolved.
    pub fn resolve(
        &mut self,
        status: EvolutionStatus,
        dm_notes: Option<String>,
        resolved_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.status.can_transition_to(status) {
            return Err(DomainError::invalid_state_transition(format!(
                "evolution {} cannot move from {} to {}",
                self.id, self.status, status
            )));
        }
        self.status = status;
        self.dm_notes = dm_notes;
        self.resolved_at = Some(resolved_at);
        Ok(())
    }

    /// Merge DM edits into the proposed change.
    ///
    /// Fields that do not belong to this record's evolution type are rejected.
    pub fn apply_edit(&mut self, edit: &EvolutionEdit) -> Result<(), DomainError> {
        match &mut self.change {
            EvolutionChange::TraitAdd { trait_name } | EvolutionChange::TraitRemove { trait_name } => {
                if edit.touches_relationship() {
                    return Err(DomainError::validation(
                        "relationship fields cannot be edited on a trait evolution",
                    ));
                }
                if let Some(name) = &edit.trait_name {
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(DomainError::validation("trait cannot be empty"));
                    }
                    *trait_name = name.to_string();
                }
            }
            EvolutionChange::RelationshipChange {
                target,
                dimension,
                old_value,
                new_value,
            } => {
                if edit.trait_name.is_some() {
                    return Err(DomainError::validation(
                        "trait cannot be edited on a relationship evolution",
                    ));
                }
                if let Some(t) = &edit.target {
                    if t.entity_id.trim().is_empty() {
                        return Err(DomainError::validation("target id cannot be empty"));
                    }
                    *target = t.clone();
                }
                if let Some(d) = edit.dimension {
                    *dimension = d;
                }
                if let Some(v) = edit.old_value {
                    *old_value = clamp_unit(v);
                }
                if let Some(v) = edit.new_value {
                    *new_value = clamp_unit(v);
                }
            }
        }
        if let Some(reason) = &edit.reason {
            self.reason = reason.clone();
        }
        Ok(())
    }
}

/// DM changes to a pending evolution before it is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionEdit {
    #[serde(rename = "trait")]
    pub trait_name: Option<String>,
    pub target: Option<EntityRef>,
    pub dimension: Option<RelationshipDimension>,
    pub old_value: Option<f64>,
    pub new_value: Option<f64>,
    pub reason: Option<String>,
}

impl EvolutionEdit {
    fn touches_relationship(&self) -> bool {
        self.target.is_some()
            || self.dimension.is_some()
            || self.old_value.is_some()
            || self.new_value.is_some()
    }
}

/// A validated change proposal from the detector or the AI pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEvolutionSuggestion", into = "RawEvolutionSuggestion")]
pub enum EvolutionSuggestion {
    TraitAdd {
        subject: EntityRef,
        trait_name: String,
        reason: String,
    },
    TraitRemove {
        subject: EntityRef,
        trait_name: String,
        reason: String,
    },
    RelationshipChange {
        subject: EntityRef,
        target: EntityRef,
        dimension: RelationshipDimension,
        change: f64,
        reason: String,
    },
}

impl EvolutionSuggestion {
    pub fn evolution_type(&self) -> EvolutionType {
        match self {
            EvolutionSuggestion::TraitAdd { .. } => EvolutionType::TraitAdd,
            EvolutionSuggestion::TraitRemove { .. } => EvolutionType::TraitRemove,
            EvolutionSuggestion::RelationshipChange { .. } => EvolutionType::RelationshipChange,
        }
    }

    pub fn subject(&self) -> &EntityRef {
        match self {
            EvolutionSuggestion::TraitAdd { subject, .. }
            | EvolutionSuggestion::TraitRemove { subject, .. }
            | EvolutionSuggestion::RelationshipChange { subject, .. } => subject,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            EvolutionSuggestion::TraitAdd { reason, .. }
            | EvolutionSuggestion::TraitRemove { reason, .. }
            | EvolutionSuggestion::RelationshipChange { reason, .. } => reason,
        }
    }
}

/// Untyped suggestion shape as emitted by the AI pipeline.
///
/// Every field is optional here; [`EvolutionSuggestion::try_from`] enforces
/// which ones each evolution type needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvolutionSuggestion {
    pub evolution_type: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    #[serde(rename = "trait", skip_serializing_if = "Option::is_none")]
    pub trait_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
    pub reason: Option<String>,
}

const NO_REASON: &str = "(no reason given)";

fn required<'a>(value: &'a Option<String>, field: &str, kind: &str) -> Result<&'a str, DomainError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DomainError::validation(format!(
            "{} suggestion is missing {}",
            kind, field
        ))),
    }
}

fn parse_entity(
    entity_type: &Option<String>,
    entity_id: &Option<String>,
    type_field: &str,
    id_field: &str,
    kind: &str,
) -> Result<EntityRef, DomainError> {
    let entity_type = required(entity_type, type_field, kind)?
        .parse::<EntityType>()
        .map_err(|e| DomainError::validation(e.to_string()))?;
    let entity_id = required(entity_id, id_field, kind)?;
    Ok(EntityRef::new(entity_type, entity_id))
}

impl TryFrom<RawEvolutionSuggestion> for EvolutionSuggestion {
    type Error = DomainError;

    fn try_from(raw: RawEvolutionSuggestion) -> Result<Self, Self::Error> {
        let kind = required(&raw.evolution_type, "evolutionType", "evolution")?
            .parse::<EvolutionType>()
            .map_err(|e| DomainError::validation(e.to_string()))?;
        let label = kind.as_str();
        let subject = parse_entity(&raw.entity_type, &raw.entity_id, "entityType", "entityId", label)?;
        let reason = raw
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(NO_REASON)
            .to_string();

        match kind {
            EvolutionType::TraitAdd | EvolutionType::TraitRemove => {
                let trait_name = required(&raw.trait_name, "trait", label)?.to_string();
                Ok(if kind == EvolutionType::TraitAdd {
                    EvolutionSuggestion::TraitAdd {
                        subject,
                        trait_name,
                        reason,
                    }
                } else {
                    EvolutionSuggestion::TraitRemove {
                        subject,
                        trait_name,
                        reason,
                    }
                })
            }
            EvolutionType::RelationshipChange => {
                let target =
                    parse_entity(&raw.target_type, &raw.target_id, "targetType", "targetId", label)?;
                let dimension = required(&raw.dimension, "dimension", label)?
                    .parse::<RelationshipDimension>()
                    .map_err(|e| DomainError::validation(e.to_string()))?;
                let change = match raw.change {
                    Some(c) if c.is_finite() => c,
                    Some(_) => {
                        return Err(DomainError::validation(
                            "relationship_change suggestion has a non-finite change",
                        ))
                    }
                    None => {
                        return Err(DomainError::validation(
                            "relationship_change suggestion is missing change",
                        ))
                    }
                };
                Ok(EvolutionSuggestion::RelationshipChange {
                    subject,
                    target,
                    dimension,
                    change,
                    reason,
                })
            }
        }
    }
}

impl From<EvolutionSuggestion> for RawEvolutionSuggestion {
    fn from(suggestion: EvolutionSuggestion) -> Self {
        let evolution_type = Some(suggestion.evolution_type().as_str().to_string());
        match suggestion {
            EvolutionSuggestion::TraitAdd {
                subject,
                trait_name,
                reason,
            }
            | EvolutionSuggestion::TraitRemove {
                subject,
                trait_name,
                reason,
            } => RawEvolutionSuggestion {
                evolution_type,
                entity_type: Some(subject.entity_type.as_str().to_string()),
                entity_id: Some(subject.entity_id),
                trait_name: Some(trait_name),
                reason: Some(reason),
                ..Default::default()
            },
            EvolutionSuggestion::RelationshipChange {
                subject,
                target,
                dimension,
                change,
                reason,
            } => RawEvolutionSuggestion {
                evolution_type,
                entity_type: Some(subject.entity_type.as_str().to_string()),
                entity_id: Some(subject.entity_id),
                target_type: Some(target.entity_type.as_str().to_string()),
                target_id: Some(target.entity_id),
                dimension: Some(dimension.as_str().to_string()),
                change: Some(change),
                reason: Some(reason),
                ..Default::default()
            },
        }
    }
}
