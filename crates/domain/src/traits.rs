//! Entity traits - short descriptive labels attached to an entity.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::EntityRef;
use crate::error::DomainError;
use crate::ids::{GameId, TraitId};

/// Whether a trait currently applies to its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitStatus {
    Active,
    Removed,
}

impl TraitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraitStatus::Active => "active",
            TraitStatus::Removed => "removed",
        }
    }
}

impl fmt::Display for TraitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TraitStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TraitStatus::Active),
            "removed" => Ok(TraitStatus::Removed),
            _ => Err(DomainError::parse(format!("Unknown trait status: {}", s))),
        }
    }
}

/// A trait held (or once held) by an entity.
///
/// The text is stored verbatim; comparisons between traits ignore case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trait {
    pub id: TraitId,
    pub game_id: GameId,
    #[serde(flatten)]
    pub entity: EntityRef,
    #[serde(rename = "trait")]
    pub name: String,
    pub acquired_turn: u32,
    pub status: TraitStatus,
    pub created_at: DateTime<Utc>,
}

impl Trait {
    pub fn new(
        game_id: GameId,
        entity: EntityRef,
        name: impl Into<String>,
        acquired_turn: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TraitId::new(),
            game_id,
            entity,
            name: name.into(),
            acquired_turn,
            status: TraitStatus::Active,
            created_at,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TraitStatus::Active
    }

    /// Whether this trait's text names the same trait as `other`.
    pub fn matches(&self, other: &str) -> bool {
        same_trait(&self.name, other)
    }
}

/// Case-insensitive, whitespace-trimmed trait comparison.
pub fn same_trait(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
