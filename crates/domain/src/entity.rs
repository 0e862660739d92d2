//! Entity references.
//!
//! Players, party characters, NPCs and locations are owned by other parts of
//! the game (party management, area generation). This subsystem only needs to
//! name them, so an entity is a `(type, id)` pair.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Kind of entity that can hold traits or take part in relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Player,
    Character,
    Npc,
    Location,
}

impl EntityType {
    /// Stable identifier used in storage and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Player => "player",
            EntityType::Character => "character",
            EntityType::Npc => "npc",
            EntityType::Location => "location",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "player" => Ok(EntityType::Player),
            "character" => Ok(EntityType::Character),
            "npc" => Ok(EntityType::Npc),
            "location" => Ok(EntityType::Location),
            _ => Err(DomainError::parse(format!("Unknown entity type: {}", s))),
        }
    }
}

/// Identifies the subject or object of a trait or relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub entity_id: String,
}

impl EntityRef {
    pub fn new(entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
        }
    }

    pub fn player(entity_id: impl Into<String>) -> Self {
        Self::new(EntityType::Player, entity_id)
    }

    pub fn npc(entity_id: impl Into<String>) -> Self {
        Self::new(EntityType::Npc, entity_id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_parses_case_insensitively() {
        assert_eq!("NPC".parse::<EntityType>().unwrap(), EntityType::Npc);
        assert_eq!(" player ".parse::<EntityType>().unwrap(), EntityType::Player);
        assert!("dragon".parse::<EntityType>().is_err());
    }

    #[test]
    fn entity_ref_displays_type_and_id() {
        assert_eq!(EntityRef::npc("guard-1").to_string(), "npc:guard-1");
    }

    #[test]
    fn entity_ref_serializes_camel_case() {
        let json = serde_json::to_value(EntityRef::player("player-1")).unwrap();
        assert_eq!(json["entityType"], "player");
        assert_eq!(json["entityId"], "player-1");
    }
}
