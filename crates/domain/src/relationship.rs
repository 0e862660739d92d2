//! Directed, six-dimensional relationships between entities.
//!
//! A relationship row describes `from`'s disposition toward `to`. Every
//! dimension lives in `[0, 1]`; all writes go through [`clamp_unit`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::EntityRef;
use crate::error::DomainError;
use crate::ids::{GameId, RelationshipId};

/// Clamp a dimension value into `[0, 1]`. NaN collapses to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// One axis of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipDimension {
    Trust,
    Respect,
    Affection,
    Fear,
    Resentment,
    Debt,
}

impl RelationshipDimension {
    pub const ALL: [RelationshipDimension; 6] = [
        RelationshipDimension::Trust,
        RelationshipDimension::Respect,
        RelationshipDimension::Affection,
        RelationshipDimension::Fear,
        RelationshipDimension::Resentment,
        RelationshipDimension::Debt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipDimension::Trust => "trust",
            RelationshipDimension::Respect => "respect",
            RelationshipDimension::Affection => "affection",
            RelationshipDimension::Fear => "fear",
            RelationshipDimension::Resentment => "resentment",
            RelationshipDimension::Debt => "debt",
        }
    }

    /// Value a dimension has before anything has been written to it.
    pub fn default_value(&self) -> f64 {
        match self {
            RelationshipDimension::Trust
            | RelationshipDimension::Respect
            | RelationshipDimension::Affection => 0.5,
            RelationshipDimension::Fear
            | RelationshipDimension::Resentment
            | RelationshipDimension::Debt => 0.0,
        }
    }
}

impl fmt::Display for RelationshipDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipDimension {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trust" => Ok(RelationshipDimension::Trust),
            "respect" => Ok(RelationshipDimension::Respect),
            "affection" => Ok(RelationshipDimension::Affection),
            "fear" => Ok(RelationshipDimension::Fear),
            "resentment" => Ok(RelationshipDimension::Resentment),
            "debt" => Ok(RelationshipDimension::Debt),
            _ => Err(DomainError::parse(format!(
                "Unknown relationship dimension: {}",
                s
            ))),
        }
    }
}

/// The six dimension values without identity or bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionValues {
    pub trust: f64,
    pub respect: f64,
    pub affection: f64,
    pub fear: f64,
    pub resentment: f64,
    pub debt: f64,
}

impl Default for DimensionValues {
    fn default() -> Self {
        Self {
            trust: RelationshipDimension::Trust.default_value(),
            respect: RelationshipDimension::Respect.default_value(),
            affection: RelationshipDimension::Affection.default_value(),
            fear: RelationshipDimension::Fear.default_value(),
            resentment: RelationshipDimension::Resentment.default_value(),
            debt: RelationshipDimension::Debt.default_value(),
        }
    }
}

impl DimensionValues {
    pub fn get(&self, dimension: RelationshipDimension) -> f64 {
        match dimension {
            RelationshipDimension::Trust => self.trust,
            RelationshipDimension::Respect => self.respect,
            RelationshipDimension::Affection => self.affection,
            RelationshipDimension::Fear => self.fear,
            RelationshipDimension::Resentment => self.resentment,
            RelationshipDimension::Debt => self.debt,
        }
    }

    /// Set one dimension, clamped into `[0, 1]`.
    pub fn set(&mut self, dimension: RelationshipDimension, value: f64) {
        let value = clamp_unit(value);
        match dimension {
            RelationshipDimension::Trust => self.trust = value,
            RelationshipDimension::Respect => self.respect = value,
            RelationshipDimension::Affection => self.affection = value,
            RelationshipDimension::Fear => self.fear = value,
            RelationshipDimension::Resentment => self.resentment = value,
            RelationshipDimension::Debt => self.debt = value,
        }
    }

    pub fn with(mut self, dimension: RelationshipDimension, value: f64) -> Self {
        self.set(dimension, value);
        self
    }
}

/// A partial write: only `Some` dimensions are merged over current values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionUpdate {
    pub trust: Option<f64>,
    pub respect: Option<f64>,
    pub affection: Option<f64>,
    pub fear: Option<f64>,
    pub resentment: Option<f64>,
    pub debt: Option<f64>,
}

impl DimensionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update touching a single dimension.
    pub fn single(dimension: RelationshipDimension, value: f64) -> Self {
        Self::new().with(dimension, value)
    }

    pub fn with(mut self, dimension: RelationshipDimension, value: f64) -> Self {
        let slot = match dimension {
            RelationshipDimension::Trust => &mut self.trust,
            RelationshipDimension::Respect => &mut self.respect,
            RelationshipDimension::Affection => &mut self.affection,
            RelationshipDimension::Fear => &mut self.fear,
            RelationshipDimension::Resentment => &mut self.resentment,
            RelationshipDimension::Debt => &mut self.debt,
        };
        *slot = Some(value);
        self
    }

    pub fn get(&self, dimension: RelationshipDimension) -> Option<f64> {
        match dimension {
            RelationshipDimension::Trust => self.trust,
            RelationshipDimension::Respect => self.respect,
            RelationshipDimension::Affection => self.affection,
            RelationshipDimension::Fear => self.fear,
            RelationshipDimension::Resentment => self.resentment,
            RelationshipDimension::Debt => self.debt,
        }
    }

    pub fn is_empty(&self) -> bool {
        RelationshipDimension::ALL
            .iter()
            .all(|d| self.get(*d).is_none())
    }
}

/// `from`'s disposition toward `to` within one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: RelationshipId,
    pub game_id: GameId,
    pub from: EntityRef,
    pub to: EntityRef,
    #[serde(flatten)]
    pub values: DimensionValues,
    pub updated_turn: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Relationship {
    /// A relationship holding default values for every dimension.
    ///
    /// Stores hand this out for pairs with no row yet; it is not persisted
    /// until the first write.
    pub fn with_defaults(
        game_id: GameId,
        from: EntityRef,
        to: EntityRef,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RelationshipId::new(),
            game_id,
            from,
            to,
            values: DimensionValues::default(),
            updated_turn: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn get(&self, dimension: RelationshipDimension) -> f64 {
        self.values.get(dimension)
    }

    /// Merge a partial update over the current values, clamping every write.
    pub fn apply(&mut self, update: &DimensionUpdate, turn: u32, now: DateTime<Utc>) {
        for dimension in RelationshipDimension::ALL {
            if let Some(value) = update.get(dimension) {
                self.values.set(dimension, value);
            }
        }
        self.updated_turn = turn;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> Relationship {
        Relationship::with_defaults(
            GameId::new(),
            EntityRef::npc("mira"),
            EntityRef::player("player-1"),
            Utc::now(),
        )
    }

    #[test]
    fn defaults_split_warm_and_cold_dimensions() {
        let rel = pair();
        assert_eq!(rel.get(RelationshipDimension::Trust), 0.5);
        assert_eq!(rel.get(RelationshipDimension::Respect), 0.5);
        assert_eq!(rel.get(RelationshipDimension::Affection), 0.5);
        assert_eq!(rel.get(RelationshipDimension::Fear), 0.0);
        assert_eq!(rel.get(RelationshipDimension::Resentment), 0.0);
        assert_eq!(rel.get(RelationshipDimension::Debt), 0.0);
    }

    #[test]
    fn apply_merges_and_clamps() {
        let mut rel = pair();
        let update = DimensionUpdate::new()
            .with(RelationshipDimension::Trust, 1.4)
            .with(RelationshipDimension::Fear, -0.2);
        rel.apply(&update, 7, Utc::now());

        assert_eq!(rel.get(RelationshipDimension::Trust), 1.0);
        assert_eq!(rel.get(RelationshipDimension::Fear), 0.0);
        assert_eq!(rel.get(RelationshipDimension::Affection), 0.5);
        assert_eq!(rel.updated_turn, 7);
    }

    #[test]
    fn nan_never_escapes_the_unit_interval() {
        assert_eq!(clamp_unit(f64::NAN), 0.0);
        let mut values = DimensionValues::default();
        values.set(RelationshipDimension::Debt, f64::INFINITY);
        assert_eq!(values.debt, 1.0);
    }

    #[test]
    fn empty_update_is_detected() {
        assert!(DimensionUpdate::new().is_empty());
        assert!(!DimensionUpdate::single(RelationshipDimension::Debt, 0.2).is_empty());
    }

    #[test]
    fn dimension_parses_from_wire_names() {
        for dimension in RelationshipDimension::ALL {
            assert_eq!(dimension.as_str().parse::<RelationshipDimension>().unwrap(), dimension);
        }
        assert!("loyalty".parse::<RelationshipDimension>().is_err());
    }
}
