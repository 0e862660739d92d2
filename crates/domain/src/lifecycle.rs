//! Lifecycle events emitted when pending evolutions are created or resolved.
//!
//! A downstream broadcaster forwards these to connected clients.

use serde::{Deserialize, Serialize};

use crate::evolution::{EvolutionStatus, PendingEvolution};
use crate::ids::GameId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "evolution")]
pub enum EvolutionEvent {
    #[serde(rename = "evolution:created")]
    Created(PendingEvolution),
    #[serde(rename = "evolution:approved")]
    Approved(PendingEvolution),
    #[serde(rename = "evolution:edited")]
    Edited(PendingEvolution),
    #[serde(rename = "evolution:refused")]
    Refused(PendingEvolution),
}

impl EvolutionEvent {
    /// Event for a record that has just reached `status`.
    pub fn for_status(evolution: PendingEvolution) -> Self {
        match evolution.status {
            EvolutionStatus::Pending => EvolutionEvent::Created(evolution),
            EvolutionStatus::Approved => EvolutionEvent::Approved(evolution),
            EvolutionStatus::Edited => EvolutionEvent::Edited(evolution),
            EvolutionStatus::Refused => EvolutionEvent::Refused(evolution),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EvolutionEvent::Created(_) => "evolution:created",
            EvolutionEvent::Approved(_) => "evolution:approved",
            EvolutionEvent::Edited(_) => "evolution:edited",
            EvolutionEvent::Refused(_) => "evolution:refused",
        }
    }

    pub fn evolution(&self) -> &PendingEvolution {
        match self {
            EvolutionEvent::Created(e)
            | EvolutionEvent::Approved(e)
            | EvolutionEvent::Edited(e)
            | EvolutionEvent::Refused(e) => e,
        }
    }

    pub fn game_id(&self) -> GameId {
        self.evolution().game_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRef;
    use crate::evolution::{CreateEvolutionInput, EvolutionChange};
    use chrono::Utc;

    fn record() -> PendingEvolution {
        PendingEvolution::new(
            CreateEvolutionInput {
                game_id: GameId::new(),
                turn: 1,
                subject: EntityRef::player("player-1"),
                change: EvolutionChange::TraitAdd {
                    trait_name: "hopeful".into(),
                },
                reason: "kept faith".into(),
                source_event_id: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn event_follows_record_status() {
        let mut evolution = record();
        assert_eq!(EvolutionEvent::for_status(evolution.clone()).name(), "evolution:created");

        evolution
            .resolve(EvolutionStatus::Refused, None, Utc::now())
            .unwrap();
        let event = EvolutionEvent::for_status(evolution.clone());
        assert_eq!(event.name(), "evolution:refused");
        assert_eq!(event.game_id(), evolution.game_id);
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = EvolutionEvent::Created(record());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "evolution:created");
        assert_eq!(json["evolution"]["trait"], "hopeful");
    }
}
