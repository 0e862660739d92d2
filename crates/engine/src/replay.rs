//! Transcript replay: feed recorded narrative events through the detector.
//!
//! A transcript is a JSON array of entries:
//!
//! ```json
//! [
//!   {
//!     "event": { "turn": 3, "content": "Kael spared the thief.", "witnesses": ["mira"] },
//!     "actor": { "entityType": "player", "entityId": "kael" },
//!     "target": { "entityType": "npc", "entityId": "thief" }
//!   }
//! ]
//! ```
//!
//! Event ids are optional; all entries are replayed into one game.

use serde::Deserialize;
use taleweaver_domain::{EntityRef, GameId, NarrativeEvent, NarrativeEventId, PendingEvolution};

use crate::use_cases::{EvolutionError, EvolutionService};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEvent {
    #[serde(default)]
    pub id: Option<NarrativeEventId>,
    pub turn: u32,
    pub content: String,
    #[serde(default)]
    pub witnesses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TranscriptEntry {
    pub event: TranscriptEvent,
    pub actor: EntityRef,
    #[serde(default)]
    pub target: Option<EntityRef>,
}

impl TranscriptEntry {
    pub fn narrative_event(&self, game_id: GameId) -> NarrativeEvent {
        let mut event = NarrativeEvent::new(game_id, self.event.turn, self.event.content.clone())
            .with_witnesses(self.event.witnesses.iter().cloned());
        if let Some(id) = self.event.id {
            event.id = id;
        }
        event
    }
}

pub fn parse_transcript(json: &str) -> Result<Vec<TranscriptEntry>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Scan every entry in order. Returns everything that was queued.
pub async fn replay(
    service: &EvolutionService,
    game_id: GameId,
    entries: &[TranscriptEntry],
) -> Result<Vec<PendingEvolution>, EvolutionError> {
    let mut queued = Vec::new();
    for entry in entries {
        let event = entry.narrative_event(game_id);
        let created = service
            .scan_event(&event, &entry.actor, entry.target.as_ref())
            .await?;
        tracing::debug!(turn = event.turn, queued = created.len(), "Replayed transcript entry");
        queued.extend(created);
    }
    Ok(queued)
}
