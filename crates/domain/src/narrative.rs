//! Narrative events as seen by the evolution subsystem.
//!
//! Events are produced by the story log; here they are only read.

use serde::{Deserialize, Serialize};

use crate::ids::{GameId, NarrativeEventId};

/// A narrative event's text plus the NPCs who saw it happen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeEvent {
    pub id: NarrativeEventId,
    pub game_id: GameId,
    pub turn: u32,
    pub content: String,
    /// NPC ids present for the event.
    #[serde(default)]
    pub witnesses: Vec<String>,
}

impl NarrativeEvent {
    pub fn new(game_id: GameId, turn: u32, content: impl Into<String>) -> Self {
        Self {
            id: NarrativeEventId::new(),
            game_id,
            turn,
            content: content.into(),
            witnesses: Vec::new(),
        }
    }

    pub fn with_witnesses<I, S>(mut self, witnesses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.witnesses = witnesses.into_iter().map(Into::into).collect();
        self
    }

    pub fn event_ref(&self) -> NarrativeEventRef {
        NarrativeEventRef {
            id: self.id,
            game_id: self.game_id,
            turn: self.turn,
        }
    }
}

/// Minimal pointer to the event a batch of suggestions came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeEventRef {
    pub id: NarrativeEventId,
    pub game_id: GameId,
    pub turn: u32,
}
