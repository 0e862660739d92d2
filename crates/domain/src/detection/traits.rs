//! Trait detection.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::catalog::{first_match, TRAIT_CATALOG};
use crate::entity::EntityRef;
use crate::evolution::{CreateEvolutionInput, EvolutionChange, EvolutionSuggestion};
use crate::ids::{GameId, NarrativeEventId};
use crate::narrative::NarrativeEvent;

/// Maximum number of (turn, keyword) examples quoted in a pattern reason.
const MAX_PATTERN_EXAMPLES: usize = 3;

/// A proposed trait for an entity, with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitDetection {
    pub subject: EntityRef,
    #[serde(rename = "trait")]
    pub trait_name: String,
    pub matched_keywords: Vec<String>,
    pub reason: String,
    /// Latest event contributing to the detection.
    pub source_event_id: Option<NarrativeEventId>,
    pub turn: u32,
}

impl TraitDetection {
    pub fn to_suggestion(&self) -> EvolutionSuggestion {
        EvolutionSuggestion::TraitAdd {
            subject: self.subject.clone(),
            trait_name: self.trait_name.clone(),
            reason: self.reason.clone(),
        }
    }
}

/// Queue input for a trait detection.
pub fn trait_detection_to_evolution_input(
    detection: &TraitDetection,
    game_id: GameId,
) -> CreateEvolutionInput {
    CreateEvolutionInput {
        game_id,
        turn: detection.turn,
        subject: detection.subject.clone(),
        change: EvolutionChange::TraitAdd {
            trait_name: detection.trait_name.clone(),
        },
        reason: detection.reason.clone(),
        source_event_id: detection.source_event_id,
    }
}

pub(super) fn from_event(event: &NarrativeEvent, actor: &EntityRef) -> Vec<TraitDetection> {
    let content = event.content.to_lowercase();

    TRAIT_CATALOG
        .iter()
        .filter_map(|(trait_name, keywords)| {
            first_match(&content, keywords).map(|keyword| TraitDetection {
                subject: actor.clone(),
                trait_name: (*trait_name).to_string(),
                matched_keywords: vec![keyword.to_string()],
                reason: format!(
                    "Showed {} behavior on turn {} (matched \"{}\")",
                    trait_name, event.turn, keyword
                ),
                source_event_id: Some(event.id),
                turn: event.turn,
            })
        })
        .collect()
}

pub(super) fn from_patterns(
    events: &[NarrativeEvent],
    actor: &EntityRef,
    threshold: usize,
) -> Vec<TraitDetection> {
    let lowered: Vec<String> = events.iter().map(|e| e.content.to_lowercase()).collect();
    let threshold = threshold.max(1);

    let mut detections = Vec::new();
    for (trait_name, keywords) in TRAIT_CATALOG {
        let hits: Vec<(&NarrativeEvent, &str)> = events
            .iter()
            .zip(lowered.iter())
            .filter_map(|(event, content)| first_match(content, keywords).map(|kw| (event, kw)))
            .collect();

        if hits.len() < threshold {
            continue;
        }

        let examples: Vec<String> = hits
            .iter()
            .take(MAX_PATTERN_EXAMPLES)
            .map(|(event, keyword)| format!("turn {} (\"{}\")", event.turn, keyword))
            .collect();
        let ellipsis = if hits.len() > MAX_PATTERN_EXAMPLES { "..." } else { "" };

        let matched_keywords: BTreeSet<&str> = hits.iter().map(|(_, kw)| *kw).collect();
        let latest = hits.iter().max_by_key(|(event, _)| event.turn).map(|(event, _)| *event);

        detections.push(TraitDetection {
            subject: actor.clone(),
            trait_name: (*trait_name).to_string(),
            matched_keywords: matched_keywords.into_iter().map(str::to_string).collect(),
            reason: format!(
                "Repeated {} behavior across {} events: {}{}",
                trait_name,
                hits.len(),
                examples.join(", "),
                ellipsis
            ),
            source_event_id: latest.map(|e| e.id),
            turn: latest.map_or(0, |e| e.turn),
        });
    }
    detections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{detect_traits_from_event, detect_traits_from_patterns};

    fn event(turn: u32, content: &str) -> NarrativeEvent {
        NarrativeEvent::new(GameId::new(), turn, content)
    }

    fn player() -> EntityRef {
        EntityRef::player("player-1")
    }

    #[test]
    fn mercy_is_detected_in_a_single_event() {
        let e = event(2, "The player showed great mercy by sparing the enemy.");
        let detections = detect_traits_from_event(&e, &player());

        let merciful = detections
            .iter()
            .find(|d| d.trait_name == "merciful")
            .expect("merciful detection");
        assert_eq!(merciful.matched_keywords, vec!["mercy".to_string()]);
        assert_eq!(merciful.source_event_id, Some(e.id));
        assert_eq!(merciful.turn, 2);
        assert_eq!(merciful.subject, player());
    }

    #[test]
    fn one_detection_per_category_even_with_many_keywords() {
        let e = event(1, "Mercy! She chose to spare them and forgive their debts.");
        let detections = detect_traits_from_event(&e, &player());
        let merciful: Vec<_> = detections.iter().filter(|d| d.trait_name == "merciful").collect();
        assert_eq!(merciful.len(), 1);
        // "spare" precedes "mercy" in the catalog
        assert_eq!(merciful[0].matched_keywords, vec!["spare".to_string()]);
    }

    #[test]
    fn independent_categories_can_match_together() {
        let e = event(4, "He swore an oath to kill the tyrant.");
        let names: Vec<_> = detect_traits_from_event(&e, &player())
            .into_iter()
            .map(|d| d.trait_name)
            .collect();
        assert_eq!(names, vec!["ruthless".to_string(), "honorable".to_string()]);
    }

    #[test]
    fn no_keywords_no_detections() {
        let e = event(1, "They walked along the river.");
        assert!(detect_traits_from_event(&e, &player()).is_empty());
    }

    #[test]
    fn keywords_match_from_word_starts_only() {
        let names = |text: &str| -> Vec<String> {
            detect_traits_from_event(&event(1, text), &player())
                .into_iter()
                .map(|d| d.trait_name)
                .collect()
        };

        // "deal" inside "ideal" is not a pragmatic keyword hit.
        assert_eq!(names("They spoke of an ideal kingdom."), vec!["idealistic"]);
        // Stems still reach longer words that begin with them.
        assert_eq!(
            names("She was manipulated by smugglers."),
            vec!["street-wise", "cunning"]
        );
        // "war" inside "toward" is not a battle-hardened hit.
        assert!(names("He turned toward the gate.").is_empty());
    }

    #[test]
    fn pattern_needs_threshold_distinct_events() {
        let three = vec![
            event(1, "She showed mercy to the thief."),
            event(3, "She let the prisoner go free, a spare life."),
            event(5, "Again she chose to forgive."),
        ];
        let detections = detect_traits_from_patterns(&three, &player(), 3);
        let merciful: Vec<_> = detections.iter().filter(|d| d.trait_name == "merciful").collect();
        assert_eq!(merciful.len(), 1);
        assert!(merciful[0].reason.contains("across 3 events"));
        assert!(merciful[0].reason.contains("turn 1"));
        assert!(!merciful[0].reason.ends_with("..."));
        assert_eq!(merciful[0].turn, 5);

        let two = &three[..2];
        assert!(detect_traits_from_patterns(two, &player(), 3)
            .iter()
            .all(|d| d.trait_name != "merciful"));
    }

    #[test]
    fn repeated_keywords_in_one_event_count_once() {
        let events = vec![event(1, "mercy, mercy, mercy"), event(2, "mercy again")];
        assert!(detect_traits_from_patterns(&events, &player(), 3).is_empty());
    }

    #[test]
    fn pattern_reason_truncates_examples() {
        let events: Vec<_> = (1..=5).map(|t| event(t, "an act of mercy")).collect();
        let detections = detect_traits_from_patterns(&events, &player(), 3);
        assert_eq!(detections.len(), 1);
        assert!(detections[0].reason.ends_with("..."));
        assert!(!detections[0].reason.contains("turn 4"));
    }

    #[test]
    fn conversion_builds_trait_add_input() {
        let e = event(7, "a clever scheme");
        let detection = &detect_traits_from_event(&e, &player())[0];
        let game_id = GameId::new();
        let input = trait_detection_to_evolution_input(detection, game_id);

        assert_eq!(input.game_id, game_id);
        assert_eq!(input.turn, 7);
        assert_eq!(
            input.change,
            EvolutionChange::TraitAdd {
                trait_name: "cunning".into()
            }
        );
        assert_eq!(input.source_event_id, Some(e.id));
    }
}
