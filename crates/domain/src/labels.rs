//! Qualitative relationship labels.
//!
//! Maps a relationship's six dimensions to a primary label, a list of
//! secondary labels and a one-line summary. Primary rules are evaluated in
//! priority order and the first match wins; the ranges overlap, so the order
//! is part of the contract:
//!
//! | # | Label       | Condition                                              |
//! |---|-------------|--------------------------------------------------------|
//! | 1 | terrified   | fear > 0.7                                             |
//! | 2 | enemy       | fear > 0.5 and resentment > 0.6                        |
//! | 3 | devoted     | trust, respect, affection all >= 0.8                   |
//! | 4 | hostile     | resentment >= 0.8 and trust <= 0.2                     |
//! | 5 | rival       | respect >= 0.6, resentment >= 0.4, trust in 0.3..=0.7  |
//! | 6 | resentful   | resentment >= 0.6                                      |
//! | 7 | allied      | trust >= 0.75 and respect >= 0.75                      |
//! | 8 | friendly    | trust >= 0.6 and affection >= 0.55                     |
//! | 9 | wary        | trust <= 0.4 and fear in 0.2..=0.7                     |
//! |10 | indifferent | trust/respect/affection in 0.45..=0.55, fear and resentment <= 0.1 |
//!
//! Vectors matching no rule take the label whose prototype vector is nearest.
//!
//! Secondary labels are appended whenever their own threshold holds,
//! whatever the primary label is.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::capitalize;
use crate::error::DomainError;
use crate::relationship::{DimensionValues, Relationship};

const TERRIFIED_FEAR: f64 = 0.7;

/// Emotional polarity of a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelValence {
    Positive,
    Neutral,
    Negative,
}

/// Every label the engine can produce, primary or secondary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipLabel {
    // Primary
    Terrified,
    Enemy,
    Devoted,
    Hostile,
    Rival,
    Resentful,
    Allied,
    Friendly,
    Wary,
    Indifferent,
    // Secondary
    Trusted,
    Respected,
    Beloved,
    Resented,
    Feared,
    Indebted,
}

impl RelationshipLabel {
    pub fn all() -> &'static [RelationshipLabel] {
        &[
            RelationshipLabel::Terrified,
            RelationshipLabel::Enemy,
            RelationshipLabel::Devoted,
            RelationshipLabel::Hostile,
            RelationshipLabel::Rival,
            RelationshipLabel::Resentful,
            RelationshipLabel::Allied,
            RelationshipLabel::Friendly,
            RelationshipLabel::Wary,
            RelationshipLabel::Indifferent,
            RelationshipLabel::Trusted,
            RelationshipLabel::Respected,
            RelationshipLabel::Beloved,
            RelationshipLabel::Resented,
            RelationshipLabel::Feared,
            RelationshipLabel::Indebted,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipLabel::Terrified => "terrified",
            RelationshipLabel::Enemy => "enemy",
            RelationshipLabel::Devoted => "devoted",
            RelationshipLabel::Hostile => "hostile",
            RelationshipLabel::Rival => "rival",
            RelationshipLabel::Resentful => "resentful",
            RelationshipLabel::Allied => "allied",
            RelationshipLabel::Friendly => "friendly",
            RelationshipLabel::Wary => "wary",
            RelationshipLabel::Indifferent => "indifferent",
            RelationshipLabel::Trusted => "trusted",
            RelationshipLabel::Respected => "respected",
            RelationshipLabel::Beloved => "beloved",
            RelationshipLabel::Resented => "resented",
            RelationshipLabel::Feared => "feared",
            RelationshipLabel::Indebted => "indebted",
        }
    }

    /// Capitalized form for compact UI badges.
    pub fn short_label(&self) -> String {
        capitalize(self.as_str())
    }

    pub fn valence(&self) -> LabelValence {
        match self {
            RelationshipLabel::Devoted
            | RelationshipLabel::Allied
            | RelationshipLabel::Friendly
            | RelationshipLabel::Trusted
            | RelationshipLabel::Respected
            | RelationshipLabel::Beloved => LabelValence::Positive,
            RelationshipLabel::Terrified
            | RelationshipLabel::Enemy
            | RelationshipLabel::Hostile
            | RelationshipLabel::Rival
            | RelationshipLabel::Resentful
            | RelationshipLabel::Resented
            | RelationshipLabel::Feared => LabelValence::Negative,
            RelationshipLabel::Wary
            | RelationshipLabel::Indifferent
            | RelationshipLabel::Indebted => LabelValence::Neutral,
        }
    }

    /// One-sentence description used when this label is the primary one.
    pub fn summary(&self) -> &'static str {
        match self {
            RelationshipLabel::Terrified => "Lives in fear of them",
            RelationshipLabel::Enemy => "A bitter and dangerous enemy",
            RelationshipLabel::Devoted => "Deeply devoted and loyal",
            RelationshipLabel::Hostile => "Openly hostile and distrustful",
            RelationshipLabel::Rival => "A respected but resented rival",
            RelationshipLabel::Resentful => "Harbors lingering resentment",
            RelationshipLabel::Allied => "A trusted and respected ally",
            RelationshipLabel::Friendly => "Warm and friendly",
            RelationshipLabel::Wary => "Cautious and wary",
            RelationshipLabel::Indifferent => "No strong feelings either way",
            RelationshipLabel::Trusted => "Trusts them completely",
            RelationshipLabel::Respected => "Holds them in high regard",
            RelationshipLabel::Beloved => "Holds them dear",
            RelationshipLabel::Resented => "Resents them",
            RelationshipLabel::Feared => "Is afraid of them",
            RelationshipLabel::Indebted => "Owes them a great deal",
        }
    }
}

impl fmt::Display for RelationshipLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipLabel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        RelationshipLabel::all()
            .iter()
            .copied()
            .find(|label| label.as_str() == normalized)
            .ok_or_else(|| DomainError::parse(format!("Unknown relationship label: {}", s)))
    }
}

/// Capitalized display form of a label.
pub fn short_label(label: RelationshipLabel) -> String {
    label.short_label()
}

/// Fixed valence lookup for a label.
pub fn label_valence(label: RelationshipLabel) -> LabelValence {
    label.valence()
}

/// One entry of the label list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub label: RelationshipLabel,
    pub valence: LabelValence,
}

impl From<RelationshipLabel> for LabelEntry {
    fn from(label: RelationshipLabel) -> Self {
        Self {
            label,
            valence: label.valence(),
        }
    }
}

/// Result of label computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipLabels {
    pub primary: RelationshipLabel,
    /// Primary label first, then secondary labels.
    pub labels: Vec<LabelEntry>,
    pub summary: String,
}

impl RelationshipLabels {
    pub fn contains(&self, label: RelationshipLabel) -> bool {
        self.labels.iter().any(|entry| entry.label == label)
    }

    pub fn secondary(&self) -> impl Iterator<Item = RelationshipLabel> + '_ {
        self.labels.iter().skip(1).map(|entry| entry.label)
    }
}

/// Classify a dimension vector. Pure and total.
pub fn compute_labels(values: &DimensionValues) -> RelationshipLabels {
    let primary = primary_label(values);

    let mut labels = vec![LabelEntry::from(primary)];
    labels.extend(secondary_labels(values).into_iter().map(LabelEntry::from));

    RelationshipLabels {
        primary,
        labels,
        summary: primary.summary().to_string(),
    }
}

impl Relationship {
    pub fn labels(&self) -> RelationshipLabels {
        compute_labels(&self.values)
    }
}

fn primary_label(v: &DimensionValues) -> RelationshipLabel {
    if v.fear > TERRIFIED_FEAR {
        RelationshipLabel::Terrified
    } else if v.fear > 0.5 && v.resentment > 0.6 {
        RelationshipLabel::Enemy
    } else if v.trust >= 0.8 && v.respect >= 0.8 && v.affection >= 0.8 {
        RelationshipLabel::Devoted
    } else if v.resentment >= 0.8 && v.trust <= 0.2 {
        RelationshipLabel::Hostile
    } else if v.respect >= 0.6 && v.resentment >= 0.4 && (0.3..=0.7).contains(&v.trust) {
        RelationshipLabel::Rival
    } else if v.resentment >= 0.6 {
        RelationshipLabel::Resentful
    } else if v.trust >= 0.75 && v.respect >= 0.75 {
        RelationshipLabel::Allied
    } else if v.trust >= 0.6 && v.affection >= 0.55 {
        RelationshipLabel::Friendly
    } else if v.trust <= 0.4 && (0.2..=TERRIFIED_FEAR).contains(&v.fear) {
        RelationshipLabel::Wary
    } else if is_indifferent(v) {
        RelationshipLabel::Indifferent
    } else {
        nearest_prototype(v)
    }
}

fn is_indifferent(v: &DimensionValues) -> bool {
    let centred = |x: f64| (0.45..=0.55).contains(&x);
    centred(v.trust)
        && centred(v.respect)
        && centred(v.affection)
        && v.fear <= 0.1
        && v.resentment <= 0.1
}

fn secondary_labels(v: &DimensionValues) -> Vec<RelationshipLabel> {
    let mut labels = Vec::new();
    if v.trust >= 0.8 {
        labels.push(RelationshipLabel::Trusted);
    }
    if v.respect >= 0.8 {
        labels.push(RelationshipLabel::Respected);
    }
    if v.affection >= 0.85 {
        labels.push(RelationshipLabel::Beloved);
    }
    if v.resentment >= 0.6 {
        labels.push(RelationshipLabel::Resented);
    }
    if v.fear >= 0.55 && v.fear <= TERRIFIED_FEAR {
        labels.push(RelationshipLabel::Feared);
    }
    if v.debt >= 0.6 {
        labels.push(RelationshipLabel::Indebted);
    }
    labels
}

/// (label, [trust, respect, affection, fear, resentment]).
/// Indifferent comes first so it wins distance ties.
const PROTOTYPES: [(RelationshipLabel, [f64; 5]); 10] = [
    (RelationshipLabel::Indifferent, [0.5, 0.5, 0.5, 0.0, 0.0]),
    (RelationshipLabel::Terrified, [0.3, 0.4, 0.2, 0.85, 0.3]),
    (RelationshipLabel::Enemy, [0.2, 0.3, 0.1, 0.6, 0.7]),
    (RelationshipLabel::Devoted, [0.9, 0.9, 0.9, 0.0, 0.0]),
    (RelationshipLabel::Hostile, [0.1, 0.2, 0.1, 0.2, 0.9]),
    (RelationshipLabel::Rival, [0.5, 0.7, 0.3, 0.1, 0.5]),
    (RelationshipLabel::Resentful, [0.3, 0.4, 0.3, 0.1, 0.7]),
    (RelationshipLabel::Allied, [0.8, 0.8, 0.5, 0.0, 0.1]),
    (RelationshipLabel::Friendly, [0.7, 0.5, 0.7, 0.0, 0.0]),
    (RelationshipLabel::Wary, [0.3, 0.5, 0.4, 0.35, 0.1]),
];

fn nearest_prototype(v: &DimensionValues) -> RelationshipLabel {
    let point = [v.trust, v.respect, v.affection, v.fear, v.resentment];
    let mut best = RelationshipLabel::Indifferent;
    let mut best_distance = f64::INFINITY;
    for (label, prototype) in PROTOTYPES.iter() {
        let distance: f64 = point
            .iter()
            .zip(prototype.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum();
        if distance < best_distance {
            best = *label;
            best_distance = distance;
        }
    }
    best
}
