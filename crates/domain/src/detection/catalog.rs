//! Keyword catalogs for the rule-based detector.
//!
//! Both catalogs are ordered. The trait detector walks categories in catalog
//! order and keywords in list order, stopping at the first keyword hit per
//! category, so reordering entries changes which keyword is reported.

use crate::relationship::RelationshipDimension::{self, *};

/// Trait name -> keywords that suggest it.
pub const TRAIT_CATALOG: &[(&str, &[&str])] = &[
    ("merciful", &["spare", "mercy", "forgive", "let go", "compassion", "release"]),
    ("ruthless", &["kill", "execute", "destroy", "crush", "eliminate", "no mercy"]),
    ("honorable", &["promise", "oath", "honor", "keep my word", "fair fight", "truth"]),
    ("pragmatic", &["practical", "compromise", "deal", "trade", "whatever works", "necessary"]),
    ("idealistic", &["justice", "righteous", "believe in", "dream", "better world", "ideal"]),
    ("haunted", &["nightmare", "haunted", "memories", "ghost", "can't forget", "guilt"]),
    ("hopeful", &["hope", "optimis", "bright future", "faith", "someday", "believe"]),
    ("bitter", &["bitter", "betrayed", "grudge", "resent", "never again", "cynical"]),
    ("battle-hardened", &["battle", "combat", "fought", "survived", "war", "veteran"]),
    ("scholarly", &["study", "research", "book", "ancient text", "knowledge", "decipher"]),
    ("street-wise", &["streets", "pickpocket", "alley", "black market", "smuggl", "underworld"]),
    ("cunning", &["trick", "deceive", "outwit", "scheme", "clever", "manipulat"]),
    ("feared", &["fear", "terrif", "trembl", "flee", "cower", "intimidat"]),
    ("beloved", &["cheer", "celebrat", "adore", "grateful", "thank", "beloved"]),
    ("notorious", &["wanted", "bounty", "infamous", "notorious", "reputation", "crime"]),
    ("legendary", &["legend", "song", "bards", "hero", "epic", "renowned"]),
];

/// Keyword -> dimension impacts on the observer's view of the actor.
pub const RELATIONSHIP_CATALOG: &[(&str, &[(RelationshipDimension, f64)])] = &[
    ("betray", &[(Trust, -0.3), (Resentment, 0.2)]),
    ("help", &[(Trust, 0.1)]),
    ("save", &[(Trust, 0.2), (Affection, 0.15), (Debt, 0.2)]),
    ("rescue", &[(Trust, 0.2), (Debt, 0.25)]),
    ("protect", &[(Trust, 0.15), (Affection, 0.1)]),
    ("threaten", &[(Fear, 0.15)]),
    ("attack", &[(Fear, 0.1), (Resentment, 0.2), (Trust, -0.15)]),
    ("insult", &[(Respect, -0.1), (Resentment, 0.15)]),
    ("lie", &[(Trust, -0.2)]),
    ("steal", &[(Trust, -0.2), (Resentment, 0.15)]),
    ("stole", &[(Trust, -0.2), (Resentment, 0.15)]),
    ("gift", &[(Affection, 0.15)]),
    ("praise", &[(Respect, 0.1), (Affection, 0.05)]),
    ("defeat", &[(Respect, 0.15), (Fear, 0.1)]),
    ("owe", &[(Debt, 0.2)]),
    ("repay", &[(Debt, -0.2)]),
    ("forgive", &[(Resentment, -0.2), (Affection, 0.05)]),
    ("humiliate", &[(Resentment, 0.25), (Respect, -0.1)]),
];

/// Whether `keyword` occurs in `haystack` starting at a word boundary.
///
/// Both inputs are expected lower-cased. Matching at word starts lets stems
/// like "manipulat" hit "manipulated" while keeping "lie" out of "believe".
pub fn contains_keyword(haystack: &str, keyword: &str) -> bool {
    haystack.match_indices(keyword).any(|(idx, _)| {
        haystack[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

/// First keyword of `keywords` found in `haystack`.
pub fn first_match<'a>(haystack: &str, keywords: &[&'a str]) -> Option<&'a str> {
    keywords
        .iter()
        .copied()
        .find(|keyword| contains_keyword(haystack, keyword))
}
