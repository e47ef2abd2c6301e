//! Side-mission catalog and the per-session deck that deals from it.
//!
//! The catalog is static content, loaded once and shared read-only; the
//! deck guarantees a session never issues the same mission twice and simply
//! runs dry instead of erroring when the catalog is exhausted.

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Mission {
    pub id: String,
    pub description: String,
    pub difficulty: Difficulty,
}

fn mission(id: &str, description: &str, difficulty: Difficulty) -> Mission {
    Mission {
        id: id.into(),
        description: description.into(),
        difficulty,
    }
}

static MISSIONS: Lazy<Vec<Mission>> = Lazy::new(|| {
    use Difficulty::*;
    vec![
        mission("miss_1", "Buy Boots as your first item", Easy),
        mission("miss_2", "Do not farm the jungle for 5 minutes", Easy),
        mission("miss_3", "Spam the 'On my way' ping 3 times in a row", Easy),
        mission("miss_4", "Type 'gg' in chat every 3 minutes", Easy),
        mission("miss_5", "Buy a Control Ward", Easy),
        mission("miss_6", "Steal a neutral objective (Drake/Baron/Herald)", Medium),
        mission("miss_7", "Die exactly 3 times (no more, no less)", Medium),
        mission("miss_8", "Finish with exactly 100 CS (+/- 5)", Medium),
        mission("miss_9", "Do not recall to base before 10 minutes", Medium),
        mission("miss_10", "Get a double kill", Medium),
        mission("miss_11", "Get a pentakill OR steal the Baron", Hard),
        mission("miss_12", "Finish with the LEAST damage on your team", Hard),
        mission("miss_13", "Place 15 wards over the match", Hard),
        mission("miss_14", "Win without buying a Mythic item", Hard),
        mission("miss_15", "Get 5 kills without dying (killing spree)", Hard),
    ]
});

pub fn catalog() -> &'static [Mission] {
    &MISSIONS
}

/// A shuffled, session-owned copy of the catalog. Each draw is unique.
#[derive(Debug)]
pub struct MissionDeck {
    remaining: Vec<&'static Mission>,
}

impl MissionDeck {
    pub fn shuffled() -> Self {
        let mut remaining: Vec<&'static Mission> = catalog().iter().collect();
        remaining.shuffle(&mut rand::rng());
        MissionDeck { remaining }
    }

    /// `None` once the catalog is used up; the caller stops issuing.
    pub fn draw(&mut self) -> Option<&'static Mission> {
        self.remaining.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn deck_deals_every_mission_once_then_runs_dry() {
        let mut deck = MissionDeck::shuffled();
        let mut seen = HashSet::new();
        while let Some(m) = deck.draw() {
            assert!(seen.insert(m.id.clone()), "duplicate mission {}", m.id);
        }
        assert_eq!(seen.len(), catalog().len());
        assert!(deck.draw().is_none());
    }
}
