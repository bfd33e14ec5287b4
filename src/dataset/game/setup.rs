//! Game setup: categories, the hidden solution, and each holder's hand

use std::collections::{BTreeMap, BTreeSet, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::{OracleError, OracleResult};

/// Name of the holder whose hand is disclosed when none is configured
pub const DEFAULT_HOLDER: &str = "Moriarty";

pub const CLASSIC_SUSPECTS: [&str; 6] = [
    "Miss Scarlett",
    "Colonel Mustard",
    "Mrs. White",
    "Reverend Green",
    "Mrs. Peacock",
    "Professor Plum",
];

pub const CLASSIC_WEAPONS: [&str; 6] = [
    "Candlestick",
    "Knife",
    "Lead Pipe",
    "Revolver",
    "Rope",
    "Wrench",
];

pub const CLASSIC_ROOMS: [&str; 9] = [
    "Kitchen",
    "Ballroom",
    "Conservatory",
    "Dining Room",
    "Billiard Room",
    "Library",
    "Lounge",
    "Hall",
    "Study",
];

/// Card category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Suspect,
    Weapon,
    Room,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Suspect => "suspect",
            Category::Weapon => "weapon",
            Category::Room => "room",
        }
    }

    /// Parse a category name, singular or plural
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().trim_end_matches('s') {
            "suspect" => Some(Category::Suspect),
            "weapon" => Some(Category::Weapon),
            "room" => Some(Category::Room),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The hidden answer: one card per category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub suspect: String,
    pub weapon: String,
    pub room: String,
}

impl Solution {
    pub fn new(
        suspect: impl Into<String>,
        weapon: impl Into<String>,
        room: impl Into<String>,
    ) -> Self {
        Self {
            suspect: suspect.into(),
            weapon: weapon.into(),
            room: room.into(),
        }
    }

    fn contains(&self, card: &str) -> bool {
        self.suspect == card || self.weapon == card || self.room == card
    }
}

/// Everything needed to start a game
///
/// `hands` maps every holder, the disclosing holder included, to its cards.
#[derive(Debug, Clone)]
pub struct GameSetup {
    pub suspects: Vec<String>,
    pub weapons: Vec<String>,
    pub rooms: Vec<String>,
    pub solution: Solution,
    pub holder: String,
    pub hands: BTreeMap<String, BTreeSet<String>>,
}

impl GameSetup {
    /// Deal every non-solution card round-robin, starting with `holder`
    ///
    /// Cards are dealt suspects first, then weapons, then rooms, each in the
    /// order given.
    pub fn deal(
        suspects: Vec<String>,
        weapons: Vec<String>,
        rooms: Vec<String>,
        solution: Solution,
        holder: impl Into<String>,
        other_holders: Vec<String>,
    ) -> OracleResult<Self> {
        let holder = holder.into();
        let mut seats = vec![holder.clone()];
        seats.extend(other_holders);

        let mut hands: BTreeMap<String, BTreeSet<String>> =
            seats.iter().map(|s| (s.clone(), BTreeSet::new())).collect();
        if hands.len() != seats.len() {
            return Err(OracleError::invalid_config("holder names must be unique"));
        }

        let undealt = suspects
            .iter()
            .chain(weapons.iter())
            .chain(rooms.iter())
            .filter(|card| !solution.contains(card));
        for (i, card) in undealt.enumerate() {
            let seat = &seats[i % seats.len()];
            if let Some(hand) = hands.get_mut(seat) {
                hand.insert(card.clone());
            }
        }

        let setup = Self {
            suspects,
            weapons,
            rooms,
            solution,
            holder,
            hands,
        };
        setup.validate()?;
        Ok(setup)
    }

    /// Deal with a solution drawn at random, one card per category
    pub fn with_random_solution(
        suspects: Vec<String>,
        weapons: Vec<String>,
        rooms: Vec<String>,
        holder: impl Into<String>,
        other_holders: Vec<String>,
    ) -> OracleResult<Self> {
        Self::with_solution_drawn_by(
            &mut rand::thread_rng(),
            suspects,
            weapons,
            rooms,
            holder,
            other_holders,
        )
    }

    /// Deal with a solution drawn from `rng`; a seeded rng gives a
    /// reproducible game
    pub fn with_solution_drawn_by<R: Rng + ?Sized>(
        rng: &mut R,
        suspects: Vec<String>,
        weapons: Vec<String>,
        rooms: Vec<String>,
        holder: impl Into<String>,
        other_holders: Vec<String>,
    ) -> OracleResult<Self> {
        let solution = match (suspects.choose(rng), weapons.choose(rng), rooms.choose(rng)) {
            (Some(suspect), Some(weapon), Some(room)) => {
                Solution::new(suspect.clone(), weapon.clone(), room.clone())
            }
            _ => {
                return Err(OracleError::invalid_config(
                    "every category needs at least one card",
                ))
            }
        };
        Self::deal(suspects, weapons, rooms, solution, holder, other_holders)
    }

    /// Classic card set with a randomly drawn solution
    pub fn classic(holder: impl Into<String>, other_holders: Vec<String>) -> OracleResult<Self> {
        Self::with_random_solution(
            to_owned(&CLASSIC_SUSPECTS),
            to_owned(&CLASSIC_WEAPONS),
            to_owned(&CLASSIC_ROOMS),
            holder,
            other_holders,
        )
    }

    /// Check the structural invariants of a setup
    ///
    /// - card names are non-empty and unique across all categories
    /// - the solution holds exactly one card of each category
    /// - the disclosing holder has a hand
    /// - every hand holds only game cards, none from the solution, and no
    ///   card sits in two hands
    pub fn validate(&self) -> OracleResult<()> {
        if self.suspects.is_empty() || self.weapons.is_empty() || self.rooms.is_empty() {
            return Err(OracleError::invalid_config("every category needs at least one card"));
        }

        let mut seen = HashSet::new();
        for card in self.suspects.iter().chain(&self.weapons).chain(&self.rooms) {
            if card.trim().is_empty() {
                return Err(OracleError::invalid_config("card names must not be empty"));
            }
            if !seen.insert(card.as_str()) {
                return Err(OracleError::invalid_config(format!("duplicate card: {}", card)));
            }
        }

        if !self.suspects.contains(&self.solution.suspect)
            || !self.weapons.contains(&self.solution.weapon)
            || !self.rooms.contains(&self.solution.room)
        {
            return Err(OracleError::invalid_config(
                "solution must name one card from each category",
            ));
        }

        if self.holder.trim().is_empty() || !self.hands.contains_key(&self.holder) {
            return Err(OracleError::invalid_config(format!(
                "holder '{}' has no hand",
                self.holder
            )));
        }

        let mut dealt = HashSet::new();
        for (owner, hand) in &self.hands {
            for card in hand {
                if !seen.contains(card.as_str()) {
                    return Err(OracleError::invalid_config(format!(
                        "{} holds unknown card {}",
                        owner, card
                    )));
                }
                if self.solution.contains(card) {
                    return Err(OracleError::invalid_config(format!(
                        "{} holds a solution card",
                        owner
                    )));
                }
                if !dealt.insert(card.as_str()) {
                    return Err(OracleError::invalid_config(format!(
                        "{} is dealt to more than one holder",
                        card
                    )));
                }
            }
        }

        Ok(())
    }

    /// Resolve a card name (case-insensitive) to its category and canonical name
    pub fn find_card(&self, name: &str) -> Option<(Category, &str)> {
        let name = name.trim();
        [Category::Suspect, Category::Weapon, Category::Room]
            .into_iter()
            .find_map(|category| {
                self.cards_in(category)
                    .iter()
                    .find(|c| c.eq_ignore_ascii_case(name))
                    .map(|c| (category, c.as_str()))
            })
    }

    /// Cards of one category
    pub fn cards_in(&self, category: Category) -> &[String] {
        match category {
            Category::Suspect => &self.suspects,
            Category::Weapon => &self.weapons,
            Category::Room => &self.rooms,
        }
    }
}

fn to_owned(cards: &[&str]) -> Vec<String> {
    cards.iter().map(|c| c.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_setup() -> GameSetup {
        GameSetup::deal(
            to_owned(&["Colonel Mustard", "Miss Scarlett"]),
            to_owned(&["Knife", "Rope"]),
            to_owned(&["Library", "Hall"]),
            Solution::new("Miss Scarlett", "Rope", "Hall"),
            "Moriarty",
            vec!["Lestrade".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_deal_round_robin() {
        let setup = small_setup();

        let moriarty: Vec<&str> = setup.hands["Moriarty"].iter().map(|s| s.as_str()).collect();
        let lestrade: Vec<&str> = setup.hands["Lestrade"].iter().map(|s| s.as_str()).collect();
        assert_eq!(moriarty, vec!["Colonel Mustard", "Library"]);
        assert_eq!(lestrade, vec!["Knife"]);
    }

    #[test]
    fn test_classic_setup_is_valid() {
        let setup = GameSetup::classic(DEFAULT_HOLDER, vec!["Lestrade".into(), "Hudson".into()])
            .unwrap();

        let dealt: usize = setup.hands.values().map(|h| h.len()).sum();
        assert_eq!(dealt, 6 + 6 + 9 - 3);
        assert!(setup.validate().is_ok());
    }

    #[test]
    fn test_random_solution_needs_cards() {
        let err = GameSetup::with_random_solution(
            to_owned(&["Colonel Mustard"]),
            Vec::new(),
            to_owned(&["Library"]),
            "Moriarty",
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, OracleError::InvalidConfig(_)));
    }

    #[test]
    fn test_seeded_draw_is_reproducible() {
        let draw = |seed: u64| {
            GameSetup::with_solution_drawn_by(
                &mut StdRng::seed_from_u64(seed),
                to_owned(&CLASSIC_SUSPECTS),
                to_owned(&CLASSIC_WEAPONS),
                to_owned(&CLASSIC_ROOMS),
                DEFAULT_HOLDER,
                vec!["Lestrade".into()],
            )
            .unwrap()
        };

        let first = draw(7);
        let again = draw(7);
        assert_eq!(first.solution, again.solution);
        assert_eq!(first.hands, again.hands);
        assert!(CLASSIC_SUSPECTS.contains(&first.solution.suspect.as_str()));
        assert!(CLASSIC_WEAPONS.contains(&first.solution.weapon.as_str()));
        assert!(CLASSIC_ROOMS.contains(&first.solution.room.as_str()));
    }

    #[test]
    fn test_solution_must_come_from_categories() {
        let err = GameSetup::deal(
            to_owned(&["Colonel Mustard"]),
            to_owned(&["Knife"]),
            to_owned(&["Library"]),
            Solution::new("Colonel Mustard", "Spoon", "Library"),
            "Moriarty",
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, OracleError::InvalidConfig(_)));
    }

    #[test]
    fn test_holder_cannot_own_solution_card() {
        let mut setup = small_setup();
        setup
            .hands
            .get_mut("Moriarty")
            .unwrap()
            .insert("Rope".to_string());
        assert!(setup.validate().is_err());
    }

    #[test]
    fn test_hands_must_be_disjoint() {
        let mut setup = small_setup();
        setup
            .hands
            .get_mut("Lestrade")
            .unwrap()
            .insert("Library".to_string());
        assert!(setup.validate().is_err());
    }

    #[test]
    fn test_duplicate_cards_rejected() {
        let err = GameSetup::deal(
            to_owned(&["Knife"]),
            to_owned(&["Knife"]),
            to_owned(&["Library"]),
            Solution::new("Knife", "Knife", "Library"),
            "Moriarty",
            vec![],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate card"));
    }

    #[test]
    fn test_find_card_case_insensitive() {
        let setup = small_setup();
        assert_eq!(setup.find_card("knife"), Some((Category::Weapon, "Knife")));
        assert_eq!(
            setup.find_card(" colonel mustard "),
            Some((Category::Suspect, "Colonel Mustard"))
        );
        assert_eq!(setup.find_card("Spoon"), None);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::parse("Weapons"), Some(Category::Weapon));
        assert_eq!(Category::parse("room"), Some(Category::Room));
        assert_eq!(Category::parse("motive"), None);
    }
}
