//! Suggestions, revelation records, and validation outcomes

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::QueryType;

/// A three-slot accusation put to the holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub suspect: String,
    pub weapon: String,
    pub room: String,
    pub submitted_by: String,
    pub timestamp: DateTime<Utc>,
}

impl Suggestion {
    pub fn new(
        suspect: impl Into<String>,
        weapon: impl Into<String>,
        room: impl Into<String>,
        submitted_by: impl Into<String>,
    ) -> Self {
        Self {
            suspect: suspect.into(),
            weapon: weapon.into(),
            room: room.into(),
            submitted_by: submitted_by.into(),
            timestamp: Utc::now(),
        }
    }

    /// The three named cards, in slot order
    pub fn cards(&self) -> [&str; 3] {
        [&self.suspect, &self.weapon, &self.room]
    }
}

/// One card crossing the authorization boundary
///
/// Appended to the dataset's history by `reveal_card` and never modified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevelationRecord {
    pub timestamp: DateTime<Utc>,
    pub item_revealed: String,
    pub revealed_to: String,
    pub revealed_by: String,
    pub reason: String,
    pub query_type: QueryType,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

/// Outcome of checking a suggestion against the holder's hand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// The holder owns at least one of the suggested cards
    pub can_refute: bool,
    /// Nothing could be refuted; says nothing about the game-wide answer
    pub suggestion_valid: bool,
    pub authorized: bool,
    pub reason: String,
    /// Cards shown to the requester, each backed by a revelation record
    pub revealed_items: Vec<String>,
}
