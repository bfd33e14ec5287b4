//! Query handlers for the secret game dataset
//!
//! Each handler turns a request into a `QueryResult`. Handlers that disclose
//! cards do so through `reveal_card` and list the cards in
//! `revealed_information`.

use std::collections::BTreeSet;

use serde_json::{json, Value};

use super::records::Suggestion;
use super::setup::Category;
use super::SecretGameDataset;
use crate::core::{ErrorCode, QueryParams, QueryResult, QueryType};
use crate::dataset::policy::{progressive_stage, RevealPolicy};
use crate::dataset::QueryRequest;

/// Non-empty, trimmed string parameter
fn str_param<'a>(params: &'a QueryParams, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub(super) fn unsupported(query_type: QueryType) -> QueryResult {
    QueryResult::failure(
        query_type,
        ErrorCode::QueryFailed,
        format!("{} is not answered by this dataset", query_type),
    )
}

fn invalid(query_type: QueryType, message: impl Into<String>) -> QueryResult {
    QueryResult::failure(query_type, ErrorCode::InvalidParams, message)
}

impl SecretGameDataset {
    /// Holder's cards not yet shown to `agent`, in hand order
    fn unrevealed_for(&self, agent: &str) -> Vec<String> {
        let seen = self.cards_revealed_to(agent);
        self.hand
            .iter()
            .filter(|card| !seen.contains(*card))
            .cloned()
            .collect()
    }

    /// Per-category counts of the holder's cards `agent` has not seen
    fn clue_for(&self, agent: &str) -> Value {
        let unrevealed = self.unrevealed_for(agent);
        let count = |category: Category| {
            unrevealed
                .iter()
                .filter(|card| matches!(self.find_card(card), Some((c, _)) if c == category))
                .count()
        };
        json!({
            "holder": self.holder(),
            "suspects": count(Category::Suspect),
            "weapons": count(Category::Weapon),
            "rooms": count(Category::Room),
            "unrevealed_total": unrevealed.len(),
        })
    }

    /// Reveal up to `limit` unseen cards to the requester
    fn reveal_next(&self, request: &QueryRequest<'_>, limit: usize, reason: &str) -> Vec<String> {
        self.unrevealed_for(request.agent_name)
            .into_iter()
            .take(limit)
            .filter_map(|card| {
                self.reveal_card(&card, request.agent_name, reason, request.query_type)
                    .ok()
                    .map(|record| record.item_revealed)
            })
            .collect()
    }

    pub(super) fn query_suggestion(&self, request: &QueryRequest<'_>) -> QueryResult {
        let qt = request.query_type;
        let mut slots = Vec::with_capacity(3);
        for (key, category) in [
            ("suspect", Category::Suspect),
            ("weapon", Category::Weapon),
            ("room", Category::Room),
        ] {
            let Some(name) = str_param(request.params, key) else {
                return invalid(qt, format!("missing '{}'", key));
            };
            match self.find_card(name) {
                Some((c, canonical)) if c == category => slots.push(canonical.to_string()),
                _ => return invalid(qt, format!("'{}' is not a known {}", name, category)),
            }
        }

        let [suspect, weapon, room]: [String; 3] = match slots.try_into() {
            Ok(slots) => slots,
            Err(_) => return invalid(qt, "suggestion needs three cards"),
        };
        let suggestion = Suggestion::new(suspect, weapon, room, request.agent_name);
        let result =
            self.validate_suggestion_under(suggestion, request.agent_name, request.reveal_policy);

        let message = result.reason.clone();
        let revealed = result.revealed_items.clone();
        match serde_json::to_value(&result) {
            Ok(data) => QueryResult::success(qt, data, message).with_revealed(revealed),
            Err(e) => QueryResult::failure(qt, ErrorCode::ExecutionError, e.to_string()),
        }
    }

    pub(super) fn query_card_inquiry(&self, request: &QueryRequest<'_>) -> QueryResult {
        let qt = request.query_type;
        let Some(name) = str_param(request.params, "card") else {
            return invalid(qt, "missing 'card'");
        };
        let Some((category, card)) = self.find_card(name) else {
            let message = format!("Unknown card: {}", name);
            return QueryResult::failure(qt, ErrorCode::QueryFailed, message);
        };

        if !self.hand.contains(card) {
            return QueryResult::success(
                qt,
                json!({ "card": card, "category": category, "held": false }),
                format!("{} does not hold {}", self.holder(), card),
            );
        }

        match self.reveal_card(card, request.agent_name, "card inquiry", qt) {
            Ok(record) => QueryResult::success(
                qt,
                json!({ "card": card, "category": category, "held": true }),
                format!("{} holds {}", self.holder(), card),
            )
            .with_revealed(vec![record.item_revealed]),
            Err(e) => QueryResult::failure(qt, ErrorCode::QueryFailed, e.to_string()),
        }
    }

    pub(super) fn query_revelation(&self, request: &QueryRequest<'_>) -> QueryResult {
        let qt = request.query_type;
        if request.reveal_policy == RevealPolicy::Competitive {
            return QueryResult::failure(
                qt,
                ErrorCode::QueryFailed,
                format!("{} declines voluntary revelations", self.holder()),
            );
        }

        let target = match str_param(request.params, "card") {
            None => None,
            Some(name) => match self.find_card(name) {
                Some((_, card)) => Some(card.to_string()),
                None => {
                    return QueryResult::failure(
                        qt,
                        ErrorCode::QueryFailed,
                        format!("Unknown card: {}", name),
                    )
                }
            },
        };

        let unrevealed = self.unrevealed_for(request.agent_name);
        let card = match target {
            Some(card) if unrevealed.contains(&card) => card,
            Some(card) if self.hand.contains(&card) => {
                return QueryResult::success(
                    qt,
                    json!({ "card": card, "already_revealed": true }),
                    format!("{} was already revealed to you", card),
                )
            }
            Some(card) => {
                return QueryResult::failure(
                    qt,
                    ErrorCode::QueryFailed,
                    format!("{} has no such card to reveal: {}", self.holder(), card),
                )
            }
            None => match unrevealed.into_iter().next() {
                Some(card) => card,
                None => {
                    return QueryResult::success(
                        qt,
                        json!({ "card": Value::Null, "exhausted": true }),
                        format!("{} has nothing left to reveal to you", self.holder()),
                    )
                }
            },
        };

        match self.reveal_card(&card, request.agent_name, "revelation request", qt) {
            Ok(record) => QueryResult::success(
                qt,
                json!({ "card": record.item_revealed, "already_revealed": false }),
                format!("{} reveals {}", self.holder(), record.item_revealed),
            )
            .with_revealed(vec![record.item_revealed]),
            Err(e) => QueryResult::failure(qt, ErrorCode::QueryFailed, e.to_string()),
        }
    }

    pub(super) fn query_clue(&self, request: &QueryRequest<'_>) -> QueryResult {
        let clue = self.clue_for(request.agent_name);
        let total = clue["unrevealed_total"].as_u64().unwrap_or(0);
        QueryResult::success(
            request.query_type,
            clue,
            format!("{} still holds {} card(s) you have not seen", self.holder(), total),
        )
    }

    pub(super) fn query_progressive_hint(&self, request: &QueryRequest<'_>) -> QueryResult {
        let qt = request.query_type;
        let level = progressive_stage(self.suggestion_count());

        if level == 1 {
            return QueryResult::success(
                qt,
                json!({ "level": level, "clue": self.clue_for(request.agent_name) }),
                "Hint: how many unseen cards the holder keeps in each category",
            );
        }

        let revealed = self.reveal_next(request, level - 1, "progressive hint");
        let message = if revealed.is_empty() {
            format!("{} has nothing left to reveal to you", self.holder())
        } else {
            format!("Hint: {} holds {}", self.holder(), revealed.join(", "))
        };
        QueryResult::success(qt, json!({ "level": level, "cards": revealed }), message)
            .with_revealed(revealed)
    }

    pub(super) fn query_game_state(&self, request: &QueryRequest<'_>) -> QueryResult {
        let seen: Vec<String> = self.cards_revealed_to(request.agent_name).into_iter().collect();
        QueryResult::success(
            request.query_type,
            json!({
                "holder": self.holder(),
                "suspects": self.cards_in(Category::Suspect),
                "weapons": self.cards_in(Category::Weapon),
                "rooms": self.cards_in(Category::Room),
                "suggestion_count": self.suggestion_count(),
                "cards_revealed": self.cards_revealed(),
                "total_queries": self.total_queries(),
                "reveal_policy": request.reveal_policy,
                "revealed_to_you": seen,
            }),
            "Current game state",
        )
    }

    pub(super) fn query_logical_validation(&self, request: &QueryRequest<'_>) -> QueryResult {
        let qt = request.query_type;
        let Some(claimed) = request.params.get("eliminated").and_then(Value::as_array) else {
            return invalid(qt, "'eliminated' must be a list of cards");
        };

        let seen = self.cards_revealed_to(request.agent_name);
        let mut supported = BTreeSet::new();
        let mut unsupported = BTreeSet::new();
        let mut unknown = BTreeSet::new();

        for name in claimed {
            let Some(name) = name.as_str() else {
                return invalid(qt, "'eliminated' must contain only card names");
            };
            match self.find_card(name) {
                Some((_, card)) if seen.contains(card) => {
                    supported.insert(card.to_string());
                }
                Some((_, card)) => {
                    unsupported.insert(card.to_string());
                }
                None => {
                    unknown.insert(name.to_string());
                }
            }
        }

        let consistent = unsupported.is_empty() && unknown.is_empty();
        QueryResult::success(
            qt,
            json!({
                "consistent": consistent,
                "supported": supported,
                "unsupported": unsupported,
                "unknown": unknown,
            }),
            if consistent {
                "Every elimination is backed by a revealed card".to_string()
            } else {
                format!(
                    "{} elimination(s) are not backed by cards revealed to you",
                    unsupported.len() + unknown.len()
                )
            },
        )
    }

    pub(super) fn query_constraint_check(&self, request: &QueryRequest<'_>) -> QueryResult {
        let qt = request.query_type;
        let Some(name) = str_param(request.params, "card") else {
            return invalid(qt, "missing 'card'");
        };
        let expected = match str_param(request.params, "category") {
            None => None,
            Some(raw) => match Category::parse(raw) {
                Some(category) => Some(category),
                None => return invalid(qt, format!("unknown category '{}'", raw)),
            },
        };

        let Some((category, card)) = self.find_card(name) else {
            return QueryResult::success(
                qt,
                json!({ "card": name, "is_game_card": false }),
                format!("{} is not part of this game", name),
            );
        };

        let mut data = json!({ "card": card, "is_game_card": true, "category": category });
        let message = match expected {
            Some(expected) => {
                data["matches_category"] = Value::Bool(expected == category);
                if expected == category {
                    format!("{} is a {}", card, category)
                } else {
                    format!("{} is a {}, not a {}", card, category, expected)
                }
            }
            None => format!("{} is a {}", card, category),
        };
        QueryResult::success(qt, data, message)
    }

    pub(super) fn query_dataset_access(&self, request: &QueryRequest<'_>) -> QueryResult {
        let (cards_revealed, history_len) = self.revelation_counts();
        QueryResult::success(
            request.query_type,
            json!({
                "name": self.name,
                "holder": self.holder(),
                "holders": self.setup.hands.len(),
                "categories": {
                    "suspects": self.cards_in(Category::Suspect).len(),
                    "weapons": self.cards_in(Category::Weapon).len(),
                    "rooms": self.cards_in(Category::Room).len(),
                },
                "suggestion_count": self.suggestion_count(),
                "cards_revealed": cards_revealed,
                "revelation_history_len": history_len,
            }),
            format!("Dataset '{}'", self.name),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::knife_library_game;
    use super::*;
    use crate::dataset::Dataset;

    fn params(value: Value) -> QueryParams {
        value.as_object().cloned().unwrap_or_default()
    }

    async fn ask(
        dataset: &SecretGameDataset,
        agent: &str,
        query_type: QueryType,
        params_value: Value,
        policy: RevealPolicy,
    ) -> QueryResult {
        let p = params(params_value);
        dataset
            .process_query(QueryRequest {
                agent_name: agent,
                query_type,
                params: &p,
                reveal_policy: policy,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_suggestion_uses_request_policy() {
        let dataset = knife_library_game();
        let suggestion = json!({
            "suspect": "Colonel Mustard",
            "weapon": "knife",
            "room": "Library"
        });

        let result = ask(
            &dataset,
            "Holmes",
            QueryType::SuggestionValidation,
            suggestion.clone(),
            RevealPolicy::Cooperative,
        )
        .await;
        assert!(result.success);
        assert_eq!(result.revealed_information.len(), 2);
        assert_eq!(result.data["can_refute"], json!(true));

        let result = ask(
            &dataset,
            "Watson",
            QueryType::SuggestionValidation,
            suggestion,
            RevealPolicy::Competitive,
        )
        .await;
        assert_eq!(result.revealed_information, vec!["Knife".to_string()]);
        assert_eq!(dataset.cards_revealed(), 3);
    }

    #[tokio::test]
    async fn test_suggestion_rejects_wrong_category() {
        let dataset = knife_library_game();
        let result = ask(
            &dataset,
            "Holmes",
            QueryType::SuggestionValidation,
            json!({"suspect": "Knife", "weapon": "Rope", "room": "Hall"}),
            RevealPolicy::Balanced,
        )
        .await;

        assert!(!result.success);
        assert_eq!(result.error_code, Some(ErrorCode::InvalidParams));
        assert_eq!(dataset.suggestion_count(), 0);
    }

    #[tokio::test]
    async fn test_card_inquiry() {
        let dataset = knife_library_game();

        let held = ask(
            &dataset,
            "Watson",
            QueryType::CardInquiry,
            json!({"card": "Knife"}),
            RevealPolicy::Balanced,
        )
        .await;
        assert_eq!(held.data["held"], json!(true));
        assert_eq!(held.revealed_information, vec!["Knife".to_string()]);

        let not_held = ask(
            &dataset,
            "Watson",
            QueryType::CardInquiry,
            json!({"card": "Rope"}),
            RevealPolicy::Balanced,
        )
        .await;
        assert!(not_held.success);
        assert_eq!(not_held.data["held"], json!(false));
        assert!(not_held.revealed_information.is_empty());

        let unknown = ask(
            &dataset,
            "Watson",
            QueryType::CardInquiry,
            json!({"card": "Spoon"}),
            RevealPolicy::Balanced,
        )
        .await;
        assert!(!unknown.success);
        assert_eq!(unknown.error_code, Some(ErrorCode::QueryFailed));

        assert_eq!(dataset.cards_revealed(), 1);
    }

    #[tokio::test]
    async fn test_revelation_request_walks_the_hand() {
        let dataset = knife_library_game();
        let policy = RevealPolicy::Cooperative;

        let first = ask(&dataset, "Holmes", QueryType::RevelationRequest, json!({}), policy).await;
        let second = ask(&dataset, "Holmes", QueryType::RevelationRequest, json!({}), policy).await;
        let third = ask(&dataset, "Holmes", QueryType::RevelationRequest, json!({}), policy).await;

        assert_eq!(first.revealed_information, vec!["Knife".to_string()]);
        assert_eq!(second.revealed_information, vec!["Library".to_string()]);
        assert_eq!(third.data["exhausted"], json!(true));
        assert_eq!(dataset.revelations_for("Holmes").len(), 2);
    }

    #[tokio::test]
    async fn test_revelation_request_declined_when_competitive() {
        let dataset = knife_library_game();
        let result = ask(
            &dataset,
            "Holmes",
            QueryType::RevelationRequest,
            json!({}),
            RevealPolicy::Competitive,
        )
        .await;

        assert!(!result.success);
        assert_eq!(dataset.cards_revealed(), 0);
    }

    #[tokio::test]
    async fn test_named_revelation_of_unheld_card_fails() {
        let dataset = knife_library_game();
        let result = ask(
            &dataset,
            "Holmes",
            QueryType::RevelationRequest,
            json!({"card": "Wrench"}),
            RevealPolicy::Balanced,
        )
        .await;

        assert!(!result.success);
        assert_eq!(dataset.cards_revealed(), 0);
    }

    #[tokio::test]
    async fn test_clue_counts_unseen_cards() {
        let dataset = knife_library_game();
        let before = ask(
            &dataset,
            "Holmes",
            QueryType::ClueRequest,
            json!({}),
            RevealPolicy::Balanced,
        )
        .await;
        assert_eq!(before.data["weapons"], json!(1));
        assert_eq!(before.data["rooms"], json!(1));
        assert_eq!(before.data["unrevealed_total"], json!(2));

        dataset
            .reveal_card("Knife", "Holmes", "test", QueryType::CardInquiry)
            .unwrap();
        let after = ask(
            &dataset,
            "Holmes",
            QueryType::ClueRequest,
            json!({}),
            RevealPolicy::Balanced,
        )
        .await;
        assert_eq!(after.data["weapons"], json!(0));
        assert_eq!(after.data["unrevealed_total"], json!(1));
        assert_eq!(dataset.cards_revealed(), 1);
    }

    #[tokio::test]
    async fn test_progressive_hint_levels() {
        let dataset = knife_library_game();

        let early = ask(
            &dataset,
            "Holmes",
            QueryType::ProgressiveHint,
            json!({}),
            RevealPolicy::Balanced,
        )
        .await;
        assert_eq!(early.data["level"], json!(1));
        assert!(early.revealed_information.is_empty());

        for _ in 0..3 {
            dataset.validate_suggestion(
                Suggestion::new("Miss Scarlett", "Wrench", "Hall", "Holmes"),
                "Holmes",
            );
        }
        let mid = ask(
            &dataset,
            "Holmes",
            QueryType::ProgressiveHint,
            json!({}),
            RevealPolicy::Balanced,
        )
        .await;
        assert_eq!(mid.data["level"], json!(2));
        assert_eq!(mid.revealed_information.len(), 1);
    }

    #[tokio::test]
    async fn test_game_state_never_contains_solution() {
        let dataset = knife_library_game();
        let state = ask(
            &dataset,
            "Holmes",
            QueryType::GameState,
            json!({}),
            RevealPolicy::Balanced,
        )
        .await;

        assert!(state.success);
        assert!(state.data.get("solution").is_none());
        assert_eq!(state.data["holder"], json!("Moriarty"));
        assert_eq!(state.data["reveal_policy"], json!("balanced"));
    }

    #[tokio::test]
    async fn test_logical_validation_uses_only_revealed_cards() {
        let dataset = knife_library_game();
        dataset
            .reveal_card("Knife", "Holmes", "test", QueryType::CardInquiry)
            .unwrap();

        let result = ask(
            &dataset,
            "Holmes",
            QueryType::LogicalValidation,
            json!({"eliminated": ["Knife", "Rope", "Teapot"]}),
            RevealPolicy::Balanced,
        )
        .await;

        assert_eq!(result.data["consistent"], json!(false));
        assert_eq!(result.data["supported"], json!(["Knife"]));
        assert_eq!(result.data["unsupported"], json!(["Rope"]));
        assert_eq!(result.data["unknown"], json!(["Teapot"]));

        let missing = ask(
            &dataset,
            "Holmes",
            QueryType::LogicalValidation,
            json!({}),
            RevealPolicy::Balanced,
        )
        .await;
        assert_eq!(missing.error_code, Some(ErrorCode::InvalidParams));
    }

    #[tokio::test]
    async fn test_constraint_check() {
        let dataset = knife_library_game();

        let result = ask(
            &dataset,
            "Holmes",
            QueryType::ConstraintCheck,
            json!({"card": "Library", "category": "weapons"}),
            RevealPolicy::Balanced,
        )
        .await;
        assert_eq!(result.data["category"], json!("room"));
        assert_eq!(result.data["matches_category"], json!(false));

        let result = ask(
            &dataset,
            "Holmes",
            QueryType::ConstraintCheck,
            json!({"card": "Teapot"}),
            RevealPolicy::Balanced,
        )
        .await;
        assert_eq!(result.data["is_game_card"], json!(false));
        assert_eq!(dataset.cards_revealed(), 0);
    }

    #[tokio::test]
    async fn test_dataset_access_and_manager_scoped_types() {
        let dataset = knife_library_game();

        let info = ask(
            &dataset,
            "Holmes",
            QueryType::DatasetAccess,
            json!({}),
            RevealPolicy::Balanced,
        )
        .await;
        assert_eq!(info.data["categories"]["weapons"], json!(3));
        assert_eq!(info.metadata.get("dataset"), Some(&json!("secret_game")));

        let admin = ask(
            &dataset,
            "Holmes",
            QueryType::AdminCommand,
            json!({}),
            RevealPolicy::Balanced,
        )
        .await;
        assert!(!admin.success);
        assert_eq!(dataset.total_queries(), 2);
    }
}
