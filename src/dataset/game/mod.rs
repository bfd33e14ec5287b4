//! Secret game dataset
//!
//! A deduction game with a hidden solution and one disclosing holder. Every
//! answer is truthful, but the reveal policy decides how much of the truth
//! is shown. Cards only ever leave through [`SecretGameDataset::reveal_card`],
//! which appends a [`RevelationRecord`]; the observable behavior of the
//! dataset can be rebuilt from that log alone.

mod queries;
mod records;
mod setup;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

pub use records::{RevelationRecord, Suggestion, ValidationResult};
pub use setup::{
    Category, GameSetup, Solution, CLASSIC_ROOMS, CLASSIC_SUSPECTS, CLASSIC_WEAPONS,
    DEFAULT_HOLDER,
};

use super::policy::{apply_revelation_strategy, RevealPolicy};
use super::{Dataset, QueryRequest};
use crate::core::{
    IntegrityViolation, OracleError, OracleResult, ProtectedState, QueryResult, QueryType,
};

/// Revelation history and its counter, guarded together
#[derive(Debug, Default)]
struct RevelationLog {
    records: Vec<RevelationRecord>,
    cards_revealed: usize,
}

/// Reference dataset: a deduction game with a hidden solution
pub struct SecretGameDataset {
    name: String,
    setup: GameSetup,
    /// Cached copy of the disclosing holder's hand
    hand: BTreeSet<String>,
    policy: RwLock<RevealPolicy>,
    suggestions: Mutex<Vec<Suggestion>>,
    revelations: Mutex<RevelationLog>,
    total_queries: AtomicU64,
}

impl SecretGameDataset {
    /// Create a dataset from a validated setup
    pub fn new(setup: GameSetup) -> OracleResult<Self> {
        setup.validate()?;
        let hand = setup
            .hands
            .get(&setup.holder)
            .cloned()
            .ok_or_else(|| OracleError::invalid_config("holder has no hand"))?;

        tracing::info!(
            holder = %setup.holder,
            hand_size = hand.len(),
            holders = setup.hands.len(),
            "Secret game dataset ready"
        );

        Ok(Self {
            name: "secret_game".to_string(),
            setup,
            hand,
            policy: RwLock::new(RevealPolicy::default()),
            suggestions: Mutex::new(Vec::new()),
            revelations: Mutex::new(RevelationLog::default()),
            total_queries: AtomicU64::new(0),
        })
    }

    /// Set the policy used for direct (non-pipeline) validation
    pub fn with_reveal_policy(self, policy: RevealPolicy) -> Self {
        self.set_reveal_policy(policy);
        self
    }

    /// Set the dataset's own reveal policy
    pub fn set_reveal_policy(&self, policy: RevealPolicy) {
        *self.policy.write().unwrap_or_else(PoisonError::into_inner) = policy;
        tracing::info!(policy = %policy, "Reveal policy changed");
    }

    /// The dataset's own reveal policy
    pub fn reveal_policy(&self) -> RevealPolicy {
        *self.policy.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Name of the disclosing holder
    pub fn holder(&self) -> &str {
        &self.setup.holder
    }

    /// Public card lists
    pub fn cards_in(&self, category: Category) -> &[String] {
        self.setup.cards_in(category)
    }

    /// Resolve a card name to its category and canonical spelling
    pub fn find_card(&self, name: &str) -> Option<(Category, &str)> {
        self.setup.find_card(name)
    }

    // ========================================================================
    // Revelation logic
    // ========================================================================

    /// Cards from the suggestion that the holder owns, in slot order
    ///
    /// Pure: reveals nothing and records nothing.
    pub fn can_refute(&self, suggestion: &Suggestion) -> Vec<String> {
        suggestion
            .cards()
            .iter()
            .filter_map(|card| self.setup.find_card(card))
            .map(|(_, canonical)| canonical)
            .filter(|card| self.hand.contains(*card))
            .map(str::to_string)
            .collect()
    }

    /// Apply the dataset's policy to a set of refutable cards
    ///
    /// Pure: uses the current suggestion count but changes nothing.
    pub fn apply_revelation_strategy(
        &self,
        refutable: &[String],
        requesting_agent: &str,
    ) -> Vec<String> {
        let selected =
            apply_revelation_strategy(self.reveal_policy(), refutable, self.suggestion_count());
        tracing::trace!(
            agent = requesting_agent,
            refutable = refutable.len(),
            selected = selected.len(),
            "Revelation strategy applied"
        );
        selected
    }

    /// Check a suggestion under the dataset's own policy
    pub fn validate_suggestion(
        &self,
        suggestion: Suggestion,
        requesting_agent: &str,
    ) -> ValidationResult {
        self.total_queries.fetch_add(1, Ordering::SeqCst);
        self.validate_suggestion_under(suggestion, requesting_agent, self.reveal_policy())
    }

    /// Record the suggestion, then reveal what the policy allows
    pub(crate) fn validate_suggestion_under(
        &self,
        suggestion: Suggestion,
        requesting_agent: &str,
        policy: RevealPolicy,
    ) -> ValidationResult {
        let refutable = self.can_refute(&suggestion);
        let summary = suggestion.cards().join(" / ");

        let suggestion_count = {
            let mut history = self.suggestions.lock().unwrap_or_else(PoisonError::into_inner);
            history.push(suggestion);
            history.len()
        };

        if refutable.is_empty() {
            tracing::info!(
                agent = requesting_agent,
                suggestion = %summary,
                "Suggestion cannot be refuted"
            );
            return ValidationResult {
                can_refute: false,
                suggestion_valid: true,
                authorized: true,
                reason: format!("{} cannot refute this suggestion", self.holder()),
                revealed_items: Vec::new(),
            };
        }

        let selected = apply_revelation_strategy(policy, &refutable, suggestion_count);
        let mut revealed = Vec::with_capacity(selected.len());
        for card in selected {
            match self.reveal_card(
                &card,
                requesting_agent,
                &format!("refutes suggestion {}", summary),
                QueryType::SuggestionValidation,
            ) {
                Ok(record) => revealed.push(record.item_revealed),
                Err(e) => tracing::error!(
                    card = %card,
                    error = %e,
                    "Refutable card could not be revealed"
                ),
            }
        }

        tracing::info!(
            agent = requesting_agent,
            policy = %policy,
            refutable = refutable.len(),
            revealed = revealed.len(),
            "Suggestion refuted"
        );

        ValidationResult {
            can_refute: true,
            suggestion_valid: false,
            authorized: true,
            reason: format!(
                "{} can refute; revealed {} of {} card(s) under {} policy",
                self.holder(),
                revealed.len(),
                refutable.len(),
                policy
            ),
            revealed_items: revealed,
        }
    }

    /// Disclose one of the holder's cards to an agent
    ///
    /// The only path that appends to the revelation history. Fails if the
    /// holder does not own the card, so no fabricated revelation can be
    /// recorded.
    pub fn reveal_card(
        &self,
        item: &str,
        to_agent: &str,
        reason: &str,
        query_type: QueryType,
    ) -> OracleResult<RevelationRecord> {
        let Some(card) = self.hand.get(item) else {
            return Err(OracleError::CardNotHeld {
                card: item.to_string(),
                holder: self.holder().to_string(),
            });
        };

        let record = RevelationRecord {
            timestamp: Utc::now(),
            item_revealed: card.clone(),
            revealed_to: to_agent.to_string(),
            revealed_by: self.holder().to_string(),
            reason: reason.to_string(),
            query_type,
            metadata: Default::default(),
        };

        {
            let mut log = self.revelations.lock().unwrap_or_else(PoisonError::into_inner);
            log.records.push(record.clone());
            log.cards_revealed += 1;
        }

        tracing::info!(
            card = %record.item_revealed,
            to = to_agent,
            query_type = %query_type,
            "Card revealed"
        );
        Ok(record)
    }

    // ========================================================================
    // Integrity boundary
    // ========================================================================

    /// Always rejected: the solution never leaves the dataset
    pub fn solution(&self, requested_by: &str) -> Result<Solution, IntegrityViolation> {
        tracing::error!(requested_by, "Rejected direct access to the solution");
        Err(IntegrityViolation::new(ProtectedState::Solution, requested_by))
    }

    /// Always rejected: no holder's hand is readable as a whole
    pub fn holder_cards(
        &self,
        holder: &str,
        requested_by: &str,
    ) -> Result<BTreeSet<String>, IntegrityViolation> {
        tracing::error!(holder, requested_by, "Rejected direct access to a holder's cards");
        Err(IntegrityViolation::new(ProtectedState::HolderCards, requested_by))
    }

    // ========================================================================
    // History accessors
    // ========================================================================

    /// Copy of every revelation, oldest first
    pub fn revelation_history(&self) -> Vec<RevelationRecord> {
        self.revelations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .clone()
    }

    /// Revelations made to one agent
    pub fn revelations_for(&self, agent: &str) -> Vec<RevelationRecord> {
        self.revelations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .iter()
            .filter(|r| r.revealed_to == agent)
            .cloned()
            .collect()
    }

    /// Distinct cards an agent has been shown
    pub fn cards_revealed_to(&self, agent: &str) -> BTreeSet<String> {
        self.revelations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .iter()
            .filter(|r| r.revealed_to == agent)
            .map(|r| r.item_revealed.clone())
            .collect()
    }

    /// Counter of revealed cards (always equal to the history length)
    pub fn cards_revealed(&self) -> usize {
        self.revelations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cards_revealed
    }

    /// `(counter, history length)` read in one critical section
    pub fn revelation_counts(&self) -> (usize, usize) {
        let log = self.revelations.lock().unwrap_or_else(PoisonError::into_inner);
        (log.cards_revealed, log.records.len())
    }

    /// Copy of every suggestion, oldest first
    pub fn suggestion_history(&self) -> Vec<Suggestion> {
        self.suggestions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn suggestion_count(&self) -> usize {
        self.suggestions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn total_queries(&self) -> u64 {
        self.total_queries.load(Ordering::SeqCst)
    }
}

// Hand-written so the solution and hands never reach a log line
impl std::fmt::Debug for SecretGameDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretGameDataset")
            .field("name", &self.name)
            .field("holder", &self.setup.holder)
            .field("policy", &self.reveal_policy())
            .field("suggestions", &self.suggestion_count())
            .field("cards_revealed", &self.cards_revealed())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Dataset for SecretGameDataset {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process_query(&self, request: QueryRequest<'_>) -> anyhow::Result<QueryResult> {
        self.total_queries.fetch_add(1, Ordering::SeqCst);

        let result = match request.query_type {
            QueryType::SuggestionValidation => self.query_suggestion(&request),
            QueryType::CardInquiry => self.query_card_inquiry(&request),
            QueryType::RevelationRequest => self.query_revelation(&request),
            QueryType::ClueRequest => self.query_clue(&request),
            QueryType::ProgressiveHint => self.query_progressive_hint(&request),
            QueryType::GameState => self.query_game_state(&request),
            QueryType::LogicalValidation => self.query_logical_validation(&request),
            QueryType::ConstraintCheck => self.query_constraint_check(&request),
            QueryType::DatasetAccess => self.query_dataset_access(&request),
            QueryType::AdminCommand | QueryType::PermissionCheck => {
                queries::unsupported(request.query_type)
            }
        };

        Ok(result.with_metadata("dataset", Value::from(self.name.as_str())))
    }
}
