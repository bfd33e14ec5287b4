//! Permission manager implementation
//!
//! Holds the per-agent rules and the quota ledger:
//! - Rules: one per agent, upserted by name (RwLock, read on every query)
//! - Ledger: append-only access log plus daily counters (Mutex, one
//!   critical section per append)
//!
//! Authorization never fails with an error. A missing rule is an implicit deny.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rule::PermissionRule;
use crate::core::{ErrorCode, QueryType};
use crate::dataset::RevealPolicy;

/// Outcome of an authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationDecision {
    /// The agent may issue the query
    Allowed,
    /// No rule exists for the agent
    NoRule,
    /// The rule does not include the query type
    QueryTypeNotAllowed,
    /// The agent has used its whole quota for the period
    QuotaExceeded { used: u32, limit: u32 },
}

impl AuthorizationDecision {
    /// Check if the query may proceed
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthorizationDecision::Allowed)
    }

    /// Error code reported to the caller on denial
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            AuthorizationDecision::Allowed => None,
            AuthorizationDecision::NoRule => Some(ErrorCode::NoRule),
            AuthorizationDecision::QueryTypeNotAllowed => Some(ErrorCode::QueryTypeNotAllowed),
            AuthorizationDecision::QuotaExceeded { .. } => Some(ErrorCode::QuotaExceeded),
        }
    }
}

impl std::fmt::Display for AuthorizationDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthorizationDecision::Allowed => write!(f, "Allowed"),
            AuthorizationDecision::NoRule => write!(f, "No permission rule for agent"),
            AuthorizationDecision::QueryTypeNotAllowed => {
                write!(f, "Query type not allowed for agent")
            }
            AuthorizationDecision::QuotaExceeded { used, limit } => {
                write!(f, "Daily query limit reached ({}/{})", used, limit)
            }
        }
    }
}

/// One audited access attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub timestamp: DateTime<Utc>,
    pub agent_name: String,
    pub query_type: QueryType,
    pub success: bool,
    pub details: String,
    /// Pipeline execution time, when measured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
}

impl AccessLogEntry {
    /// Create a log entry stamped with the current time
    pub fn new(
        agent_name: impl Into<String>,
        query_type: QueryType,
        success: bool,
        details: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            agent_name: agent_name.into(),
            query_type,
            success,
            details: details.into(),
            duration_ms: None,
        }
    }

    /// Attach the measured execution time
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// Usage summary for one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryStats {
    pub daily_used: u32,
    pub daily_limit: u32,
    /// All logged attempts, successful or not
    pub total_queries: usize,
    /// Fraction of logged attempts that succeeded
    pub success_rate: f64,
    pub allowed_types: BTreeSet<QueryType>,
    pub reveal_policy: RevealPolicy,
}

/// Access log and quota counters, guarded together
#[derive(Debug, Default)]
struct AccessLedger {
    entries: Vec<AccessLogEntry>,
    daily_counts: HashMap<String, u32>,
}

/// Single source of truth for "may agent A run query type Q right now"
#[derive(Debug, Default)]
pub struct PermissionManager {
    rules: RwLock<HashMap<String, PermissionRule>>,
    ledger: Mutex<AccessLedger>,
}

impl PermissionManager {
    /// Create a manager with no rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with initial rules
    pub fn with_rules(rules: impl IntoIterator<Item = PermissionRule>) -> Self {
        let manager = Self::new();
        for rule in rules {
            manager.add_rule(rule);
        }
        manager
    }

    /// Upsert a rule by agent name
    ///
    /// Returns false (and stores nothing) when the agent name is empty.
    pub fn add_rule(&self, rule: PermissionRule) -> bool {
        if rule.agent_name.trim().is_empty() {
            tracing::warn!("Ignoring permission rule with empty agent name");
            return false;
        }

        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(
            agent = %rule.agent_name,
            allowed = rule.allowed_query_types.len(),
            max_daily = rule.max_daily_queries,
            policy = %rule.reveal_policy,
            "Adding permission rule"
        );
        rules.insert(rule.agent_name.clone(), rule);
        true
    }

    /// Get a copy of an agent's rule
    pub fn rule(&self, agent_name: &str) -> Option<PermissionRule> {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(agent_name)
            .cloned()
    }

    /// Names of all agents with a rule, sorted
    pub fn agents(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Check an agent's permission for a query type without mutating anything
    ///
    /// Checks in order: rule exists → type allowed → quota remaining.
    pub fn check(&self, agent_name: &str, query_type: QueryType) -> AuthorizationDecision {
        let limit = {
            let rules = self.rules.read().unwrap_or_else(PoisonError::into_inner);
            let Some(rule) = rules.get(agent_name) else {
                return AuthorizationDecision::NoRule;
            };
            if !rule.allows(query_type) {
                return AuthorizationDecision::QueryTypeNotAllowed;
            }
            rule.max_daily_queries
        };

        let used = self.daily_used(agent_name);
        if used >= limit {
            return AuthorizationDecision::QuotaExceeded { used, limit };
        }

        AuthorizationDecision::Allowed
    }

    /// Boolean form of [`check`](Self::check)
    pub fn is_authorized(&self, agent_name: &str, query_type: QueryType) -> bool {
        self.check(agent_name, query_type).is_allowed()
    }

    /// Append an access log entry
    ///
    /// Only successful entries count against the agent's quota.
    pub fn log_access(
        &self,
        agent_name: &str,
        query_type: QueryType,
        success: bool,
        details: impl Into<String>,
    ) {
        self.record(AccessLogEntry::new(agent_name, query_type, success, details));
    }

    /// Append a pre-built entry (counter and log updated in one critical section)
    pub fn record(&self, entry: AccessLogEntry) {
        tracing::debug!(
            agent = %entry.agent_name,
            query_type = %entry.query_type,
            success = entry.success,
            details = %entry.details,
            "Access logged"
        );

        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        if entry.success {
            *ledger
                .daily_counts
                .entry(entry.agent_name.clone())
                .or_insert(0) += 1;
        }
        ledger.entries.push(entry);
    }

    /// Successful queries the agent has made this period
    pub fn daily_used(&self, agent_name: &str) -> u32 {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .daily_counts
            .get(agent_name)
            .copied()
            .unwrap_or(0)
    }

    /// Clear all quota counters (the log is kept)
    pub fn reset_daily_counts(&self) {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .daily_counts
            .clear();
        tracing::info!("Daily query counts reset");
    }

    /// Usage summary for an agent, or None if it has no rule
    pub fn get_query_stats(&self, agent_name: &str) -> Option<QueryStats> {
        let rule = self.rule(agent_name)?;

        let ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        let (total, successful) = ledger
            .entries
            .iter()
            .filter(|e| e.agent_name == agent_name)
            .fold((0usize, 0usize), |(total, ok), e| {
                (total + 1, ok + usize::from(e.success))
            });
        let daily_used = ledger.daily_counts.get(agent_name).copied().unwrap_or(0);

        Some(QueryStats {
            daily_used,
            daily_limit: rule.max_daily_queries,
            total_queries: total,
            success_rate: if total == 0 {
                0.0
            } else {
                successful as f64 / total as f64
            },
            allowed_types: rule.allowed_query_types,
            reveal_policy: rule.reveal_policy,
        })
    }

    /// Copy of the whole access log
    pub fn access_log(&self) -> Vec<AccessLogEntry> {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clone()
    }

    /// The most recent `limit` entries for an agent, oldest first
    pub fn recent_log(&self, agent_name: &str, limit: usize) -> Vec<AccessLogEntry> {
        let ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        let mut recent: Vec<AccessLogEntry> = ledger
            .entries
            .iter()
            .rev()
            .filter(|e| e.agent_name == agent_name)
            .take(limit)
            .cloned()
            .collect();
        recent.reverse();
        recent
    }

    /// Number of log entries
    pub fn log_len(&self) -> usize {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }
}
