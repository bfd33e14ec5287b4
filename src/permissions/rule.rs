//! Permission rules
//!
//! One rule per agent. Rules are built once at configuration time and read
//! on every query.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::QueryType;
use crate::dataset::RevealPolicy;

/// Daily quota applied when a rule does not set one
pub const DEFAULT_MAX_DAILY_QUERIES: u32 = 100;

/// Authorization rule for a single agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    /// Agent this rule applies to
    pub agent_name: String,
    /// Query types the agent may issue
    #[serde(default)]
    pub allowed_query_types: BTreeSet<QueryType>,
    /// Successful queries allowed per period
    #[serde(default = "default_max_daily_queries")]
    pub max_daily_queries: u32,
    /// Keys stripped from every result returned to this agent
    #[serde(default)]
    pub forbidden_fields: Vec<String>,
    /// How much of a truthful answer this agent gets
    #[serde(default)]
    pub reveal_policy: RevealPolicy,
}

fn default_max_daily_queries() -> u32 {
    DEFAULT_MAX_DAILY_QUERIES
}

impl PermissionRule {
    /// Create a rule with no allowed query types and default limits
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            allowed_query_types: BTreeSet::new(),
            max_daily_queries: DEFAULT_MAX_DAILY_QUERIES,
            forbidden_fields: Vec::new(),
            reveal_policy: RevealPolicy::default(),
        }
    }

    /// Allow a query type
    pub fn allow(mut self, query_type: QueryType) -> Self {
        self.allowed_query_types.insert(query_type);
        self
    }

    /// Allow several query types
    pub fn allow_all(mut self, query_types: impl IntoIterator<Item = QueryType>) -> Self {
        self.allowed_query_types.extend(query_types);
        self
    }

    /// Set the daily quota
    pub fn with_max_daily_queries(mut self, max: u32) -> Self {
        self.max_daily_queries = max;
        self
    }

    /// Add a field that must be redacted from this agent's results
    pub fn forbid_field(mut self, field: impl Into<String>) -> Self {
        self.forbidden_fields.push(field.into());
        self
    }

    /// Set the reveal policy
    pub fn with_reveal_policy(mut self, policy: RevealPolicy) -> Self {
        self.reveal_policy = policy;
        self
    }

    /// Check whether the rule allows a query type
    pub fn allows(&self, query_type: QueryType) -> bool {
        self.allowed_query_types.contains(&query_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_defaults() {
        let rule = PermissionRule::new("Watson");

        assert_eq!(rule.agent_name, "Watson");
        assert!(rule.allowed_query_types.is_empty());
        assert_eq!(rule.max_daily_queries, DEFAULT_MAX_DAILY_QUERIES);
        assert!(rule.forbidden_fields.is_empty());
        assert_eq!(rule.reveal_policy, RevealPolicy::Balanced);
    }

    #[test]
    fn test_rule_builder() {
        let rule = PermissionRule::new("Holmes")
            .allow(QueryType::CardInquiry)
            .allow_all([QueryType::GameState, QueryType::ClueRequest])
            .with_max_daily_queries(5)
            .forbid_field("holder")
            .with_reveal_policy(RevealPolicy::Competitive);

        assert!(rule.allows(QueryType::CardInquiry));
        assert!(rule.allows(QueryType::ClueRequest));
        assert!(!rule.allows(QueryType::AdminCommand));
        assert_eq!(rule.max_daily_queries, 5);
        assert_eq!(rule.forbidden_fields, vec!["holder".to_string()]);
        assert_eq!(rule.reveal_policy, RevealPolicy::Competitive);
    }

    #[test]
    fn test_rule_from_json_applies_defaults() {
        let rule: PermissionRule = serde_json::from_str(
            r#"{"agent_name": "Watson", "allowed_query_types": ["card_inquiry"]}"#,
        )
        .unwrap();

        assert!(rule.allows(QueryType::CardInquiry));
        assert_eq!(rule.max_daily_queries, DEFAULT_MAX_DAILY_QUERIES);
        assert!(rule.forbidden_fields.is_empty());
        assert_eq!(rule.reveal_policy, RevealPolicy::Balanced);
    }
}
