//! Query types and raw dataset results

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::OracleError;
use super::response::ErrorCode;

/// Parameters attached to a query
pub type QueryParams = serde_json::Map<String, Value>;

/// The kind of operation an agent is requesting
///
/// Closed set. Every permission rule references a subset of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    CardInquiry,
    SuggestionValidation,
    ClueRequest,
    LogicalValidation,
    ConstraintCheck,
    DatasetAccess,
    RevelationRequest,
    GameState,
    AdminCommand,
    PermissionCheck,
    ProgressiveHint,
}

impl QueryType {
    /// Every query type, in declaration order
    pub const ALL: [QueryType; 11] = [
        QueryType::CardInquiry,
        QueryType::SuggestionValidation,
        QueryType::ClueRequest,
        QueryType::LogicalValidation,
        QueryType::ConstraintCheck,
        QueryType::DatasetAccess,
        QueryType::RevelationRequest,
        QueryType::GameState,
        QueryType::AdminCommand,
        QueryType::PermissionCheck,
        QueryType::ProgressiveHint,
    ];

    /// Wire name of this query type
    pub fn as_str(self) -> &'static str {
        match self {
            QueryType::CardInquiry => "card_inquiry",
            QueryType::SuggestionValidation => "suggestion_validation",
            QueryType::ClueRequest => "clue_request",
            QueryType::LogicalValidation => "logical_validation",
            QueryType::ConstraintCheck => "constraint_check",
            QueryType::DatasetAccess => "dataset_access",
            QueryType::RevelationRequest => "revelation_request",
            QueryType::GameState => "game_state",
            QueryType::AdminCommand => "admin_command",
            QueryType::PermissionCheck => "permission_check",
            QueryType::ProgressiveHint => "progressive_hint",
        }
    }

    /// Whether the access manager answers this type itself instead of
    /// delegating to the dataset
    pub fn is_manager_scoped(self) -> bool {
        matches!(self, QueryType::AdminCommand | QueryType::PermissionCheck)
    }

    /// Whether results of this type may be served from the cache
    ///
    /// Only answers that neither read nor extend the suggestion and
    /// revelation history qualify. A card inquiry replays a disclosure that
    /// was already recorded for the same agent, since cache keys are per agent.
    pub fn is_cacheable(self) -> bool {
        match self {
            QueryType::CardInquiry | QueryType::ConstraintCheck => true,
            QueryType::SuggestionValidation
            | QueryType::ClueRequest
            | QueryType::LogicalValidation
            | QueryType::DatasetAccess
            | QueryType::RevelationRequest
            | QueryType::GameState
            | QueryType::ProgressiveHint
            | QueryType::AdminCommand
            | QueryType::PermissionCheck => false,
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = OracleError;

    /// Accepts the wire name (`card_inquiry`) or the variant name (`CardInquiry`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s.chars().filter(|c| *c != '_').collect();
        QueryType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().replace('_', "").eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| OracleError::UnknownQueryType(s.to_string()))
    }
}

/// Raw answer produced by a dataset (or by the manager for manager-scoped types)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Whether the query produced an answer
    pub success: bool,
    /// Answer payload
    pub data: Value,
    /// Human-readable summary
    pub message: String,
    /// Type of the query that produced this result
    pub query_type: QueryType,
    /// When the result was produced
    pub timestamp: DateTime<Utc>,
    /// Cards disclosed while producing this result
    #[serde(default)]
    pub revealed_information: Vec<String>,
    /// Machine-readable failure reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    /// Open-ended audit metadata
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl QueryResult {
    /// Create a successful result
    pub fn success(query_type: QueryType, data: Value, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
            query_type,
            timestamp: Utc::now(),
            revealed_information: Vec::new(),
            error_code: None,
            metadata: HashMap::new(),
        }
    }

    /// Create a failed result
    pub fn failure(query_type: QueryType, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            message: message.into(),
            query_type,
            timestamp: Utc::now(),
            revealed_information: Vec::new(),
            error_code: Some(code),
            metadata: HashMap::new(),
        }
    }

    /// Attach the cards disclosed by this result
    pub fn with_revealed(mut self, cards: Vec<String>) -> Self {
        self.revealed_information = cards;
        self
    }

    /// Attach a metadata value
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_type_parse() {
        assert_eq!(
            "card_inquiry".parse::<QueryType>().unwrap(),
            QueryType::CardInquiry
        );
        assert_eq!(
            "SuggestionValidation".parse::<QueryType>().unwrap(),
            QueryType::SuggestionValidation
        );
        assert!(matches!(
            "teleport".parse::<QueryType>(),
            Err(OracleError::UnknownQueryType(_))
        ));
    }

    #[test]
    fn test_query_type_serde_matches_display() {
        for query_type in QueryType::ALL {
            let json = serde_json::to_value(query_type).unwrap();
            assert_eq!(json, json!(query_type.to_string()));
        }
    }

    #[test]
    fn test_manager_scoped_types_are_not_cacheable() {
        assert!(!QueryType::AdminCommand.is_cacheable());
        assert!(!QueryType::PermissionCheck.is_cacheable());
        assert!(QueryType::CardInquiry.is_cacheable());
        assert!(!QueryType::GameState.is_manager_scoped());
    }

    #[test]
    fn test_history_dependent_types_are_not_cacheable() {
        let cacheable: Vec<QueryType> = QueryType::ALL
            .into_iter()
            .filter(|t| t.is_cacheable())
            .collect();
        assert_eq!(
            cacheable,
            vec![QueryType::CardInquiry, QueryType::ConstraintCheck]
        );
        for query_type in [
            QueryType::RevelationRequest,
            QueryType::ProgressiveHint,
            QueryType::ClueRequest,
            QueryType::GameState,
            QueryType::SuggestionValidation,
        ] {
            assert!(!query_type.is_cacheable(), "{}", query_type);
        }
    }

    #[test]
    fn test_result_constructors() {
        let ok = QueryResult::success(QueryType::GameState, json!({"turn": 1}), "ok")
            .with_revealed(vec!["Rope".into()])
            .with_metadata("source", "test");
        assert!(ok.success);
        assert!(ok.error_code.is_none());
        assert_eq!(ok.revealed_information, vec!["Rope".to_string()]);
        assert_eq!(ok.metadata.get("source"), Some(&json!("test")));

        let failed = QueryResult::failure(QueryType::CardInquiry, ErrorCode::QueryFailed, "no");
        assert!(!failed.success);
        assert_eq!(failed.data, Value::Null);
        assert_eq!(failed.error_code, Some(ErrorCode::QueryFailed));
    }
}
