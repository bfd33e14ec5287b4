//! Public response contract

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::query::{QueryResult, QueryType};

/// Machine-readable failure reason carried by failed responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// No permission rule exists for the agent
    NoRule,
    /// The agent's rule does not allow this query type
    QueryTypeNotAllowed,
    /// The agent has used up its daily quota
    QuotaExceeded,
    /// Missing or malformed parameters
    InvalidParams,
    /// The dataset failed, panicked, or timed out
    ExecutionError,
    /// The dataset understood the query but could not answer it
    QueryFailed,
}

impl ErrorCode {
    /// Wire name of this code
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NoRule => "no_rule",
            ErrorCode::QueryTypeNotAllowed => "query_type_not_allowed",
            ErrorCode::QuotaExceeded => "quota_exceeded",
            ErrorCode::InvalidParams => "invalid_params",
            ErrorCode::ExecutionError => "execution_error",
            ErrorCode::QueryFailed => "query_failed",
        }
    }

    /// Whether this code reports a permission denial
    pub fn is_permission_denial(self) -> bool {
        matches!(
            self,
            ErrorCode::NoRule | ErrorCode::QueryTypeNotAllowed | ErrorCode::QuotaExceeded
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only structure external collaborators should parse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleResponse {
    /// Whether the query was authorized and answered
    pub authorized: bool,
    /// Answer payload, already redacted for the agent
    pub data: Value,
    /// Human-readable summary
    pub message: String,
    pub query_type: QueryType,
    /// Cards disclosed to the agent by this response
    pub revealed_information: Vec<String>,
    pub agent_name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

impl OracleResponse {
    /// Wrap a dataset result for an agent
    pub fn from_result(agent_name: impl Into<String>, result: QueryResult) -> Self {
        let mut metadata = result.metadata;
        if let Some(code) = result.error_code {
            metadata.insert("error_type".to_string(), Value::from(code.as_str()));
        }
        Self {
            authorized: result.success,
            data: result.data,
            message: result.message,
            query_type: result.query_type,
            revealed_information: result.revealed_information,
            agent_name: agent_name.into(),
            timestamp: result.timestamp,
            metadata,
            error_code: result.error_code,
        }
    }

    /// Build a failed response without a dataset result
    pub fn denied(
        agent_name: impl Into<String>,
        query_type: QueryType,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self::from_result(agent_name, QueryResult::failure(query_type, code, message))
    }

    /// Legacy accessor, equivalent to `authorized`
    pub fn success(&self) -> bool {
        self.authorized
    }

    /// Error type as a string, if the response failed
    pub fn error_type(&self) -> Option<&'static str> {
        self.error_code.map(ErrorCode::as_str)
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
    fn test_from_successful_result() {
        let result = QueryResult::success(QueryType::CardInquiry, json!({"held": true}), "held")
            .with_revealed(vec!["Rope".into()]);
        let response = OracleResponse::from_result("Watson", result);

        assert!(response.authorized);
        assert!(response.success());
        assert_eq!(response.agent_name, "Watson");
        assert_eq!(response.revealed_information, vec!["Rope".to_string()]);
        assert!(response.error_type().is_none());
        assert!(!response.metadata.contains_key("error_type"));
    }

    #[test]
    fn test_denied_carries_error_type() {
        let response = OracleResponse::denied(
            "Watson",
            QueryType::AdminCommand,
            ErrorCode::QueryTypeNotAllowed,
            "not allowed",
        );

        assert!(!response.authorized);
        assert_eq!(response.error_type(), Some("query_type_not_allowed"));
        assert_eq!(
            response.metadata.get("error_type"),
            Some(&json!("query_type_not_allowed"))
        );
    }

    #[test]
    fn test_error_code_classification() {
        assert!(ErrorCode::QuotaExceeded.is_permission_denial());
        assert!(ErrorCode::NoRule.is_permission_denial());
        assert!(!ErrorCode::InvalidParams.is_permission_denial());
        assert!(!ErrorCode::ExecutionError.is_permission_denial());
    }

    #[test]
    fn test_response_serialization_skips_empty_error_code() {
        let result = QueryResult::success(QueryType::GameState, json!({}), "ok");
        let json = serde_json::to_string(&OracleResponse::from_result("Holmes", result)).unwrap();
        assert!(!json.contains("error_code"));
        assert!(json.contains("\"query_type\":\"game_state\""));
    }
}
