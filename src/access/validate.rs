//! Per-type parameter validation
//!
//! Runs before a query reaches the dataset. Only shape is checked here;
//! whether a card exists in the game is the dataset's call.

use std::str::FromStr;

use serde_json::Value;

use crate::core::{OracleError, QueryParams, QueryType};

/// Administrative operations answered by the access manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    /// Clear every agent's quota counter
    ResetDailyCounts,
    /// Drop every cached result
    ClearCache,
    /// Report pipeline counters
    AccessStats,
}

impl AdminCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            AdminCommand::ResetDailyCounts => "reset_daily_counts",
            AdminCommand::ClearCache => "clear_cache",
            AdminCommand::AccessStats => "access_stats",
        }
    }
}

impl FromStr for AdminCommand {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "reset_daily_counts" => Ok(AdminCommand::ResetDailyCounts),
            "clear_cache" => Ok(AdminCommand::ClearCache),
            "access_stats" => Ok(AdminCommand::AccessStats),
            other => Err(OracleError::other(format!("unknown admin command '{}'", other))),
        }
    }
}

fn required_str(params: &QueryParams, key: &str) -> Result<(), String> {
    match params.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(()),
        Some(Value::String(_)) => Err(format!("'{}' must not be empty", key)),
        Some(_) => Err(format!("'{}' must be a string", key)),
        None => Err(format!("missing required parameter '{}'", key)),
    }
}

fn optional_str(params: &QueryParams, key: &str) -> Result<(), String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(()),
        Some(_) => required_str(params, key),
    }
}

/// Check that `params` has the shape `query_type` needs
///
/// Returns a human-readable reason on failure.
pub fn validate_params(query_type: QueryType, params: &QueryParams) -> Result<(), String> {
    match query_type {
        QueryType::SuggestionValidation => {
            for key in ["suspect", "weapon", "room"] {
                required_str(params, key)?;
            }
            Ok(())
        }
        QueryType::CardInquiry => required_str(params, "card"),
        QueryType::ConstraintCheck => {
            required_str(params, "card")?;
            optional_str(params, "category")
        }
        QueryType::RevelationRequest => optional_str(params, "card"),
        QueryType::LogicalValidation => match params.get("eliminated") {
            Some(Value::Array(items)) if items.iter().all(Value::is_string) => Ok(()),
            Some(_) => Err("'eliminated' must be a list of card names".to_string()),
            None => Err("missing required parameter 'eliminated'".to_string()),
        },
        QueryType::AdminCommand => {
            required_str(params, "command")?;
            let command = params.get("command").and_then(Value::as_str).unwrap_or_default();
            command
                .parse::<AdminCommand>()
                .map(|_| ())
                .map_err(|e| e.to_string())
        }
        QueryType::ClueRequest
        | QueryType::ProgressiveHint
        | QueryType::GameState
        | QueryType::DatasetAccess
        | QueryType::PermissionCheck => Ok(()),
    }
}
