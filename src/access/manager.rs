//! Access manager: the single entry point for oracle queries
//!
//! Every call runs the same ordered pipeline and leaves exactly one access
//! log entry behind:
//!
//! 1. authorization (denials consume no quota and never touch the cache)
//! 2. cache lookup
//! 3. parameter validation
//! 4. execution, by the manager for admin/permission queries and by the
//!    dataset for everything else
//! 5. redaction of the agent's forbidden fields
//! 6. caching of successful, redacted results
//! 7. final logging with the measured duration
//!
//! Nothing inside the pipeline escapes as an error or a panic. Dataset
//! failures come back as `execution_error` responses.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use super::redact::redact_fields;
use super::validate::{validate_params, AdminCommand};
use crate::cache::{CacheStats, QueryCache};
use crate::core::{ErrorCode, OracleResponse, QueryParams, QueryResult, QueryType};
use crate::dataset::{Dataset, QueryRequest};
use crate::permissions::{AccessLogEntry, PermissionManager, PermissionRule};

/// Pipeline counters, reported by [`AccessManager::stats`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessStats {
    pub total_queries: u64,
    pub successful: u64,
    pub denied: u64,
    pub invalid_params: u64,
    pub execution_errors: u64,
    /// Authorized queries the dataset could not answer
    pub failed: u64,
    pub cache_hits: u64,
    pub cache: CacheStats,
}

#[derive(Debug, Default)]
struct Counters {
    total: AtomicU64,
    successful: AtomicU64,
    denied: AtomicU64,
    invalid_params: AtomicU64,
    execution_errors: AtomicU64,
    failed: AtomicU64,
    cache_hits: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn count_outcome(&self, result: &QueryResult) {
        let counter = match (result.success, result.error_code) {
            (true, _) => &self.successful,
            (false, Some(code)) if code.is_permission_denial() => &self.denied,
            (false, Some(ErrorCode::InvalidParams)) => &self.invalid_params,
            (false, Some(ErrorCode::ExecutionError)) => &self.execution_errors,
            (false, _) => &self.failed,
        };
        Self::bump(counter);
    }
}

/// Orchestrates permissions, cache, and dataset for every query
pub struct AccessManager {
    permissions: PermissionManager,
    cache: QueryCache,
    dataset: Arc<dyn Dataset>,
    query_timeout: Option<Duration>,
    counters: Counters,
}

impl AccessManager {
    /// Create a manager over a dataset
    pub fn new(
        permissions: PermissionManager,
        cache: QueryCache,
        dataset: Arc<dyn Dataset>,
    ) -> Self {
        tracing::info!(
            dataset = dataset.name(),
            agents = permissions.agents().len(),
            cache_size = cache.max_size(),
            cache_ttl_secs = cache.ttl().as_secs(),
            "Access manager created"
        );
        Self {
            permissions,
            cache,
            dataset,
            query_timeout: None,
            counters: Counters::default(),
        }
    }

    /// Bound every dataset call by a deadline
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Permission manager, for configuration-time setup
    pub fn permissions(&self) -> &PermissionManager {
        &self.permissions
    }

    /// Result cache, for configuration-time setup
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Snapshot of the pipeline counters
    pub fn stats(&self) -> AccessStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        AccessStats {
            total_queries: load(&self.counters.total),
            successful: load(&self.counters.successful),
            denied: load(&self.counters.denied),
            invalid_params: load(&self.counters.invalid_params),
            execution_errors: load(&self.counters.execution_errors),
            failed: load(&self.counters.failed),
            cache_hits: load(&self.counters.cache_hits),
            cache: self.cache.stats(),
        }
    }

    /// Run one query through the pipeline
    ///
    /// Always returns a response; the request id is echoed in
    /// `metadata["request_id"]`.
    pub async fn execute_query(
        &self,
        agent_name: &str,
        query_type: QueryType,
        params: &QueryParams,
    ) -> OracleResponse {
        let request_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "execute_query",
            request_id = %request_id,
            agent = agent_name,
            query_type = %query_type
        );

        Counters::bump(&self.counters.total);
        self.run_pipeline(agent_name, query_type, params)
            .instrument(span)
            .await
            .with_metadata("request_id", request_id)
    }

    async fn run_pipeline(
        &self,
        agent_name: &str,
        query_type: QueryType,
        params: &QueryParams,
    ) -> OracleResponse {
        let started = Instant::now();

        // 1. Authorization
        let decision = self.permissions.check(agent_name, query_type);
        if let Some(code) = decision.error_code() {
            return self.deny(agent_name, query_type, code, decision.to_string());
        }
        let Some(rule) = self.permissions.rule(agent_name) else {
            return self.deny(
                agent_name,
                query_type,
                ErrorCode::NoRule,
                "No permission rule for agent",
            );
        };

        // 2. Cache
        if query_type.is_cacheable() {
            if let Some(cached) = self.cache.get(agent_name, query_type, params) {
                Counters::bump(&self.counters.cache_hits);
                Counters::bump(&self.counters.successful);
                self.permissions.record(
                    AccessLogEntry::new(agent_name, query_type, true, "from cache")
                        .with_duration_ms(elapsed_ms(started)),
                );
                tracing::debug!("Served from cache");
                return OracleResponse::from_result(agent_name, cached)
                    .with_metadata("cached", true);
            }
        }

        // 3. Validation
        if let Err(reason) = validate_params(query_type, params) {
            Counters::bump(&self.counters.invalid_params);
            let message = format!("invalid params: {}", reason);
            self.permissions.record(
                AccessLogEntry::new(agent_name, query_type, false, message)
                    .with_duration_ms(elapsed_ms(started)),
            );
            tracing::warn!(
                error_code = %ErrorCode::InvalidParams,
                reason = %reason,
                "Query rejected"
            );
            return OracleResponse::denied(agent_name, query_type, ErrorCode::InvalidParams, reason);
        }

        // 4. Execution
        let mut result = if query_type.is_manager_scoped() {
            self.answer_locally(agent_name, query_type, params)
        } else {
            self.delegate(agent_name, query_type, params, &rule).await
        };
        if !result.success && result.error_code.is_none() {
            result.error_code = Some(ErrorCode::QueryFailed);
        }

        // 5. Redaction
        redact_fields(&mut result.data, &rule.forbidden_fields);

        // 6. Caching
        if result.success && query_type.is_cacheable() {
            self.cache.put(agent_name, query_type, params, result.clone());
        }

        // 7. Logging
        let duration_ms = elapsed_ms(started);
        self.counters.count_outcome(&result);
        self.permissions.record(
            AccessLogEntry::new(agent_name, query_type, result.success, result.message.clone())
                .with_duration_ms(duration_ms),
        );

        match result.error_code {
            None => tracing::info!(
                revealed = result.revealed_information.len(),
                duration_ms,
                "Query answered"
            ),
            Some(ErrorCode::ExecutionError) => tracing::error!(
                error_code = %ErrorCode::ExecutionError,
                message = %result.message,
                duration_ms,
                "Query execution failed"
            ),
            Some(code) => tracing::info!(
                error_code = %code,
                message = %result.message,
                duration_ms,
                "Query not answered"
            ),
        }

        OracleResponse::from_result(agent_name, result)
    }

    fn deny(
        &self,
        agent_name: &str,
        query_type: QueryType,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> OracleResponse {
        let message = message.into();
        Counters::bump(&self.counters.denied);
        self.permissions
            .log_access(agent_name, query_type, false, format!("denied: {}", message));
        tracing::warn!(error_code = %code, reason = %message, "Query denied");
        OracleResponse::denied(agent_name, query_type, code, message)
    }

    /// Hand the query to the dataset, turning errors, panics, and timeouts
    /// into `execution_error` results
    async fn delegate(
        &self,
        agent_name: &str,
        query_type: QueryType,
        params: &QueryParams,
        rule: &PermissionRule,
    ) -> QueryResult {
        let request = QueryRequest {
            agent_name,
            query_type,
            params,
            reveal_policy: rule.reveal_policy,
        };
        let call = AssertUnwindSafe(self.dataset.process_query(request)).catch_unwind();

        let outcome = match self.query_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return QueryResult::failure(
                        query_type,
                        ErrorCode::ExecutionError,
                        format!("Dataset did not answer within {}ms", limit.as_millis()),
                    )
                }
            },
            None => call.await,
        };

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => QueryResult::failure(
                query_type,
                ErrorCode::ExecutionError,
                format!("Dataset error: {:#}", e),
            ),
            Err(panic) => QueryResult::failure(
                query_type,
                ErrorCode::ExecutionError,
                format!("Dataset panicked: {}", panic_message(panic.as_ref())),
            ),
        }
    }

    /// Answer the query types that concern the broker itself
    fn answer_locally(
        &self,
        agent_name: &str,
        query_type: QueryType,
        params: &QueryParams,
    ) -> QueryResult {
        match query_type {
            QueryType::PermissionCheck => match self.permissions.get_query_stats(agent_name) {
                Some(stats) => to_result(query_type, &stats, "Your permissions and usage"),
                None => QueryResult::failure(
                    query_type,
                    ErrorCode::NoRule,
                    "No permission rule for agent",
                ),
            },
            QueryType::AdminCommand => {
                let command = params
                    .get("command")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .parse::<AdminCommand>();
                match command {
                    Ok(command) => self.run_admin(agent_name, command),
                    Err(e) => {
                        QueryResult::failure(query_type, ErrorCode::InvalidParams, e.to_string())
                    }
                }
            }
            other => QueryResult::failure(
                other,
                ErrorCode::QueryFailed,
                format!("{} is answered by the dataset", other),
            ),
        }
    }

    fn run_admin(&self, agent_name: &str, command: AdminCommand) -> QueryResult {
        let qt = QueryType::AdminCommand;
        tracing::info!(command = command.as_str(), by = agent_name, "Admin command");
        match command {
            AdminCommand::ResetDailyCounts => {
                self.permissions.reset_daily_counts();
                QueryResult::success(
                    qt,
                    serde_json::json!({ "command": command.as_str() }),
                    "Daily query counts reset",
                )
            }
            AdminCommand::ClearCache => {
                let cleared = self.cache.len();
                self.cache.clear();
                QueryResult::success(
                    qt,
                    serde_json::json!({ "command": command.as_str(), "cleared": cleared }),
                    format!("Cleared {} cached result(s)", cleared),
                )
            }
            AdminCommand::AccessStats => to_result(qt, &self.stats(), "Access statistics"),
        }
    }
}

impl std::fmt::Debug for AccessManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessManager")
            .field("dataset", &self.dataset.name())
            .field("agents", &self.permissions.agents())
            .field("query_timeout", &self.query_timeout)
            .finish_non_exhaustive()
    }
}

fn to_result<T: Serialize>(query_type: QueryType, value: &T, message: &str) -> QueryResult {
    match serde_json::to_value(value) {
        Ok(data) => QueryResult::success(query_type, data, message),
        Err(e) => QueryResult::failure(query_type, ErrorCode::ExecutionError, e.to_string()),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
