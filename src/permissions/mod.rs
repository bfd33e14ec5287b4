//! Permission system for oracle queries
//!
//! Each agent has exactly one `PermissionRule` naming the query types it may
//! issue, its daily quota, the fields redacted from its results, and its
//! reveal policy. The `PermissionManager` answers authorization checks and
//! keeps the access log that quota accounting is derived from.
//!
//! ## Example
//!
//! ```rust,ignore
//! use deduction_oracle::core::QueryType;
//! use deduction_oracle::permissions::{PermissionManager, PermissionRule};
//!
//! let manager = PermissionManager::new();
//! manager.add_rule(
//!     PermissionRule::new("Watson")
//!         .allow(QueryType::CardInquiry)
//!         .with_max_daily_queries(2),
//! );
//!
//! if manager.is_authorized("Watson", QueryType::CardInquiry) {
//!     // do the work, then consume quota only on success
//!     manager.log_access("Watson", QueryType::CardInquiry, true, "answered");
//! }
//! ```

mod manager;
mod rule;

pub use manager::{AccessLogEntry, AuthorizationDecision, PermissionManager, QueryStats};
pub use rule::{PermissionRule, DEFAULT_MAX_DAILY_QUERIES};
