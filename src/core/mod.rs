//! Core types for the oracle
//!
//! This module provides the fundamental types used throughout the crate:
//! - `QueryType` / `QueryParams` / `QueryResult` - What agents ask and what datasets answer
//! - `OracleResponse` / `ErrorCode` - The public response contract
//! - `OracleError` / `IntegrityViolation` - Error types

pub mod error;
pub mod query;
pub mod response;

pub use error::{IntegrityViolation, OracleError, OracleResult, ProtectedState};
pub use query::{QueryParams, QueryResult, QueryType};
pub use response::{ErrorCode, OracleResponse};
