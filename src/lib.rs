pub mod core;
pub mod permissions;
pub mod cache;
pub mod dataset;
pub mod access;

// Setup
pub mod config;
pub mod logging;

pub use access::{AccessManager, AccessStats};
pub use config::OracleConfig;
pub use core::{ErrorCode, OracleError, OracleResponse, QueryParams, QueryType};
