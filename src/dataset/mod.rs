//! Datasets answer authorized queries
//!
//! The access manager never inspects a dataset's internals. It hands over a
//! [`QueryRequest`] and gets a [`QueryResult`] back; everything behind that
//! call belongs to the dataset.
//!
//! - `Dataset` - the trait every backing store implements
//! - `SecretGameDataset` - a deduction game with a hidden solution
//! - `RevealPolicy` - how much of a truthful answer is disclosed

pub mod game;
pub mod policy;

use anyhow::Result;
use async_trait::async_trait;

use crate::core::{QueryParams, QueryResult, QueryType};

pub use game::{
    Category, GameSetup, RevelationRecord, SecretGameDataset, Solution, Suggestion,
    ValidationResult, DEFAULT_HOLDER,
};
pub use policy::{apply_revelation_strategy, progressive_stage, RevealPolicy};

/// One authorized query, as seen by a dataset
#[derive(Debug, Clone, Copy)]
pub struct QueryRequest<'a> {
    /// Agent the answer is for
    pub agent_name: &'a str,
    pub query_type: QueryType,
    pub params: &'a QueryParams,
    /// Policy from the agent's permission rule
    pub reveal_policy: RevealPolicy,
}

/// Trait for stores that can answer oracle queries
///
/// Implementations report ordinary failures as an unsuccessful
/// `QueryResult`. An `Err` means the dataset itself broke and is turned into
/// an `execution_error` response by the caller.
#[async_trait]
pub trait Dataset: Send + Sync {
    /// Name of this dataset
    fn name(&self) -> &str;

    /// Answer one authorized query
    async fn process_query(&self, request: QueryRequest<'_>) -> Result<QueryResult>;
}
