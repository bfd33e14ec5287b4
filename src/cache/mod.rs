//! Query result cache
//!
//! - `QueryCache` - bounded map with sliding TTL and single-entry LRU eviction
//! - `cache_key` - order-independent digest of `(agent, query_type, params)`
//!
//! The cache has no opinion on success or failure. The access manager only
//! stores successful, already-redacted results.

mod key;
mod query_cache;

pub use key::{cache_key, canonicalize};
pub use query_cache::{CacheEntry, CacheStats, QueryCache, DEFAULT_MAX_SIZE, DEFAULT_TTL};
