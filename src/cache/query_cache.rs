//! Bounded, sliding-TTL query cache
//!
//! Entries expire when they have not been read for `ttl`. At capacity, a
//! `put` of a new key evicts exactly one entry: the least recently accessed.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::key::cache_key;
use crate::core::{QueryParams, QueryResult, QueryType};

/// Entries kept when no size is configured
pub const DEFAULT_MAX_SIZE: usize = 1000;

/// Time-to-live when none is configured
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// A cached dataset result
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    /// Agent the result was produced for
    pub agent_name: String,
    pub result: QueryResult,
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    /// Entries past their TTL that have not been evicted yet
    pub expired_entries: usize,
    pub limit: usize,
    pub ttl_secs: f64,
    /// `total_entries / limit`
    pub utilization: f64,
}

/// Entry map and access times, guarded together
#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    last_access: HashMap<String, Instant>,
}

impl CacheState {
    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.last_access.remove(key);
    }
}

/// Memoizes results keyed by `(agent, query_type, params)`
#[derive(Debug)]
pub struct QueryCache {
    state: Mutex<CacheState>,
    max_size: usize,
    ttl: Duration,
}

impl QueryCache {
    /// Create a cache with the given capacity and TTL
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            max_size,
            ttl,
        }
    }

    /// Look up a result
    ///
    /// An expired entry is removed and reported as a miss. A hit refreshes
    /// the entry's last-access time.
    pub fn get(
        &self,
        agent_name: &str,
        query_type: QueryType,
        params: &QueryParams,
    ) -> Option<QueryResult> {
        let key = cache_key(agent_name, query_type, params);
        let now = Instant::now();

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let last = *state.last_access.get(&key)?;

        if now.duration_since(last) > self.ttl {
            tracing::debug!(agent = agent_name, query_type = %query_type, "Cache entry expired");
            state.remove(&key);
            return None;
        }

        let result = state.entries.get(&key).map(|e| e.result.clone())?;
        state.last_access.insert(key, now);
        Some(result)
    }

    /// Store a result
    pub fn put(
        &self,
        agent_name: &str,
        query_type: QueryType,
        params: &QueryParams,
        result: QueryResult,
    ) {
        if self.max_size == 0 {
            return;
        }

        let key = cache_key(agent_name, query_type, params);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if !state.entries.contains_key(&key) && state.entries.len() >= self.max_size {
            let oldest = state
                .last_access
                .iter()
                .min_by_key(|(_, at)| **at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                tracing::debug!(key = %oldest, "Evicting least recently used cache entry");
                state.remove(&oldest);
            }
        }

        state.last_access.insert(key.clone(), Instant::now());
        state.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                agent_name: agent_name.to_string(),
                result,
            },
        );
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.entries.clear();
        state.last_access.clear();
        tracing::info!("Query cache cleared");
    }

    /// Drop every entry produced for one agent, returning how many were removed
    pub fn invalidate_agent(&self, agent_name: &str) -> usize {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let keys: Vec<String> = state
            .entries
            .values()
            .filter(|e| e.agent_name == agent_name)
            .map(|e| e.key.clone())
            .collect();
        for key in &keys {
            state.remove(key);
        }
        keys.len()
    }

    /// Check whether a live entry exists, without refreshing it
    pub fn contains(&self, agent_name: &str, query_type: QueryType, params: &QueryParams) -> bool {
        let key = cache_key(agent_name, query_type, params);
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.entries.contains_key(&key)
    }

    /// Statistics snapshot (does not evict anything)
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let expired = state
            .last_access
            .values()
            .filter(|at| now.duration_since(**at) > self.ttl)
            .count();
        let total = state.entries.len();

        CacheStats {
            total_entries: total,
            expired_entries: expired,
            limit: self.max_size,
            ttl_secs: self.ttl.as_secs_f64(),
            utilization: if self.max_size == 0 {
                0.0
            } else {
                total as f64 / self.max_size as f64
            },
        }
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Check if the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE, DEFAULT_TTL)
    }
}
