//! Oracle configuration
//!
//! Loaded from a JSON file or built in code. Everything except the rule
//! list has a default.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::access::AccessManager;
use crate::cache::{QueryCache, DEFAULT_MAX_SIZE, DEFAULT_TTL};
use crate::core::{OracleError, OracleResult, QueryType};
use crate::dataset::game::{CLASSIC_ROOMS, CLASSIC_SUSPECTS, CLASSIC_WEAPONS};
use crate::dataset::{GameSetup, RevealPolicy, SecretGameDataset, Solution, DEFAULT_HOLDER};
use crate::permissions::{PermissionManager, PermissionRule};

/// Query cache sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_size")]
    pub max_size: usize,
    /// Sliding time-to-live in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_size() -> usize {
    DEFAULT_MAX_SIZE
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL.as_secs()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: default_cache_size(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Cards, solution, and holders of the game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "classic_suspects")]
    pub suspects: Vec<String>,
    #[serde(default = "classic_weapons")]
    pub weapons: Vec<String>,
    #[serde(default = "classic_rooms")]
    pub rooms: Vec<String>,
    /// Drawn at random when absent
    #[serde(default)]
    pub solution: Option<Solution>,
    /// The holder whose cards may be disclosed
    #[serde(default = "default_holder")]
    pub holder: String,
    #[serde(default)]
    pub other_holders: Vec<String>,
}

fn classic_suspects() -> Vec<String> {
    CLASSIC_SUSPECTS.iter().map(|s| s.to_string()).collect()
}

fn classic_weapons() -> Vec<String> {
    CLASSIC_WEAPONS.iter().map(|s| s.to_string()).collect()
}

fn classic_rooms() -> Vec<String> {
    CLASSIC_ROOMS.iter().map(|s| s.to_string()).collect()
}

fn default_holder() -> String {
    DEFAULT_HOLDER.to_string()
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            suspects: classic_suspects(),
            weapons: classic_weapons(),
            rooms: classic_rooms(),
            solution: None,
            holder: default_holder(),
            other_holders: Vec::new(),
        }
    }
}

impl GameConfig {
    /// Fix the solution instead of drawing it
    pub fn with_solution(mut self, solution: Solution) -> Self {
        self.solution = Some(solution);
        self
    }

    /// Add a holder who shares the undealt cards
    pub fn with_other_holder(mut self, name: impl Into<String>) -> Self {
        self.other_holders.push(name.into());
        self
    }

    /// Deal the configured game
    pub fn setup(&self) -> OracleResult<GameSetup> {
        match &self.solution {
            Some(solution) => GameSetup::deal(
                self.suspects.clone(),
                self.weapons.clone(),
                self.rooms.clone(),
                solution.clone(),
                self.holder.clone(),
                self.other_holders.clone(),
            ),
            None => GameSetup::with_random_solution(
                self.suspects.clone(),
                self.weapons.clone(),
                self.rooms.clone(),
                self.holder.clone(),
                self.other_holders.clone(),
            ),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON records instead of human-readable lines
    #[serde(default)]
    pub json: bool,
    /// Also write daily-rotated files here
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            log_dir: None,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleConfig {
    /// One rule per agent
    pub rules: Vec<PermissionRule>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub game: GameConfig,
    /// Policy for validations made directly on the dataset
    #[serde(default)]
    pub default_reveal_policy: RevealPolicy,
    /// Deadline for a single dataset call in milliseconds
    #[serde(default)]
    pub query_timeout_ms: Option<u64>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl OracleConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> OracleResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        tracing::info!(path = %path.display(), rules = config.rules.len(), "Loaded configuration");
        Ok(config)
    }

    /// Configuration used when none is given: four agents with distinct policies
    pub fn demo() -> Self {
        Self::new()
            .with_rule(
                PermissionRule::new("Holmes")
                    .allow_all([
                        QueryType::SuggestionValidation,
                        QueryType::CardInquiry,
                        QueryType::ClueRequest,
                        QueryType::LogicalValidation,
                        QueryType::ConstraintCheck,
                        QueryType::GameState,
                        QueryType::ProgressiveHint,
                        QueryType::PermissionCheck,
                    ])
                    .with_reveal_policy(RevealPolicy::Progressive),
            )
            .with_rule(
                PermissionRule::new("Watson")
                    .allow_all([
                        QueryType::CardInquiry,
                        QueryType::SuggestionValidation,
                        QueryType::RevelationRequest,
                        QueryType::PermissionCheck,
                    ])
                    .with_max_daily_queries(20)
                    .with_reveal_policy(RevealPolicy::Cooperative),
            )
            .with_rule(
                PermissionRule::new("Lestrade")
                    .allow_all([QueryType::SuggestionValidation, QueryType::GameState])
                    .with_max_daily_queries(10)
                    .forbid_field("revealed_to_you")
                    .with_reveal_policy(RevealPolicy::Competitive),
            )
            .with_rule(
                PermissionRule::new("admin")
                    .allow_all([QueryType::AdminCommand, QueryType::DatasetAccess]),
            )
    }

    pub fn with_rule(mut self, rule: PermissionRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_cache(mut self, max_size: usize, ttl_secs: u64) -> Self {
        self.cache = CacheConfig { max_size, ttl_secs };
        self
    }

    pub fn with_game(mut self, game: GameConfig) -> Self {
        self.game = game;
        self
    }

    pub fn with_default_reveal_policy(mut self, policy: RevealPolicy) -> Self {
        self.default_reveal_policy = policy;
        self
    }

    pub fn with_query_timeout(mut self, timeout_ms: u64) -> Self {
        self.query_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Get the query timeout as Duration
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }

    /// Check the rule set: non-empty, unique agent names
    pub fn validate(&self) -> OracleResult<()> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            let name = rule.agent_name.trim();
            if name.is_empty() {
                return Err(OracleError::invalid_config("agent name must not be empty"));
            }
            if !seen.insert(name) {
                return Err(OracleError::invalid_config(format!(
                    "duplicate rule for agent '{}'",
                    name
                )));
            }
        }
        if self.query_timeout_ms == Some(0) {
            return Err(OracleError::invalid_config("query_timeout_ms must be positive"));
        }
        Ok(())
    }

    /// Build a ready access manager over a secret game dataset
    pub fn build(&self) -> OracleResult<AccessManager> {
        self.build_with_dataset().map(|(manager, _)| manager)
    }

    /// Like [`build`](Self::build), also returning a handle to the dataset
    pub fn build_with_dataset(&self) -> OracleResult<(AccessManager, Arc<SecretGameDataset>)> {
        self.validate()?;

        let dataset = Arc::new(
            SecretGameDataset::new(self.game.setup()?)?
                .with_reveal_policy(self.default_reveal_policy),
        );
        let permissions = PermissionManager::with_rules(self.rules.iter().cloned());
        let cache = QueryCache::new(self.cache.max_size, self.cache.ttl());

        let mut manager = AccessManager::new(permissions, cache, dataset.clone());
        if let Some(timeout) = self.query_timeout() {
            manager = manager.with_query_timeout(timeout);
        }
        Ok((manager, dataset))
    }
}
