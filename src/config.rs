//! Engine configuration with defaults and environment overrides.

use std::time::Duration;

/// Maximum rewrite attempts per pass; the sole termination guarantee for the
/// retrieval loop.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Retrieval fan-out: how many chunks to request per search.
pub const DEFAULT_TOP_K: usize = 4;

/// Minimum relevance score for a chunk to count as useful during evaluation.
pub const DEFAULT_MIN_SCORE: f32 = 0.0;

/// Upper bound on any single collaborator call within a node.
pub const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_DATABASE_URL: &str = "sqlite://data/checkpoints.db";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Tunable parameters for the workflow engine and its collaborators.
///
/// All fields have defaults and can be overridden via the environment (a
/// `.env` file is honored): `OPENAI_MODEL`, `MAX_RETRIES`, `RETRIEVAL_TOP_K`,
/// `RETRIEVAL_MIN_SCORE`, `DATABASE_URL`.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Model identifier sent to the completion service.
    pub model: String,
    /// Retry cap consumed by routing; small positive integer.
    pub max_retries: u32,
    /// Retrieval fan-out `k`.
    pub top_k: usize,
    /// Usefulness cutoff for the default evaluation policy. Deliberately
    /// permissive out of the box; calibrate per corpus.
    pub min_score: f32,
    /// Checkpoint persistence location.
    pub database_url: String,
    /// Timeout applied around each collaborator call.
    pub collaborator_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            top_k: DEFAULT_TOP_K,
            min_score: DEFAULT_MIN_SCORE,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            collaborator_timeout: DEFAULT_COLLABORATOR_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// Resolves configuration from the environment, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Self {
            model: std::env::var("OPENAI_MODEL").unwrap_or(defaults.model),
            max_retries: parse_env("MAX_RETRIES", defaults.max_retries),
            top_k: parse_env("RETRIEVAL_TOP_K", defaults.top_k),
            min_score: parse_env("RETRIEVAL_MIN_SCORE", defaults.min_score),
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            collaborator_timeout: defaults.collaborator_timeout,
        }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    #[must_use]
    pub fn with_database_url(mut self, database_url: impl Into<String>) -> Self {
        self.database_url = database_url.into();
        self
    }

    #[must_use]
    pub fn with_collaborator_timeout(mut self, timeout: Duration) -> Self {
        self.collaborator_timeout = timeout;
        self
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.top_k, 4);
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.database_url, "sqlite://data/checkpoints.db");
    }

    #[test]
    fn builder_overrides_apply() {
        let config = EngineConfig::default()
            .with_max_retries(5)
            .with_top_k(8)
            .with_min_score(0.4)
            .with_database_url("sqlite://other.db");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.top_k, 8);
        assert_eq!(config.min_score, 0.4);
        assert_eq!(config.database_url, "sqlite://other.db");
    }
}
