//! Pipeline configuration.

use serde::{Deserialize, Serialize};

use tessera_core::{defaults, Error, Result};

/// Tunables for chunking, search, and batch cataloging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Token budget per chunk (× 4 characters).
    pub chunk_max_tokens: usize,
    /// Minimum cosine similarity for search hits.
    pub search_threshold: f32,
    pub search_limit: i64,
    /// Concurrent pipelines in `categorize_batch`.
    pub batch_concurrency: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            chunk_max_tokens: defaults::CHUNK_MAX_TOKENS,
            search_threshold: defaults::SEARCH_THRESHOLD,
            search_limit: defaults::SEARCH_LIMIT,
            batch_concurrency: defaults::BATCH_CONCURRENCY,
        }
    }
}

impl CatalogConfig {
    /// Read `TESSERA_*` environment variables over the defaults.
    ///
    /// Unset variables keep their default; set but unparsable or
    /// out-of-range values are rejected.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("TESSERA_CHUNK_MAX_TOKENS") {
            config.chunk_max_tokens = parse_var("TESSERA_CHUNK_MAX_TOKENS", &v)?;
        }
        if let Some(v) = lookup("TESSERA_SEARCH_THRESHOLD") {
            config.search_threshold = parse_var("TESSERA_SEARCH_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("TESSERA_SEARCH_LIMIT") {
            config.search_limit = parse_var("TESSERA_SEARCH_LIMIT", &v)?;
        }
        if let Some(v) = lookup("TESSERA_BATCH_CONCURRENCY") {
            config.batch_concurrency = parse_var("TESSERA_BATCH_CONCURRENCY", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_max_tokens == 0 {
            return Err(Error::Config(
                "chunk_max_tokens must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.search_threshold) {
            return Err(Error::Config(format!(
                "search_threshold must be within 0..=1, got {}",
                self.search_threshold
            )));
        }
        if self.search_limit < 1 {
            return Err(Error::Config("search_limit must be at least 1".to_string()));
        }
        if self.batch_concurrency == 0 {
            return Err(Error::Config(
                "batch_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {}: {:?}", key, value)))
}
