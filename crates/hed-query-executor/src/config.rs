//! Executor settings: compiled-query caching and batch parallelism.

use std::time::Duration;

/// Settings read by [`QueryExecutor`](crate::QueryExecutor).
///
/// The default compiles every query afresh and searches batches on the
/// calling thread.
///
/// # Example
///
/// ```rust
/// use hed_query_executor::{CacheConfig, ExecutorConfig};
///
/// let config = ExecutorConfig::builder()
///     .with_cache(CacheConfig::default())
///     .with_parallel(true)
///     .build();
/// assert!(config.cache.is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// Compiled-query cache, or `None` to compile on every call.
    pub cache: Option<CacheConfig>,
    /// Spread `search_many` over rayon. Ignored without the `parallel` feature.
    pub parallel: bool,
}

impl ExecutorConfig {
    /// Starts from the default settings.
    pub fn builder() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder(Self::default())
    }
}

/// Chained setters over an [`ExecutorConfig`].
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfigBuilder(ExecutorConfig);

impl ExecutorConfigBuilder {
    /// Turns on the compiled-query cache.
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.0.cache = Some(cache);
        self
    }

    /// Sets whether batches are searched in parallel.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.0.parallel = parallel;
        self
    }

    /// Finishes the configuration.
    pub fn build(self) -> ExecutorConfig {
        self.0
    }
}

/// Size and lifetime limits of the compiled-query cache.
///
/// Defaults to 10 000 queries kept for five minutes.
///
/// # Example
///
/// ```rust
/// use hed_query_executor::CacheConfig;
/// use std::time::Duration;
///
/// let cache = CacheConfig {
///     max_entries: 1_000,
///     ttl: Duration::from_secs(60),
/// };
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Queries kept before the least recently used is evicted.
    pub max_entries: usize,
    /// Age after which an entry is treated as absent.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(300),
        }
    }
}
