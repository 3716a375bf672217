//! Configuration for aggregation runs
//!
//! Defines page size, the result-count ceiling and classification fan-out.

use crate::SearchError;
use serde::{Deserialize, Serialize};

/// Configuration for the aggregation engine
///
/// # Examples
///
/// ```
/// use snippy_engine::EngineConfig;
///
/// // Default configuration (balanced)
/// let config = EngineConfig::default();
/// assert_eq!(config.batch_size, 20);
///
/// // Gentle on the upstream services
/// let config = EngineConfig::conservative();
/// assert_eq!(config.classify_concurrency, 2);
///
/// // Large pages, more lookups in flight
/// let config = EngineConfig::fast();
/// assert_eq!(config.batch_size, 50);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Raw records requested per fetch call
    /// Default: 20
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Largest `max_results` a query may ask for
    /// Default: 1000
    #[serde(default = "default_max_results_limit")]
    pub max_results_limit: usize,

    /// Classification lookups in flight per page
    /// Default: 5
    #[serde(default = "default_classify_concurrency")]
    pub classify_concurrency: usize,

    /// Progress events buffered between the run task and its consumer
    /// Default: 32
    #[serde(default = "default_progress_buffer")]
    pub progress_buffer: usize,
}

fn default_batch_size() -> usize {
    20
}

fn default_max_results_limit() -> usize {
    1000
}

fn default_classify_concurrency() -> usize {
    5
}

fn default_progress_buffer() -> usize {
    32
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_results_limit: default_max_results_limit(),
            classify_concurrency: default_classify_concurrency(),
            progress_buffer: default_progress_buffer(),
        }
    }
}

impl EngineConfig {
    /// Small pages and few concurrent lookups
    pub fn conservative() -> Self {
        Self {
            batch_size: 10,
            classify_concurrency: 2,
            ..Self::default()
        }
    }

    /// Larger pages and more concurrent lookups
    pub fn fast() -> Self {
        Self {
            batch_size: 50,
            classify_concurrency: 10,
            ..Self::default()
        }
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.batch_size == 0 {
            return Err(SearchError::Config("batch_size must be positive".to_string()));
        }
        if self.max_results_limit == 0 {
            return Err(SearchError::Config(
                "max_results_limit must be positive".to_string(),
            ));
        }
        if self.classify_concurrency == 0 {
            return Err(SearchError::Config(
                "classify_concurrency must be positive".to_string(),
            ));
        }
        if self.progress_buffer == 0 {
            return Err(SearchError::Config("progress_buffer must be positive".to_string()));
        }
        Ok(())
    }
}
