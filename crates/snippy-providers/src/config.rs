//! Provider configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Crossref API endpoint
pub const DEFAULT_CROSSREF_ENDPOINT: &str = "https://api.crossref.org";

/// Default JUFO REST endpoint
pub const DEFAULT_JUFO_ENDPOINT: &str = "https://jufo-rest.csc.fi/v1.1";

/// Settings for all external sources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Crossref page fetcher
    #[serde(default)]
    pub crossref: CrossrefConfig,

    /// JUFO ranking classifier
    #[serde(default)]
    pub jufo: JufoConfig,
}

/// Crossref page fetcher settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossrefConfig {
    /// Base URL of the Crossref REST API
    #[serde(default = "default_crossref_endpoint")]
    pub endpoint: String,

    /// Contact address sent as `mailto` (Crossref "polite pool")
    #[serde(default)]
    pub mailto: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_crossref_timeout")]
    pub timeout_secs: u64,
}

impl CrossrefConfig {
    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CrossrefConfig {
    fn default() -> Self {
        Self {
            endpoint: default_crossref_endpoint(),
            mailto: None,
            timeout_secs: default_crossref_timeout(),
        }
    }
}

/// JUFO classifier settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JufoConfig {
    /// Base URL of the JUFO REST API
    #[serde(default = "default_jufo_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_jufo_timeout")]
    pub timeout_secs: u64,

    /// Minimum name similarity (0-100, exclusive) to accept a candidate
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
}

impl JufoConfig {
    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for JufoConfig {
    fn default() -> Self {
        Self {
            endpoint: default_jufo_endpoint(),
            timeout_secs: default_jufo_timeout(),
            match_threshold: default_match_threshold(),
        }
    }
}

fn default_crossref_endpoint() -> String {
    DEFAULT_CROSSREF_ENDPOINT.to_string()
}

fn default_crossref_timeout() -> u64 {
    10
}

fn default_jufo_endpoint() -> String {
    DEFAULT_JUFO_ENDPOINT.to_string()
}

fn default_jufo_timeout() -> u64 {
    5
}

fn default_match_threshold() -> f64 {
    60.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProvidersConfig::default();
        assert_eq!(config.crossref.endpoint, DEFAULT_CROSSREF_ENDPOINT);
        assert_eq!(config.crossref.timeout(), Duration::from_secs(10));
        assert_eq!(config.jufo.match_threshold, 60.0);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ProvidersConfig = toml::from_str(
            r#"
            [crossref]
            mailto = "me@example.org"
            "#,
        )
        .unwrap();
        assert_eq!(config.crossref.mailto.as_deref(), Some("me@example.org"));
        assert_eq!(config.crossref.timeout_secs, 10);
        assert_eq!(config.jufo, JufoConfig::default());
    }
}
