//! JUFO Ranking Classifier
//!
//! Maps journal names to Julkaisufoorumi levels through the JUFO REST API.
//! Lookups go through three searches (exact name, wildcard, ISSN), pick the
//! closest candidate by name similarity, then read the level from the
//! channel detail. Results are cached per journal name for the lifetime of
//! the classifier.

use crate::config::JufoConfig;
use crate::error::{ProviderError, Result};
use serde_json::Value;
use snippy_domain::{RankingClassifier, Tier, UNKNOWN_JOURNAL};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Longest name sent to the search endpoint
const MAX_QUERY_CHARS: usize = 100;

/// A publication channel returned by the JUFO search endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JufoChannel {
    /// JUFO channel id
    pub id: String,
    /// Channel name
    pub name: String,
}

impl JufoChannel {
    fn from_value(value: &Value) -> Option<Self> {
        let id = match value.get("Jufo_ID")? {
            Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let name = value
            .get("Name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some(Self { id, name })
    }
}

/// Ranking classifier backed by the JUFO REST API
pub struct JufoClassifier {
    endpoint: String,
    match_threshold: f64,
    client: reqwest::Client,
    cache: Mutex<HashMap<String, Tier>>,
}

impl JufoClassifier {
    /// Create a classifier from configuration
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: &JufoConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProviderError::Communication(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            match_threshold: config.match_threshold,
            client,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Number of cached journal names
    pub fn cached_len(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn cached(&self, journal: &str) -> Option<Tier> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(journal)
            .copied()
    }

    fn remember(&self, journal: &str, tier: Tier) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(journal.to_string(), tier);
    }

    /// Look up the tier of a journal, surfacing HTTP failures
    pub async fn lookup(&self, journal: &str) -> Result<Tier> {
        let candidates = self.search_in_sequence(journal).await?;
        if candidates.is_empty() {
            debug!(journal, "No JUFO results");
            return Ok(Tier::Unranked);
        }

        let Some((best, score)) = best_match(&candidates, journal, self.match_threshold) else {
            debug!(journal, "No JUFO candidate above match threshold");
            return Ok(Tier::Unranked);
        };
        debug!(journal, matched = %best.name, score, "JUFO match");

        let level = self.channel_level(&best.id).await?;
        Ok(level.map(Tier::from_level).unwrap_or(Tier::Unranked))
    }

    /// Exact name, then wildcard name, then ISSN; first non-empty result wins
    async fn search_in_sequence(&self, journal: &str) -> Result<Vec<JufoChannel>> {
        let name: String = journal.chars().take(MAX_QUERY_CHARS).collect();

        let found = self.search("nimi", &name).await?;
        if !found.is_empty() {
            return Ok(found);
        }

        let found = self.search("nimi", &format!("*{}*", name)).await?;
        if !found.is_empty() {
            return Ok(found);
        }

        if looks_like_issn(&name) {
            return self.search("issn", &name).await;
        }

        Ok(Vec::new())
    }

    async fn search(&self, param: &str, value: &str) -> Result<Vec<JufoChannel>> {
        let url = format!("{}/etsi.php", self.endpoint);
        let body = self.get_json(&url, &[(param, value)]).await?;
        Ok(parse_channels(&body))
    }

    async fn channel_level(&self, id: &str) -> Result<Option<u8>> {
        let url = format!("{}/kanava/{}", self.endpoint, id);
        let body = self.get_json(&url, &[]).await?;
        Ok(parse_level(&body))
    }

    async fn get_json(&self, url: &str, params: &[(&str, &str)]) -> Result<Value> {
        let response = self.client.get(url).query(params).send().await?;
        let status = response.status();
        // JUFO answers unknown names with 204 or 404
        if status == reqwest::StatusCode::NO_CONTENT || status == reqwest::StatusCode::NOT_FOUND {
            return Ok(Value::Null);
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: String::new(),
            });
        }
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

impl RankingClassifier for JufoClassifier {
    async fn classify(&self, journal: &str) -> Tier {
        let journal = journal.trim();
        if journal.is_empty() || journal == UNKNOWN_JOURNAL {
            return Tier::Unranked;
        }

        if let Some(tier) = self.cached(journal) {
            debug!(journal, tier = %tier, "JUFO cache hit");
            return tier;
        }

        match self.lookup(journal).await {
            Ok(tier) => {
                self.remember(journal, tier);
                tier
            }
            Err(e) => {
                warn!(journal, error = %e, "JUFO lookup failed, treating as unranked");
                Tier::Unranked
            }
        }
    }
}

/// Channels from a search response; anything but a list yields none
pub fn parse_channels(body: &Value) -> Vec<JufoChannel> {
    body.as_array()
        .map(|items| items.iter().filter_map(JufoChannel::from_value).collect())
        .unwrap_or_default()
}

/// Level from a channel detail response
///
/// The detail is a one-element list whose `Level` is a digit string (or,
/// occasionally, a number).
pub fn parse_level(body: &Value) -> Option<u8> {
    let level = body.as_array()?.first()?.get("Level")?;
    match level {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64().and_then(|n| u8::try_from(n).ok()),
        _ => None,
    }
}

/// Closest candidate by name similarity (0-100), if strictly above `threshold`
pub fn best_match<'a>(
    candidates: &'a [JufoChannel],
    journal: &str,
    threshold: f64,
) -> Option<(&'a JufoChannel, f64)> {
    let mut best: Option<(&JufoChannel, f64)> = None;
    for candidate in candidates {
        let score = strsim::normalized_levenshtein(&candidate.name, journal) * 100.0;
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }
    best.filter(|(_, score)| *score > threshold)
}

fn looks_like_issn(s: &str) -> bool {
    s.len() <= 9 && !s.is_empty() && (s.contains('-') || s.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn channel(id: &str, name: &str) -> JufoChannel {
        JufoChannel {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_parse_channels() {
        let body = json!([
            {"Jufo_ID": "52431", "Name": "Journal of Graph Theory"},
            {"Jufo_ID": 60012, "Name": "Graphs and Combinatorics"},
            {"Name": "No id"}
        ]);
        let channels = parse_channels(&body);
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[1].id, "60012");

        assert!(parse_channels(&json!({"error": "x"})).is_empty());
        assert!(parse_channels(&Value::Null).is_empty());
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level(&json!([{"Level": "2"}])), Some(2));
        assert_eq!(parse_level(&json!([{"Level": 3}])), Some(3));
        assert_eq!(parse_level(&json!([{"Level": ""}])), None);
        assert_eq!(parse_level(&json!([])), None);
    }

    #[test]
    fn test_best_match_picks_closest_above_threshold() {
        let candidates = vec![
            channel("1", "Journal of Algebra"),
            channel("2", "Journal of Graph Theory"),
        ];
        let (best, score) = best_match(&candidates, "Journal of Graph Theory", 60.0).unwrap();
        assert_eq!(best.id, "2");
        assert!((score - 100.0).abs() < f64::EPSILON);

        assert!(best_match(&candidates, "Nature", 60.0).is_none());
        assert!(best_match(&[], "Nature", 60.0).is_none());
    }

    #[test]
    fn test_looks_like_issn() {
        assert!(looks_like_issn("0364-9024"));
        assert!(looks_like_issn("03649024"));
        assert!(!looks_like_issn("Nature"));
        assert!(!looks_like_issn("Journal-of-Things"));
    }

    #[tokio::test]
    async fn test_unknown_journal_skips_lookup() {
        let classifier = JufoClassifier::new(&JufoConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            ..JufoConfig::default()
        })
        .unwrap();
        assert_eq!(classifier.classify(UNKNOWN_JOURNAL).await, Tier::Unranked);
        assert_eq!(classifier.classify("  ").await, Tier::Unranked);
        assert_eq!(classifier.cached_len(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unranked_and_not_cached() {
        let classifier = JufoClassifier::new(&JufoConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..JufoConfig::default()
        })
        .unwrap();
        assert_eq!(classifier.classify("Journal of Graph Theory").await, Tier::Unranked);
        assert_eq!(classifier.cached_len(), 0);
    }
}
