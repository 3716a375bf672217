//! Crossref Page Fetcher
//!
//! Pages through the Crossref `/works` search endpoint.
//!
//! # Examples
//!
//! ```no_run
//! use snippy_providers::{CrossrefConfig, CrossrefFetcher};
//!
//! let fetcher = CrossrefFetcher::new(&CrossrefConfig::default()).unwrap();
//! ```

use crate::config::CrossrefConfig;
use crate::error::{ProviderError, Result};
use serde::Deserialize;
use snippy_domain::{Page, PageFetcher, Query, RawRecord};
use tracing::debug;

/// Fields requested from Crossref
const SELECT_FIELDS: &str = "DOI,title,container-title,issued,author";

/// Longest error body kept in a [`ProviderError::Status`]
const MAX_ERROR_BODY: usize = 200;

/// Page fetcher backed by the Crossref REST API
pub struct CrossrefFetcher {
    endpoint: String,
    mailto: Option<String>,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct WorksResponse {
    message: WorksMessage,
}

#[derive(Deserialize)]
struct WorksMessage {
    #[serde(default)]
    items: Vec<WorkItem>,
    #[serde(rename = "total-results")]
    total_results: Option<usize>,
}

#[derive(Deserialize)]
struct WorkItem {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(default)]
    title: Vec<String>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    issued: Option<Issued>,
    #[serde(default)]
    author: Vec<Author>,
}

#[derive(Deserialize)]
struct Author {
    #[serde(default)]
    given: String,
    #[serde(default)]
    family: String,
}

impl Author {
    /// `family, given`, dropping whichever part is missing
    fn display(&self) -> Option<String> {
        let (family, given) = (self.family.trim(), self.given.trim());
        match (family.is_empty(), given.is_empty()) {
            (true, true) => None,
            (false, true) => Some(family.to_string()),
            (true, false) => Some(given.to_string()),
            (false, false) => Some(format!("{}, {}", family, given)),
        }
    }
}

#[derive(Deserialize)]
struct Issued {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i64>>>,
}

impl WorkItem {
    fn into_raw(self) -> RawRecord {
        let year = self
            .issued
            .and_then(|issued| issued.date_parts.into_iter().next())
            .and_then(|parts| parts.into_iter().next().flatten())
            .and_then(|y| i32::try_from(y).ok());
        let link = self
            .doi
            .filter(|doi| !doi.trim().is_empty())
            .map(|doi| format!("https://doi.org/{}", doi.trim()));
        let author = self.author.first().and_then(Author::display);

        RawRecord {
            title: self.title.into_iter().next(),
            journal: self.container_title.into_iter().next(),
            year,
            link,
            author,
        }
    }
}

impl CrossrefFetcher {
    /// Create a fetcher from configuration
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: &CrossrefConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("snippy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Communication(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            mailto: config.mailto.clone().filter(|m| !m.trim().is_empty()),
            client,
        })
    }

    /// Query-string parameters for one page request
    pub fn request_params(
        &self,
        query: &Query,
        offset: usize,
        batch_size: usize,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("query", query.keywords().to_string()),
            ("rows", batch_size.to_string()),
            ("offset", offset.to_string()),
            ("select", SELECT_FIELDS.to_string()),
        ];

        if let Some(range) = query.year_range() {
            let filter = if range.is_open_ended() {
                format!("from-pub-date:{}", range.start())
            } else {
                format!("from-pub-date:{},until-pub-date:{}", range.start(), range.end())
            };
            params.push(("filter", filter));
        }

        if let Some(mailto) = &self.mailto {
            params.push(("mailto", mailto.clone()));
        }

        params
    }

    async fn fetch(&self, query: &Query, offset: usize, batch_size: usize) -> Result<Page> {
        let url = format!("{}/works", self.endpoint);
        let params = self.request_params(query, offset, batch_size);

        let response = self.client.get(&url).query(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let body = response.text().await?;
        parse_works(&body, offset, batch_size)
    }
}

/// Decode a `/works` response body into a page
///
/// `has_more` uses `total-results` when present and otherwise assumes more
/// pages exist whenever the page came back full.
pub fn parse_works(body: &str, offset: usize, batch_size: usize) -> Result<Page> {
    let response: WorksResponse = serde_json::from_str(body)?;
    let message = response.message;
    let returned = message.items.len();

    let has_more = match message.total_results {
        Some(total) => returned > 0 && offset + returned < total,
        None => returned > 0 && returned >= batch_size,
    };

    let records = message.items.into_iter().map(WorkItem::into_raw).collect();
    Ok(Page::new(records, has_more))
}

impl PageFetcher for CrossrefFetcher {
    type Error = ProviderError;

    async fn fetch_page(&self, query: &Query, offset: usize, batch_size: usize) -> Result<Page> {
        debug!(offset, batch_size, keywords = query.keywords(), "Fetching Crossref page");
        let page = self.fetch(query, offset, batch_size).await?;
        debug!(returned = page.records.len(), has_more = page.has_more, "Crossref page received");
        Ok(page)
    }

    fn name(&self) -> &str {
        "crossref"
    }
}
