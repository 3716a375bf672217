//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::{
    DedupKey, EntityId, Project, ProjectDetail, Query, RawRecord, SavedSearch, SearchSummary, Tier,
    TierThreshold,
};
use std::future::Future;

/// One page of provider output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Candidate records in provider order
    pub records: Vec<RawRecord>,

    /// Whether the provider has further pages after this one
    pub has_more: bool,
}

impl Page {
    /// Create a page
    pub fn new(records: Vec<RawRecord>, has_more: bool) -> Self {
        Self { records, has_more }
    }

    /// Final empty page
    pub fn exhausted() -> Self {
        Self::default()
    }
}

/// Trait for fetching pages of candidate records from a bibliographic source
///
/// Implemented by the infrastructure layer (snippy-providers)
pub trait PageFetcher: Send + Sync {
    /// Error type for fetch operations
    type Error: std::fmt::Display + Send;

    /// Fetch up to `batch_size` records starting at `offset`
    ///
    /// Callers guarantee `batch_size > 0`. A failure is terminal for the
    /// calling run; implementations apply their own timeouts.
    fn fetch_page(
        &self,
        query: &Query,
        offset: usize,
        batch_size: usize,
    ) -> impl Future<Output = Result<Page, Self::Error>> + Send;

    /// Human-readable source name for logging
    fn name(&self) -> &str;
}

/// Trait for mapping journal names to ranking tiers
///
/// Implemented by the infrastructure layer (snippy-providers).
/// Classification is total: unknown journals and lookup failures map to
/// [`Tier::Unranked`].
pub trait RankingClassifier: Send + Sync {
    /// Classify a journal
    fn classify(&self, journal: &str) -> impl Future<Output = Tier> + Send;
}

/// Trait for persisting saved searches and the project hierarchy
///
/// Implemented by the infrastructure layer (snippy-store)
pub trait SearchStore {
    /// Error type for store operations
    type Error;

    /// Create or replace the saved search with the same keywords
    fn save_search(&mut self, search: &SavedSearch) -> Result<(), Self::Error>;

    /// Get a saved search by keywords
    fn get_search(&self, keywords: &str) -> Result<Option<SavedSearch>, Self::Error>;

    /// List saved searches, newest first
    fn list_searches(&self) -> Result<Vec<SearchSummary>, Self::Error>;

    /// Delete a saved search; returns whether it existed
    fn delete_search(&mut self, keywords: &str) -> Result<bool, Self::Error>;

    /// Delete one record of a saved search by its dedup key
    fn delete_record(&mut self, keywords: &str, key: &DedupKey) -> Result<bool, Self::Error>;

    /// Delete every record that is unranked or does not meet `threshold`
    ///
    /// Returns the number of deleted records.
    fn prune_unqualified(
        &mut self,
        keywords: &str,
        threshold: TierThreshold,
    ) -> Result<usize, Self::Error>;

    /// Create a project
    fn create_project(&mut self, title: &str, description: &str) -> Result<EntityId, Self::Error>;

    /// List projects in creation order
    fn list_projects(&self) -> Result<Vec<Project>, Self::Error>;

    /// Get a project with its sections and blocks
    fn get_project(&self, id: EntityId) -> Result<Option<ProjectDetail>, Self::Error>;

    /// Delete a project together with its sections and blocks
    fn delete_project(&mut self, id: EntityId) -> Result<bool, Self::Error>;

    /// Add a section to a project
    fn add_section(&mut self, project_id: EntityId, title: &str) -> Result<EntityId, Self::Error>;

    /// Delete a section together with its blocks
    fn delete_section(&mut self, section_id: EntityId) -> Result<bool, Self::Error>;

    /// Copy the saved search with `keywords` into a new block of a section
    fn add_search_block(
        &mut self,
        section_id: EntityId,
        keywords: &str,
    ) -> Result<EntityId, Self::Error>;

    /// Delete a search block
    fn delete_search_block(&mut self, block_id: EntityId) -> Result<bool, Self::Error>;

    /// Delete the record at `index` of a search block
    fn delete_block_record(&mut self, block_id: EntityId, index: usize)
        -> Result<bool, Self::Error>;
}
