//! Snippy Domain Layer
//!
//! This crate contains the core model for Snippy, a literature search
//! aggregator that pages through a bibliographic source, classifies each
//! record by the ranking tier of its journal, and keeps the qualified ones.
//! It defines value objects and the trait interfaces the other layers
//! implement.
//!
//! ## Key Concepts
//!
//! - **Query**: Validated search parameters for one run
//! - **Record**: A bibliographic result together with its tier
//! - **Tier**: Ordered journal ranking (unranked < 1 < 2 < 3)
//! - **Threshold**: The minimum tier a record needs to qualify
//! - **Result View**: Sort and filter projections over a record set
//!
//! ## Architecture
//!
//! - Pure logic only, no I/O
//! - Page fetching, classification and persistence are traits here and
//!   implementations elsewhere

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entity;
pub mod query;
pub mod record;
pub mod tier;
pub mod traits;
pub mod view;

// Re-exports for convenience
pub use entity::{
    EntityId, Project, ProjectDetail, SavedSearch, SearchBlock, SearchSummary, Section,
    SectionDetail,
};
pub use query::{Query, QueryError, YearRange, OPEN_END_YEAR};
pub use record::{DedupKey, RawRecord, Record, NO_LINK, UNKNOWN_JOURNAL};
pub use tier::{Highlight, Tier, TierThreshold};
pub use traits::{Page, PageFetcher, RankingClassifier, SearchStore};
pub use view::{
    filter_records, rank_records, ranked_indices, sort_indices, sort_records, ResultView,
    SortDirection, SortKey, SortState, TierSelector,
};
