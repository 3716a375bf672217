//! Snippy Provider Layer
//!
//! Implementations of the `PageFetcher` and `RankingClassifier` traits from
//! `snippy-domain`.
//!
//! # Providers
//!
//! - `CrossrefFetcher`: pages through the Crossref works search
//! - `JufoClassifier`: maps journal names to JUFO levels, with caching
//! - `ScriptedFetcher` / `StaticClassifier`: deterministic doubles for testing
//!
//! # Examples
//!
//! ```
//! use snippy_providers::StaticClassifier;
//! use snippy_domain::{RankingClassifier, Tier};
//!
//! let classifier = StaticClassifier::new().with("Discrete Mathematics", Tier::Level2);
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! assert_eq!(rt.block_on(classifier.classify("Discrete Mathematics")), Tier::Level2);
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod crossref;
pub mod error;
pub mod jufo;
pub mod mock;

pub use config::{CrossrefConfig, JufoConfig, ProvidersConfig};
pub use crossref::CrossrefFetcher;
pub use error::ProviderError;
pub use jufo::{JufoChannel, JufoClassifier};
pub use mock::{ScriptedFetcher, StaticClassifier};
