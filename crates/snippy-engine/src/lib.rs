//! Snippy Engine
//!
//! Runs literature searches: pages through a bibliographic source, classifies
//! every new record by journal tier, and accumulates the results until a stop
//! condition is met.
//!
//! # Overview
//!
//! - **Aggregation driver**: explicit state machine, one fetch per `step`
//! - **Session controller**: one background run per session, progress over a
//!   channel, cooperative cancellation
//! - **Archive**: saved searches and the project hierarchy over a `SearchStore`
//! - **Export**: CSV tables of result rows
//!
//! ## Run Lifecycle
//!
//! | Status | Entered when | Next fetch? |
//! |--------|--------------|-------------|
//! | **Idle** | Driver created | No |
//! | **Running** | `start_run` accepted | Yes |
//! | **Stopping** | Cancel requested | No, in-flight fetch is kept |
//! | **Completed** | Target reached, source exhausted, or cancelled | No |
//! | **Failed** | Provider error | No, partial results kept |
//!
//! # Usage
//!
//! ```no_run
//! use snippy_engine::{Archive, EngineConfig, SessionController};
//! use snippy_providers::{CrossrefFetcher, JufoClassifier, ProvidersConfig};
//! use snippy_store::SqliteStore;
//! use snippy_domain::Query;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let providers = ProvidersConfig::default();
//!     let session = SessionController::new(
//!         CrossrefFetcher::new(&providers.crossref)?,
//!         JufoClassifier::new(&providers.jufo)?,
//!         EngineConfig::default(),
//!     );
//!     let mut archive = Archive::new(SqliteStore::new("snippy.db")?);
//!
//!     let handle = session.start_run(Query::new("graph theory", 25)?)?;
//!     let outcome = handle.finish().await?;
//!     archive.save_outcome(&outcome)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod archive;
pub mod config;
pub mod driver;
pub mod error;
pub mod export;
pub mod progress;
pub mod session;

pub use archive::{current_timestamp, Archive};
pub use config::EngineConfig;
pub use driver::{AggregationDriver, CancelFlag, Step};
pub use error::SearchError;
pub use export::{export_csv, write_csv};
pub use progress::{percent, ProgressSnapshot, RunEvent, RunOutcome, RunState, RunStatus};
pub use session::{RunHandle, SessionController};
