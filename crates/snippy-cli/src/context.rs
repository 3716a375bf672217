//! Shared state for command execution.

use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use snippy_engine::{Archive, SessionController};
use snippy_providers::{CrossrefFetcher, JufoClassifier};
use snippy_store::SqliteStore;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Session over the live Crossref and JUFO providers.
pub type Session = SessionController<CrossrefFetcher, JufoClassifier>;

/// Archive over the SQLite database.
pub type SqliteArchive = Archive<SqliteStore>;

/// Configuration, output and lazily created collaborators.
///
/// The session is created once and kept, so the classifier's lookup cache
/// lives as long as the context.
pub struct Context {
    /// Loaded configuration
    pub config: Config,
    /// Output formatter
    pub formatter: Formatter,
    db_path: PathBuf,
    session: Option<Arc<Session>>,
}

impl Context {
    /// Create a context.
    pub fn new(config: Config, formatter: Formatter, db_path: PathBuf) -> Self {
        Self {
            config,
            formatter,
            db_path,
            session: None,
        }
    }

    /// Database file in use.
    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Search session, built from the provider settings on first use.
    pub fn session(&mut self) -> Result<Arc<Session>> {
        let session = match self.session.take() {
            Some(session) => session,
            None => {
                let providers = &self.config.providers;
                Arc::new(SessionController::new(
                    CrossrefFetcher::new(&providers.crossref)?,
                    JufoClassifier::new(&providers.jufo)?,
                    self.config.engine.clone(),
                ))
            }
        };
        Ok(Arc::clone(self.session.insert(session)))
    }

    /// Open the archive database, creating its directory if needed.
    pub fn archive(&self) -> Result<SqliteArchive> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let store = SqliteStore::new(&self.db_path)?;
        Ok(Archive::new(store))
    }
}
