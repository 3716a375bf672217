//! Snippy Storage Layer
//!
//! Implements the SearchStore trait on SQLite.
//!
//! # Architecture
//!
//! - Saved searches are keyed by their keyword string; records keep their
//!   saved order through a `position` column
//! - Projects, sections and search blocks use UUIDv7 ids stored as
//!   big-endian blobs, so ordering by id is ordering by creation time
//! - Search blocks hold their own copy of the records
//!
//! # Examples
//!
//! ```no_run
//! use snippy_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for archive operations
//! ```

#![warn(missing_docs)]

use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use snippy_domain::{
    DedupKey, EntityId, Project, ProjectDetail, Record, SavedSearch, SearchBlock, SearchStore,
    SearchSummary, Section, SectionDetail, Tier, TierThreshold,
};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Referenced entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Current timestamp in seconds since Unix epoch
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// SQLite-based implementation of SearchStore
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should have its own SqliteStore instance.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use snippy_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("snippy.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Convert EntityId to bytes for storage
    fn id_to_bytes(id: EntityId) -> Vec<u8> {
        id.value().to_be_bytes().to_vec()
    }

    /// Convert bytes to EntityId
    fn bytes_to_id(bytes: &[u8]) -> Result<EntityId, StoreError> {
        if bytes.len() != 16 {
            return Err(StoreError::InvalidData(format!(
                "Expected 16 bytes for EntityId, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(bytes);
        Ok(EntityId::from_value(u128::from_be_bytes(arr)))
    }

    /// Read an id column, reporting bad blobs as conversion failures
    fn id_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<EntityId> {
        let bytes: Vec<u8> = row.get(idx)?;
        Self::bytes_to_id(&bytes).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Blob, Box::new(e))
        })
    }

    /// Map `title, journal, year, link, tier, author` starting at column `start`
    fn record_from_row(row: &Row<'_>, start: usize) -> rusqlite::Result<Record> {
        let tier: i64 = row.get(start + 4)?;
        Ok(Record {
            title: row.get(start)?,
            journal: row.get(start + 1)?,
            year: row.get(start + 2)?,
            link: row.get(start + 3)?,
            tier: Tier::from_level(u8::try_from(tier).unwrap_or_default()),
            author: row.get(start + 5)?,
        })
    }

    fn search_records(&self, keywords: &str) -> Result<Vec<Record>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT title, journal, year, link, tier, author FROM search_records
             WHERE keywords = ?1 ORDER BY position",
        )?;
        let records = stmt
            .query_map(params![keywords], |row| Self::record_from_row(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn block_records(&self, block_id: &[u8]) -> Result<Vec<Record>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT title, journal, year, link, tier, author FROM block_records
             WHERE block_id = ?1 ORDER BY position",
        )?;
        let records = stmt
            .query_map(params![block_id], |row| Self::record_from_row(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn section_detail(&self, section: Section) -> Result<SectionDetail, StoreError> {
        let section_bytes = Self::id_to_bytes(section.id);
        let mut stmt = self.conn.prepare(
            "SELECT id, keywords, added_at FROM search_blocks
             WHERE section_id = ?1 ORDER BY id",
        )?;
        let heads = stmt
            .query_map(params![&section_bytes], |row| {
                Ok((
                    Self::id_column(row, 0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)? as u64,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut blocks = Vec::with_capacity(heads.len());
        for (id, keywords, added_at) in heads {
            blocks.push(SearchBlock {
                id,
                section_id: section.id,
                keywords,
                added_at,
                records: self.block_records(&Self::id_to_bytes(id))?,
            });
        }
        Ok(SectionDetail { section, blocks })
    }

    fn insert_search_records(
        tx: &Transaction<'_>,
        keywords: &str,
        records: &[Record],
    ) -> Result<(), StoreError> {
        let mut stmt = tx.prepare(
            "INSERT INTO search_records (keywords, position, dedup_key, title, journal, year, link, tier, author)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for (position, record) in records.iter().enumerate() {
            stmt.execute(params![
                keywords,
                position as i64,
                record.dedup_key().to_string(),
                &record.title,
                &record.journal,
                record.year,
                &record.link,
                record.tier.ordinal(),
                &record.author,
            ])?;
        }
        Ok(())
    }
}

impl SearchStore for SqliteStore {
    type Error = StoreError;

    fn save_search(&mut self, search: &SavedSearch) -> Result<(), Self::Error> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM search_records WHERE keywords = ?1",
            params![&search.keywords],
        )?;
        tx.execute(
            "INSERT INTO saved_searches (keywords, saved_at) VALUES (?1, ?2)
             ON CONFLICT(keywords) DO UPDATE SET saved_at = excluded.saved_at",
            params![&search.keywords, search.saved_at as i64],
        )?;
        Self::insert_search_records(&tx, &search.keywords, &search.records)?;
        tx.commit()?;

        tracing::debug!(keywords = %search.keywords, records = search.records.len(), "Stored saved search");
        Ok(())
    }

    fn get_search(&self, keywords: &str) -> Result<Option<SavedSearch>, Self::Error> {
        let saved_at: Option<i64> = self
            .conn
            .query_row(
                "SELECT saved_at FROM saved_searches WHERE keywords = ?1",
                params![keywords],
                |row| row.get(0),
            )
            .optional()?;

        match saved_at {
            Some(saved_at) => Ok(Some(SavedSearch {
                keywords: keywords.to_string(),
                saved_at: saved_at as u64,
                records: self.search_records(keywords)?,
            })),
            None => Ok(None),
        }
    }

    fn list_searches(&self) -> Result<Vec<SearchSummary>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT s.keywords, s.saved_at, COUNT(r.position)
             FROM saved_searches s
             LEFT JOIN search_records r ON r.keywords = s.keywords
             GROUP BY s.keywords, s.saved_at
             ORDER BY s.saved_at DESC, s.keywords",
        )?;
        let summaries = stmt
            .query_map([], |row| {
                Ok(SearchSummary {
                    keywords: row.get(0)?,
                    saved_at: row.get::<_, i64>(1)? as u64,
                    count: row.get::<_, i64>(2)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    fn delete_search(&mut self, keywords: &str) -> Result<bool, Self::Error> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM search_records WHERE keywords = ?1",
            params![keywords],
        )?;
        let deleted = tx.execute(
            "DELETE FROM saved_searches WHERE keywords = ?1",
            params![keywords],
        )?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    fn delete_record(&mut self, keywords: &str, key: &DedupKey) -> Result<bool, Self::Error> {
        let deleted = self.conn.execute(
            "DELETE FROM search_records WHERE keywords = ?1 AND dedup_key = ?2",
            params![keywords, key.to_string()],
        )?;
        Ok(deleted > 0)
    }

    fn prune_unqualified(
        &mut self,
        keywords: &str,
        threshold: TierThreshold,
    ) -> Result<usize, Self::Error> {
        let deleted = self.conn.execute(
            "DELETE FROM search_records WHERE keywords = ?1 AND (tier = 0 OR tier < ?2)",
            params![keywords, threshold.minimum().ordinal()],
        )?;
        Ok(deleted)
    }

    fn create_project(&mut self, title: &str, description: &str) -> Result<EntityId, Self::Error> {
        let id = EntityId::new();
        self.conn.execute(
            "INSERT INTO projects (id, title, description, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![Self::id_to_bytes(id), title, description, current_timestamp() as i64],
        )?;
        Ok(id)
    }

    fn list_projects(&self) -> Result<Vec<Project>, Self::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, description, created_at FROM projects ORDER BY id")?;
        let projects = stmt
            .query_map([], |row| {
                Ok(Project {
                    id: Self::id_column(row, 0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    created_at: row.get::<_, i64>(3)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    fn get_project(&self, id: EntityId) -> Result<Option<ProjectDetail>, Self::Error> {
        let id_bytes = Self::id_to_bytes(id);
        let project = self
            .conn
            .query_row(
                "SELECT title, description, created_at FROM projects WHERE id = ?1",
                params![&id_bytes],
                |row| {
                    Ok(Project {
                        id,
                        title: row.get(0)?,
                        description: row.get(1)?,
                        created_at: row.get::<_, i64>(2)? as u64,
                    })
                },
            )
            .optional()?;
        let Some(project) = project else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT id, title, created_at FROM sections WHERE project_id = ?1 ORDER BY id",
        )?;
        let sections = stmt
            .query_map(params![&id_bytes], |row| {
                Ok(Section {
                    id: Self::id_column(row, 0)?,
                    project_id: id,
                    title: row.get(1)?,
                    created_at: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let sections = sections
            .into_iter()
            .map(|section| self.section_detail(section))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(ProjectDetail { project, sections }))
    }

    fn delete_project(&mut self, id: EntityId) -> Result<bool, Self::Error> {
        // Sections, blocks and block records cascade
        let deleted = self.conn.execute(
            "DELETE FROM projects WHERE id = ?1",
            params![Self::id_to_bytes(id)],
        )?;
        Ok(deleted > 0)
    }

    fn add_section(&mut self, project_id: EntityId, title: &str) -> Result<EntityId, Self::Error> {
        let project_bytes = Self::id_to_bytes(project_id);
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM projects WHERE id = ?1",
                params![&project_bytes],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if !exists {
            return Err(StoreError::NotFound(format!("project {}", project_id)));
        }

        let id = EntityId::new();
        self.conn.execute(
            "INSERT INTO sections (id, project_id, title, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![Self::id_to_bytes(id), &project_bytes, title, current_timestamp() as i64],
        )?;
        Ok(id)
    }

    fn delete_section(&mut self, section_id: EntityId) -> Result<bool, Self::Error> {
        let deleted = self.conn.execute(
            "DELETE FROM sections WHERE id = ?1",
            params![Self::id_to_bytes(section_id)],
        )?;
        Ok(deleted > 0)
    }

    fn add_search_block(
        &mut self,
        section_id: EntityId,
        keywords: &str,
    ) -> Result<EntityId, Self::Error> {
        let section_bytes = Self::id_to_bytes(section_id);
        let tx = self.conn.transaction()?;

        let section_exists = tx
            .query_row(
                "SELECT 1 FROM sections WHERE id = ?1",
                params![&section_bytes],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if !section_exists {
            return Err(StoreError::NotFound(format!("section {}", section_id)));
        }

        let search_exists = tx
            .query_row(
                "SELECT 1 FROM saved_searches WHERE keywords = ?1",
                params![keywords],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if !search_exists {
            return Err(StoreError::NotFound(format!("saved search '{}'", keywords)));
        }

        let id = EntityId::new();
        let id_bytes = Self::id_to_bytes(id);
        tx.execute(
            "INSERT INTO search_blocks (id, section_id, keywords, added_at) VALUES (?1, ?2, ?3, ?4)",
            params![&id_bytes, &section_bytes, keywords, current_timestamp() as i64],
        )?;
        tx.execute(
            "INSERT INTO block_records (block_id, position, title, journal, year, link, tier, author)
             SELECT ?1, position, title, journal, year, link, tier, author
             FROM search_records WHERE keywords = ?2",
            params![&id_bytes, keywords],
        )?;
        tx.commit()?;
        Ok(id)
    }

    fn delete_search_block(&mut self, block_id: EntityId) -> Result<bool, Self::Error> {
        let deleted = self.conn.execute(
            "DELETE FROM search_blocks WHERE id = ?1",
            params![Self::id_to_bytes(block_id)],
        )?;
        Ok(deleted > 0)
    }

    fn delete_block_record(
        &mut self,
        block_id: EntityId,
        index: usize,
    ) -> Result<bool, Self::Error> {
        let block_bytes = Self::id_to_bytes(block_id);
        let position: Option<i64> = self
            .conn
            .query_row(
                "SELECT position FROM block_records WHERE block_id = ?1
                 ORDER BY position LIMIT 1 OFFSET ?2",
                params![&block_bytes, index as i64],
                |row| row.get(0),
            )
            .optional()?;

        let Some(position) = position else {
            return Ok(false);
        };
        self.conn.execute(
            "DELETE FROM block_records WHERE block_id = ?1 AND position = ?2",
            params![&block_bytes, position],
        )?;
        Ok(true)
    }
}
