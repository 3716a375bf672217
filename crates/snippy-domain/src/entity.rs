//! Archive entities - saved searches and the project / section / block hierarchy

use crate::Record;
use std::fmt;

/// Identifier for projects, sections and search blocks, based on UUIDv7
///
/// UUIDv7 keeps identifiers chronologically sortable, so listing entities by
/// id also lists them in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u128);

impl EntityId {
    /// Generate a new UUIDv7-based id
    ///
    /// # Examples
    ///
    /// ```
    /// use snippy_domain::EntityId;
    ///
    /// let id = EntityId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create an id from a raw u128 value (storage deserialization)
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse an id from its UUID string form
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s.trim())
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid id '{}': {}", s, e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }

    /// Short prefix for table display
    pub fn short(&self) -> String {
        self.to_string()[..8].to_string()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// A finalized search snapshot, identified by its keywords
#[derive(Debug, Clone, PartialEq)]
pub struct SavedSearch {
    /// Keywords the search ran with (identity)
    pub keywords: String,

    /// When the snapshot was saved (seconds since Unix epoch)
    pub saved_at: u64,

    /// Records in accumulation order
    pub records: Vec<Record>,
}

/// History listing entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSummary {
    /// Keywords (identity)
    pub keywords: String,

    /// When the snapshot was saved
    pub saved_at: u64,

    /// Number of records in the snapshot
    pub count: usize,
}

/// Top-level archive container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Unique identifier
    pub id: EntityId,
    /// Project title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Creation timestamp
    pub created_at: u64,
}

/// A titled grouping inside a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Unique identifier
    pub id: EntityId,
    /// Owning project
    pub project_id: EntityId,
    /// Section title
    pub title: String,
    /// Creation timestamp
    pub created_at: u64,
}

/// Snapshot of a saved search placed inside a section
#[derive(Debug, Clone, PartialEq)]
pub struct SearchBlock {
    /// Unique identifier
    pub id: EntityId,
    /// Owning section
    pub section_id: EntityId,
    /// Keywords of the saved search this block was copied from
    pub keywords: String,
    /// When the block was added
    pub added_at: u64,
    /// Records copied from the saved search
    pub records: Vec<Record>,
}

/// A section with its search blocks
#[derive(Debug, Clone, PartialEq)]
pub struct SectionDetail {
    /// The section
    pub section: Section,
    /// Blocks in insertion order
    pub blocks: Vec<SearchBlock>,
}

/// A project with its full section tree
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDetail {
    /// The project
    pub project: Project,
    /// Sections in insertion order
    pub sections: Vec<SectionDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_chronological() {
        let id1 = EntityId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = EntityId::new();
        assert!(id1 < id2, "Earlier UUIDv7 should sort first");
    }

    #[test]
    fn test_entity_id_display_and_parse() {
        let id = EntityId::new();
        let id_str = id.to_string();
        assert_eq!(id_str.len(), 36);
        assert_eq!(EntityId::from_string(&id_str).unwrap(), id);
        assert_eq!(id.short().len(), 8);
    }

    #[test]
    fn test_entity_id_invalid_string() {
        assert!(EntityId::from_string("not-a-uuid").is_err());
        assert!(EntityId::from_string("").is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: id ordering matches u128 ordering
        #[test]
        fn test_id_ordering_property(a: u128, b: u128) {
            let id_a = EntityId::from_value(a);
            let id_b = EntityId::from_value(b);
            prop_assert_eq!(id_a < id_b, a < b);
            prop_assert_eq!(id_a == id_b, a == b);
        }

        /// Property: string form parses back to the same id
        #[test]
        fn test_id_string_roundtrip(value: u128) {
            let id = EntityId::from_value(value);
            match EntityId::from_string(&id.to_string()) {
                Ok(parsed) => prop_assert_eq!(id, parsed),
                Err(e) => return Err(TestCaseError::fail(e)),
            }
        }
    }
}
