//! Record module - bibliographic results before and after classification

use crate::Tier;
use std::fmt;

/// Placeholder stored when a provider record carries no link
pub const NO_LINK: &str = "no link available";

/// Journal name used when the provider omits the container title
pub const UNKNOWN_JOURNAL: &str = "Unknown";

/// A candidate record as returned by a page fetcher
///
/// Every field is optional; providers report what they have and the
/// aggregation driver decides whether the record is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    /// Article title
    pub title: Option<String>,

    /// Journal (container) name
    pub journal: Option<String>,

    /// Publication year
    pub year: Option<i32>,

    /// Resolvable link, usually a DOI URL
    pub link: Option<String>,

    /// First author as `family, given`
    pub author: Option<String>,
}

impl RawRecord {
    /// Convenience constructor for fully populated records
    pub fn new(
        title: impl Into<String>,
        journal: impl Into<String>,
        year: Option<i32>,
        link: Option<String>,
    ) -> Self {
        Self {
            title: Some(title.into()),
            journal: Some(journal.into()),
            year,
            link,
            author: None,
        }
    }

    /// Set the first author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Title with surrounding whitespace removed, if usable
    pub fn usable_title(&self) -> Option<&str> {
        self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Journal name, falling back to [`UNKNOWN_JOURNAL`]
    pub fn journal_or_unknown(&self) -> &str {
        self.journal
            .as_deref()
            .map(str::trim)
            .filter(|j| !j.is_empty())
            .unwrap_or(UNKNOWN_JOURNAL)
    }

    /// Link if one was supplied
    pub fn usable_link(&self) -> Option<&str> {
        self.link
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.eq_ignore_ascii_case(NO_LINK))
    }

    /// Dedup key, or `None` when the record is malformed (no title)
    pub fn dedup_key(&self) -> Option<DedupKey> {
        let title = self.usable_title()?;
        Some(match self.usable_link() {
            Some(link) => DedupKey::Link(link.to_string()),
            None => DedupKey::Composite {
                title: title.to_string(),
                journal: self.journal_or_unknown().to_string(),
                year: self.year,
            },
        })
    }
}

/// Identity used to suppress duplicate records within one run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    /// Records with a link are identified by it
    Link(String),

    /// Records without a link fall back to title, journal and year
    Composite {
        /// Article title
        title: String,
        /// Journal name
        journal: String,
        /// Publication year
        year: Option<i32>,
    },
}

impl DedupKey {
    /// Parse the string form produced by `Display`
    ///
    /// Plain strings are taken as links.
    pub fn parse(s: &str) -> Self {
        let mut parts = s.splitn(4, '\u{1f}');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some("composite"), Some(title), Some(journal), Some(year)) => DedupKey::Composite {
                title: title.to_string(),
                journal: journal.to_string(),
                year: year.parse().ok(),
            },
            _ => DedupKey::Link(s.to_string()),
        }
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupKey::Link(link) => f.write_str(link),
            DedupKey::Composite { title, journal, year } => {
                let year = year.map(|y| y.to_string()).unwrap_or_default();
                write!(f, "composite\u{1f}{}\u{1f}{}\u{1f}{}", title, journal, year)
            }
        }
    }
}

/// A classified bibliographic record
///
/// Records are created once from a [`RawRecord`] plus a tier lookup and are
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Article title
    pub title: String,

    /// Journal name
    pub journal: String,

    /// Publication year, `None` when unknown
    pub year: Option<i32>,

    /// Link, `None` when the provider had none
    pub link: Option<String>,

    /// Ranking tier of the journal
    pub tier: Tier,

    /// First author, display only
    pub author: Option<String>,
}

impl Record {
    /// Build a record from a raw provider record and its tier
    ///
    /// Returns `None` for malformed raw records (missing title).
    pub fn from_raw(raw: &RawRecord, tier: Tier) -> Option<Self> {
        let title = raw.usable_title()?.to_string();
        Some(Self {
            title,
            journal: raw.journal_or_unknown().to_string(),
            year: raw.year,
            link: raw.usable_link().map(str::to_string),
            tier,
            author: raw
                .author
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string),
        })
    }

    /// Link for display, with the "no link" placeholder
    pub fn link_or_placeholder(&self) -> &str {
        self.link.as_deref().unwrap_or(NO_LINK)
    }

    /// Year for display, `N/A` when unknown
    pub fn year_display(&self) -> String {
        self.year.map(|y| y.to_string()).unwrap_or_else(|| "N/A".to_string())
    }

    /// One-line source description: `author - journal, year`
    pub fn citation(&self) -> String {
        let source = format!("{}, {}", self.journal, self.year_display());
        match &self.author {
            Some(author) => format!("{} - {}", author, source),
            None => source,
        }
    }

    /// Dedup key of this record
    pub fn dedup_key(&self) -> DedupKey {
        match &self.link {
            Some(link) => DedupKey::Link(link.clone()),
            None => DedupKey::Composite {
                title: self.title.clone(),
                journal: self.journal.clone(),
                year: self.year,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_key_prefers_link() {
        let raw = RawRecord::new("A", "J", Some(2020), Some("https://doi.org/10.1/a".into()));
        assert_eq!(
            raw.dedup_key(),
            Some(DedupKey::Link("https://doi.org/10.1/a".into()))
        );
    }

    #[test]
    fn test_dedup_key_composite_without_link() {
        let raw = RawRecord::new("A", "J", None, Some(NO_LINK.into()));
        let key = raw.dedup_key().unwrap();
        assert!(matches!(key, DedupKey::Composite { year: None, .. }));
    }

    #[test]
    fn test_malformed_record_has_no_key() {
        let raw = RawRecord {
            title: Some("   ".into()),
            ..Default::default()
        };
        assert!(raw.dedup_key().is_none());
        assert!(Record::from_raw(&raw, Tier::Level1).is_none());
    }

    #[test]
    fn test_record_from_raw_defaults_journal() {
        let raw = RawRecord {
            title: Some("Graph minors".into()),
            ..Default::default()
        };
        let record = Record::from_raw(&raw, Tier::Unranked).unwrap();
        assert_eq!(record.journal, UNKNOWN_JOURNAL);
        assert_eq!(record.link_or_placeholder(), NO_LINK);
        assert_eq!(record.year_display(), "N/A");
    }

    #[test]
    fn test_record_key_matches_raw_key() {
        let raw = RawRecord::new("T", "J", Some(1999), None);
        let record = Record::from_raw(&raw, Tier::Level2).unwrap();
        assert_eq!(Some(record.dedup_key()), raw.dedup_key());
    }

    #[test]
    fn test_dedup_key_string_form() {
        let key = DedupKey::Composite {
            title: "T".into(),
            journal: "J".into(),
            year: Some(2001),
        };
        assert_eq!(DedupKey::parse(&key.to_string()), key);

        let link = DedupKey::Link("https://doi.org/x".into());
        assert_eq!(DedupKey::parse(&link.to_string()), link);
    }

    #[test]
    fn test_author_is_display_only() {
        let raw = RawRecord::new("T", "J", Some(2014), None).with_author("Erdős, Paul");
        let record = Record::from_raw(&raw, Tier::Level3).unwrap();
        assert_eq!(record.author.as_deref(), Some("Erdős, Paul"));
        assert_eq!(record.citation(), "Erdős, Paul - J, 2014");

        let anonymous = RawRecord::new("T", "J", Some(2014), None).with_author("  ");
        let other = Record::from_raw(&anonymous, Tier::Level3).unwrap();
        assert!(other.author.is_none());
        assert_eq!(other.citation(), "J, 2014");
        assert_eq!(record.dedup_key(), other.dedup_key());
    }
}
