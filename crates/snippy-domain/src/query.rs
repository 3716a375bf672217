//! Query module - validated search parameters for one aggregation run

use crate::TierThreshold;
use std::fmt;

/// Year used as an open upper bound ("2015 onwards")
pub const OPEN_END_YEAR: i32 = 9999;

/// Reasons a query is rejected before a run starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Keywords were empty or whitespace
    EmptyKeywords,
    /// Requested result count was zero or negative
    NonPositiveMaxResults(i64),
    /// Requested result count exceeds the configured limit
    MaxResultsTooLarge {
        /// Requested count
        requested: i64,
        /// Configured limit
        limit: usize,
    },
    /// Year range with start after end
    InvertedYearRange {
        /// Start year
        start: i32,
        /// End year
        end: i32,
    },
    /// Year range string could not be parsed
    MalformedYearRange(String),
    /// Qualified-count target was zero
    ZeroQualifiedTarget,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::EmptyKeywords => write!(f, "keywords must not be empty"),
            QueryError::NonPositiveMaxResults(n) => {
                write!(f, "max results must be positive, got {}", n)
            }
            QueryError::MaxResultsTooLarge { requested, limit } => {
                write!(f, "max results {} exceeds the limit of {}", requested, limit)
            }
            QueryError::InvertedYearRange { start, end } => {
                write!(f, "year range start {} is after end {}", start, end)
            }
            QueryError::MalformedYearRange(s) => write!(f, "malformed year range: '{}'", s),
            QueryError::ZeroQualifiedTarget => write!(f, "qualified target must be positive"),
        }
    }
}

impl std::error::Error for QueryError {}

/// Inclusive publication year range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    start: i32,
    end: i32,
}

impl YearRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: i32, end: i32) -> Result<Self, QueryError> {
        if start > end {
            return Err(QueryError::InvertedYearRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range with no upper bound
    pub fn since(start: i32) -> Self {
        Self {
            start,
            end: OPEN_END_YEAR.max(start),
        }
    }

    /// First year included
    pub fn start(&self) -> i32 {
        self.start
    }

    /// Last year included
    pub fn end(&self) -> i32 {
        self.end
    }

    /// Whether the upper bound is open
    pub fn is_open_ended(&self) -> bool {
        self.end >= OPEN_END_YEAR
    }

    /// Whether a year lies inside the range
    pub fn contains(&self, year: i32) -> bool {
        year >= self.start && year <= self.end
    }

    /// Parse `all`, `A-B`, `A-` or `A-9999`
    ///
    /// `all` yields `Ok(None)`.
    pub fn parse(s: &str) -> Result<Option<Self>, QueryError> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(None);
        }

        let malformed = || QueryError::MalformedYearRange(s.to_string());
        let (start, end) = s.split_once('-').ok_or_else(malformed)?;
        let start: i32 = start.trim().parse().map_err(|_| malformed())?;
        let end = end.trim();
        if end.is_empty() {
            return Ok(Some(Self::since(start)));
        }
        let end: i32 = end.parse().map_err(|_| malformed())?;
        Self::new(start, end).map(Some)
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_open_ended() {
            write!(f, "{}-", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Validated search parameters
///
/// A query is immutable once built; every constructor enforces the
/// validation rules, so a `Query` value is always runnable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    keywords: String,
    max_results: usize,
    year_range: Option<YearRange>,
    tier_threshold: TierThreshold,
    target_qualified: Option<usize>,
}

impl Query {
    /// Create a query with the default threshold and no year range
    ///
    /// # Examples
    ///
    /// ```
    /// use snippy_domain::Query;
    ///
    /// let query = Query::new("graph theory", 25).unwrap();
    /// assert_eq!(query.max_results(), 25);
    /// assert!(Query::new("  ", 25).is_err());
    /// assert!(Query::new("graph theory", 0).is_err());
    /// ```
    pub fn new(keywords: impl Into<String>, max_results: i64) -> Result<Self, QueryError> {
        let keywords = keywords.into().trim().to_string();
        if keywords.is_empty() {
            return Err(QueryError::EmptyKeywords);
        }
        if max_results <= 0 {
            return Err(QueryError::NonPositiveMaxResults(max_results));
        }
        let max_results =
            usize::try_from(max_results).map_err(|_| QueryError::NonPositiveMaxResults(max_results))?;

        Ok(Self {
            keywords,
            max_results,
            year_range: None,
            tier_threshold: TierThreshold::default(),
            target_qualified: None,
        })
    }

    /// Restrict results to a publication year range
    pub fn with_year_range(mut self, year_range: Option<YearRange>) -> Self {
        self.year_range = year_range;
        self
    }

    /// Set the qualification threshold
    pub fn with_threshold(mut self, threshold: TierThreshold) -> Self {
        self.tier_threshold = threshold;
        self
    }

    /// Stop once this many qualified records have been collected
    pub fn with_target_qualified(mut self, target: Option<usize>) -> Result<Self, QueryError> {
        if target == Some(0) {
            return Err(QueryError::ZeroQualifiedTarget);
        }
        self.target_qualified = target;
        Ok(self)
    }

    /// Reject queries asking for more than `limit` results
    pub fn check_limit(&self, limit: usize) -> Result<(), QueryError> {
        if self.max_results > limit {
            return Err(QueryError::MaxResultsTooLarge {
                requested: self.max_results as i64,
                limit,
            });
        }
        Ok(())
    }

    /// Search keywords (trimmed)
    pub fn keywords(&self) -> &str {
        &self.keywords
    }

    /// Target number of records
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Optional publication year range
    pub fn year_range(&self) -> Option<YearRange> {
        self.year_range
    }

    /// Qualification threshold
    pub fn tier_threshold(&self) -> TierThreshold {
        self.tier_threshold
    }

    /// Optional qualified-count stop target
    pub fn target_qualified(&self) -> Option<usize> {
        self.target_qualified
    }

    /// Whether a record year passes the year filter
    ///
    /// Unknown years are excluded once a range is set.
    pub fn accepts_year(&self, year: Option<i32>) -> bool {
        match (self.year_range, year) {
            (None, _) => true,
            (Some(range), Some(year)) => range.contains(year),
            (Some(_), None) => false,
        }
    }
}
