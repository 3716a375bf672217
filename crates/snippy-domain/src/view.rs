//! Result view - sort and filter projections over an accumulated record set
//!
//! Everything here is read-only with respect to the record set: projections
//! are expressed as index orders or borrowed slices, never as mutations.

use crate::{Record, Tier, TierThreshold};
use std::cmp::Ordering;
use std::fmt;

/// Which records a filter keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TierSelector {
    /// Keep everything
    #[default]
    All,
    /// Keep records of exactly this tier
    Tier(Tier),
    /// Keep records that satisfy the active threshold
    AnyQualified,
    /// Keep unranked records
    Unranked,
}

impl TierSelector {
    /// Whether a tier passes this selector under `threshold`
    pub fn matches(&self, tier: Tier, threshold: TierThreshold) -> bool {
        match self {
            TierSelector::All => true,
            TierSelector::Tier(wanted) => tier == *wanted,
            TierSelector::AnyQualified => threshold.qualifies(tier),
            TierSelector::Unranked => tier == Tier::Unranked,
        }
    }

    /// Parse `all`, `qualified`, `unranked`, or a tier level
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "all" | "*" => Ok(TierSelector::All),
            "qualified" | "any" => Ok(TierSelector::AnyQualified),
            "unranked" => Ok(TierSelector::Unranked),
            other => match Tier::parse(other) {
                Some(Tier::Unranked) => Ok(TierSelector::Unranked),
                Some(tier) => Ok(TierSelector::Tier(tier)),
                None => Err(format!("Invalid tier filter: {}", s)),
            },
        }
    }
}

impl fmt::Display for TierSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TierSelector::All => f.write_str("all"),
            TierSelector::Tier(tier) => write!(f, "{}", tier),
            TierSelector::AnyQualified => f.write_str("qualified"),
            TierSelector::Unranked => f.write_str("unranked"),
        }
    }
}

impl std::str::FromStr for TierSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Sortable column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Article title, case-sensitive
    Title,
    /// Journal name, case-sensitive
    Journal,
    /// Publication year, unknown lowest
    Year,
    /// Tier ordinal, unranked lowest
    Tier,
}

impl SortKey {
    /// Column name
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Title => "title",
            SortKey::Journal => "journal",
            SortKey::Year => "year",
            SortKey::Tier => "tier",
        }
    }

    /// Parse a column name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "title" => Some(SortKey::Title),
            "journal" => Some(SortKey::Journal),
            "year" => Some(SortKey::Year),
            "tier" | "level" => Some(SortKey::Tier),
            _ => None,
        }
    }

    /// Compare two records by this column
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        match self {
            SortKey::Title => a.title.cmp(&b.title),
            SortKey::Journal => a.journal.cmp(&b.journal),
            // None < Some(_), so unknown years sort lowest
            SortKey::Year => a.year.cmp(&b.year),
            SortKey::Tier => a.tier.cmp(&b.tier),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid sort column: {}", s))
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

impl SortDirection {
    /// The opposite direction
    pub fn toggled(&self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Active sort column and direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    /// Column
    pub key: SortKey,
    /// Direction
    pub direction: SortDirection,
}

impl SortState {
    /// State after the user sorts by `key`
    ///
    /// The same column toggles direction; a different column starts ascending.
    pub fn next(current: Option<SortState>, key: SortKey) -> SortState {
        match current {
            Some(state) if state.key == key => SortState {
                key,
                direction: state.direction.toggled(),
            },
            _ => SortState {
                key,
                direction: SortDirection::Ascending,
            },
        }
    }
}

/// Records matching `selector`, in their original order
pub fn filter_records<'a>(
    records: &'a [Record],
    selector: TierSelector,
    threshold: TierThreshold,
) -> Vec<&'a Record> {
    records
        .iter()
        .filter(|r| selector.matches(r.tier, threshold))
        .collect()
}

/// A new ordering of `records` by `key`
///
/// Ascending is a stable sort. Descending is the exact reverse of the
/// ascending order of the same input.
pub fn sort_records<'a>(
    records: &[&'a Record],
    key: SortKey,
    direction: SortDirection,
) -> Vec<&'a Record> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| key.compare(a, b));
    if direction == SortDirection::Descending {
        sorted.reverse();
    }
    sorted
}

/// Index-based variant of [`sort_records`] over `order`
pub fn sort_indices(
    records: &[Record],
    order: &[usize],
    key: SortKey,
    direction: SortDirection,
) -> Vec<usize> {
    let mut sorted = order.to_vec();
    sorted.sort_by(|&a, &b| key.compare(&records[a], &records[b]));
    if direction == SortDirection::Descending {
        sorted.reverse();
    }
    sorted
}

/// Ranked ordering: highest tier first, then newest year
///
/// Stable, so records that tie on both keep their relative order. Unranked
/// records and unknown years sort last.
pub fn ranked_indices(records: &[Record], order: &[usize]) -> Vec<usize> {
    let mut ranked = order.to_vec();
    ranked.sort_by(|&a, &b| rank_compare(&records[a], &records[b]));
    ranked
}

/// Records in ranked order, see [`ranked_indices`]
pub fn rank_records(records: &[Record]) -> Vec<Record> {
    let mut ranked = records.to_vec();
    ranked.sort_by(rank_compare);
    ranked
}

fn rank_compare(a: &Record, b: &Record) -> Ordering {
    b.tier.cmp(&a.tier).then_with(|| b.year.cmp(&a.year))
}

/// Stateful sort/filter projection for a browsing session
///
/// Holds an index order over an append-only record set together with the
/// current sort state and filter. The record set itself is passed in on
/// every call and never modified.
#[derive(Debug, Clone)]
pub struct ResultView {
    order: Vec<usize>,
    sort: Option<SortState>,
    selector: TierSelector,
    threshold: TierThreshold,
}

impl ResultView {
    /// Empty view using `threshold` for the "any qualified" selector
    pub fn new(threshold: TierThreshold) -> Self {
        Self {
            order: Vec::new(),
            sort: None,
            selector: TierSelector::All,
            threshold,
        }
    }

    /// View over an existing record set in insertion order
    pub fn over(records: &[Record], threshold: TierThreshold) -> Self {
        let mut view = Self::new(threshold);
        view.sync(records);
        view
    }

    /// View over an existing record set in ranked order
    pub fn ranked(records: &[Record], threshold: TierThreshold) -> Self {
        let mut view = Self::new(threshold);
        view.rank(records);
        view
    }

    /// Pick up records appended since the last call
    ///
    /// New records join at the end; an active sort is re-applied without
    /// changing its direction. Rows that tie keep their current order.
    pub fn sync(&mut self, records: &[Record]) {
        if records.len() < self.order.len() {
            // Set was replaced rather than appended to
            self.order = (0..records.len()).collect();
        } else {
            self.order.extend(self.order.len()..records.len());
        }
        if let Some(state) = self.sort {
            self.order.sort_by(|&a, &b| match state.direction {
                SortDirection::Ascending => state.key.compare(&records[a], &records[b]),
                SortDirection::Descending => state.key.compare(&records[b], &records[a]),
            });
        }
    }

    /// Sort by a column, toggling direction when it is already active
    ///
    /// Toggling reverses the current order, so ties come out reversed too.
    pub fn sort_by(&mut self, records: &[Record], key: SortKey) -> SortState {
        self.sync(records);
        let state = SortState::next(self.sort, key);
        match self.sort {
            Some(current) if current.key == key => self.order.reverse(),
            _ => self.order = sort_indices(records, &self.order, state.key, state.direction),
        }
        self.sort = Some(state);
        state
    }

    /// Change the tier filter
    pub fn set_filter(&mut self, selector: TierSelector) {
        self.selector = selector;
    }

    /// Drop sorting and switch to ranked order
    pub fn rank(&mut self, records: &[Record]) {
        self.sort = None;
        let all: Vec<usize> = (0..records.len()).collect();
        self.order = ranked_indices(records, &all);
    }

    /// Drop sorting and return to insertion order
    pub fn reset_order(&mut self) {
        self.sort = None;
        let len = self.order.len();
        self.order = (0..len).collect();
    }

    /// Current sort state
    pub fn sort_state(&self) -> Option<SortState> {
        self.sort
    }

    /// Current filter
    pub fn filter(&self) -> TierSelector {
        self.selector
    }

    /// Threshold used by the "any qualified" selector
    pub fn threshold(&self) -> TierThreshold {
        self.threshold
    }

    /// Visible rows in display order
    pub fn rows<'a>(&self, records: &'a [Record]) -> Vec<&'a Record> {
        self.order
            .iter()
            .filter_map(|&i| records.get(i))
            .filter(|r| self.selector.matches(r.tier, self.threshold))
            .collect()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_record() -> impl Strategy<Value = Record> {
        ("[a-cA-C]{1,2}", prop::option::of(1990i32..1995), 0u8..4).prop_map(|(title, year, level)| {
            Record {
                journal: format!("J{}", title.len()),
                link: None,
                title,
                year,
                tier: Tier::from_level(level),
                author: None,
            }
        })
    }

    proptest! {
        /// Property: filtering yields exactly the matching subsequence, in order
        #[test]
        fn test_filter_is_ordered_subsequence(records in prop::collection::vec(arb_record(), 0..30), level in 0u8..4) {
            let tier = Tier::from_level(level);
            let rows = filter_records(&records, TierSelector::Tier(tier), TierThreshold::default());
            let expected: Vec<&Record> = records.iter().filter(|r| r.tier == tier).collect();
            prop_assert_eq!(rows, expected);
        }

        /// Property: ascending sort is stable
        #[test]
        fn test_ascending_sort_is_stable(records in prop::collection::vec(arb_record(), 0..30)) {
            let order: Vec<usize> = (0..records.len()).collect();
            let sorted = sort_indices(&records, &order, SortKey::Year, SortDirection::Ascending);
            for pair in sorted.windows(2) {
                let (a, b) = (&records[pair[0]], &records[pair[1]]);
                prop_assert!(a.year <= b.year);
                if a.year == b.year {
                    prop_assert!(pair[0] < pair[1]);
                }
            }
        }

        /// Property: descending is the reverse of ascending over the same input
        #[test]
        fn test_descending_reverses_ascending(records in prop::collection::vec(arb_record(), 0..30)) {
            let all: Vec<&Record> = records.iter().collect();
            let mut asc = sort_records(&all, SortKey::Tier, SortDirection::Ascending);
            let desc = sort_records(&all, SortKey::Tier, SortDirection::Descending);
            asc.reverse();
            prop_assert_eq!(asc, desc);
        }

        /// Property: views never change the underlying set
        #[test]
        fn test_view_does_not_mutate(records in prop::collection::vec(arb_record(), 0..30)) {
            let before = records.clone();
            let mut view = ResultView::over(&records, TierThreshold::default());
            view.sort_by(&records, SortKey::Title);
            view.set_filter(TierSelector::AnyQualified);
            let rows = view.rows(&records);
            prop_assert!(rows.len() <= records.len());
            prop_assert_eq!(before, records);
        }
    }
}
