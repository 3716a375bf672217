//! Aggregation driver - the fetch / classify / accumulate state machine
//!
//! One call to [`AggregationDriver::step`] performs at most one page fetch.
//! The session task loops over `step` until it reports [`Step::Done`].

use crate::progress::{ProgressSnapshot, RunOutcome, RunState, RunStatus};
use crate::{EngineConfig, SearchError};
use futures::stream::{self, StreamExt};
use snippy_domain::{DedupKey, PageFetcher, Query, RankingClassifier, RawRecord, Record};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Cooperative cancellation flag shared between a run and its controllers
///
/// Checked only between fetch steps.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Fresh, unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop after the in-flight fetch (idempotent)
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of one driver step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A page was fetched and processed
    Progress(ProgressSnapshot),
    /// The run is terminal (or was never started); nothing was fetched
    Done,
}

/// Orchestrates repeated page fetches for one query at a time
///
/// # Examples
///
/// ```
/// use snippy_engine::{AggregationDriver, EngineConfig, RunStatus, Step};
/// use snippy_providers::{ScriptedFetcher, StaticClassifier};
/// use snippy_domain::{Query, RawRecord};
/// use std::sync::Arc;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let fetcher = ScriptedFetcher::new()
///     .page(vec![RawRecord::new("Graph minors", "JCT B", Some(1983), None)], false);
/// let mut driver = AggregationDriver::new(
///     Arc::new(fetcher),
///     Arc::new(StaticClassifier::new()),
///     EngineConfig::default(),
/// );
///
/// driver.start_run(Query::new("graph minors", 10).unwrap()).unwrap();
/// while let Step::Progress(_) = driver.step().await {}
/// assert_eq!(driver.state().status, RunStatus::Completed);
/// assert_eq!(driver.records().len(), 1);
/// # });
/// ```
pub struct AggregationDriver<F, C> {
    fetcher: Arc<F>,
    classifier: Arc<C>,
    config: EngineConfig,
    query: Option<Query>,
    state: RunState,
    records: Vec<Record>,
    seen: HashSet<DedupKey>,
    pages: usize,
    cancel: CancelFlag,
}

impl<F, C> AggregationDriver<F, C>
where
    F: PageFetcher,
    C: RankingClassifier,
{
    /// Create an idle driver
    pub fn new(fetcher: Arc<F>, classifier: Arc<C>, config: EngineConfig) -> Self {
        Self {
            fetcher,
            classifier,
            config,
            query: None,
            state: RunState::default(),
            records: Vec::new(),
            seen: HashSet::new(),
            pages: 0,
            cancel: CancelFlag::new(),
        }
    }

    /// Begin a run, resetting all counters and the accumulated set
    ///
    /// # Errors
    ///
    /// - [`SearchError::Conflict`] while another run is active (no state change)
    /// - [`SearchError::Validation`] when the query exceeds the configured limit
    pub fn start_run(&mut self, query: Query) -> Result<(), SearchError> {
        if self.state.status.is_active() {
            return Err(SearchError::Conflict);
        }
        self.config.validate()?;
        query.check_limit(self.config.max_results_limit)?;

        info!(
            keywords = query.keywords(),
            max_results = query.max_results(),
            threshold = %query.tier_threshold(),
            source = self.fetcher.name(),
            "Search run started"
        );

        self.state = RunState {
            status: RunStatus::Running,
            ..RunState::default()
        };
        self.records.clear();
        self.seen.clear();
        self.pages = 0;
        self.cancel = CancelFlag::new();
        self.query = Some(query);
        Ok(())
    }

    /// Flag shared with the current run for cross-task cancellation
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Request cancellation of the current run
    ///
    /// Idempotent; has no effect on idle or terminal runs.
    pub fn request_cancel(&mut self) {
        if self.state.status == RunStatus::Running {
            self.cancel.request();
            self.state.status = RunStatus::Stopping;
            debug!("Cancellation requested");
        }
    }

    /// Current run state
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Accumulated set in insertion order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Query of the current or last run
    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    /// Final state and records; `None` before the first run
    pub fn outcome(&self) -> Option<RunOutcome> {
        let query = self.query.clone()?;
        Some(RunOutcome {
            query,
            state: self.state.clone(),
            records: self.records.clone(),
        })
    }

    /// Advance the run by at most one fetch
    pub async fn step(&mut self) -> Step {
        if self.cancel.is_requested() && self.state.status == RunStatus::Running {
            self.state.status = RunStatus::Stopping;
        }

        match self.state.status {
            RunStatus::Running => {}
            RunStatus::Stopping => {
                // Cancel seen before the next fetch was issued
                self.complete("cancelled");
                return Step::Done;
            }
            _ => return Step::Done,
        }

        let Some(query) = self.query.clone() else {
            return Step::Done;
        };

        if self.state.cumulative_count >= query.max_results() {
            self.complete("target reached");
            return Step::Done;
        }

        let offset = self.state.next_offset;
        let page = match self
            .fetcher
            .fetch_page(&query, offset, self.config.batch_size)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                let message = e.to_string();
                error!(
                    offset,
                    kept = self.records.len(),
                    error = %message,
                    "Page fetch failed"
                );
                self.state.last_error = Some(message);
                self.state.status = RunStatus::Failed;
                return Step::Done;
            }
        };
        self.pages += 1;

        let returned = page.records.len();
        let has_more = page.has_more;
        let capacity = query.max_results() - self.state.cumulative_count;
        let admitted = self.admit(&query, page.records, capacity);
        let classified = self.classify_all(admitted).await;

        for record in classified {
            if query.tier_threshold().qualifies(record.tier) {
                self.state.qualified_count += 1;
            }
            self.state.cumulative_count += 1;
            self.records.push(record);
        }
        self.state.next_offset += returned;

        debug!(
            page = self.pages,
            offset,
            returned,
            cumulative = self.state.cumulative_count,
            qualified = self.state.qualified_count,
            "Page processed"
        );

        if self.state.cumulative_count >= query.max_results() {
            self.complete("target reached");
        } else if query
            .target_qualified()
            .is_some_and(|target| self.state.qualified_count >= target)
        {
            self.complete("qualified target reached");
        } else if !has_more || returned == 0 {
            self.complete("source exhausted");
        } else if self.cancel.is_requested() {
            self.complete("cancelled");
        }

        Step::Progress(self.snapshot(&query))
    }

    /// Pick the raw records of a page that join the set
    ///
    /// Drops duplicates (against the set and earlier records of the same
    /// page), malformed records and records outside the year range, and
    /// stops once `capacity` records are admitted.
    fn admit(&mut self, query: &Query, raw: Vec<RawRecord>, capacity: usize) -> Vec<RawRecord> {
        let mut admitted = Vec::new();
        for record in raw {
            if admitted.len() >= capacity {
                break;
            }
            let Some(key) = record.dedup_key() else {
                warn!("Skipping record without a title");
                continue;
            };
            if !query.accepts_year(record.year) {
                debug!(year = ?record.year, "Skipping record outside year range");
                continue;
            }
            if !self.seen.insert(key) {
                continue;
            }
            admitted.push(record);
        }
        admitted
    }

    /// Classify a page's admitted records, preserving their order
    async fn classify_all(&self, admitted: Vec<RawRecord>) -> Vec<Record> {
        let classifier = &self.classifier;
        stream::iter(admitted)
            .map(|raw| async move {
                let tier = classifier.classify(raw.journal_or_unknown()).await;
                Record::from_raw(&raw, tier)
            })
            .buffered(self.config.classify_concurrency.max(1))
            .filter_map(|record| async move { record })
            .collect()
            .await
    }

    fn complete(&mut self, reason: &str) {
        self.state.status = RunStatus::Completed;
        info!(
            reason,
            cumulative = self.state.cumulative_count,
            qualified = self.state.qualified_count,
            "Search run completed"
        );
    }

    fn snapshot(&self, query: &Query) -> ProgressSnapshot {
        ProgressSnapshot {
            status: self.state.status,
            cumulative: self.state.cumulative_count,
            qualified: self.state.qualified_count,
            max_results: query.max_results(),
            next_offset: self.state.next_offset,
            page: self.pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snippy_domain::{Tier, TierThreshold, YearRange};
    use snippy_providers::{ScriptedFetcher, StaticClassifier};

    fn raw(i: usize, journal: &str) -> RawRecord {
        RawRecord::new(
            format!("Paper {}", i),
            journal,
            Some(2020),
            Some(format!("https://doi.org/10.1000/{}", i)),
        )
    }

    fn page(range: std::ops::Range<usize>) -> Vec<RawRecord> {
        range.map(|i| raw(i, if i % 2 == 0 { "Even" } else { "Odd" })).collect()
    }

    fn classifier() -> StaticClassifier {
        StaticClassifier::new()
            .with("Even", Tier::Level3)
            .with("Odd", Tier::Level1)
    }

    fn driver(fetcher: ScriptedFetcher) -> AggregationDriver<ScriptedFetcher, StaticClassifier> {
        AggregationDriver::new(Arc::new(fetcher), Arc::new(classifier()), EngineConfig::default())
    }

    async fn run(driver: &mut AggregationDriver<ScriptedFetcher, StaticClassifier>) -> Vec<ProgressSnapshot> {
        let mut snapshots = Vec::new();
        while let Step::Progress(snapshot) = driver.step().await {
            snapshots.push(snapshot);
        }
        snapshots
    }

    #[tokio::test]
    async fn test_duplicates_across_pages_are_dropped() {
        // Scenario: 20 new, then 5 new + 15 repeats, then exhausted
        let mut second = page(20..25);
        second.extend(page(5..20));
        let fetcher = ScriptedFetcher::new()
            .page(page(0..20), true)
            .page(second, true)
            .page(Vec::new(), false);
        let mut driver = driver(fetcher.clone());

        let query = Query::new("graph theory", 25)
            .unwrap()
            .with_threshold(TierThreshold::Levels23);
        driver.start_run(query).unwrap();
        run(&mut driver).await;

        let state = driver.state();
        assert_eq!(state.status, RunStatus::Completed);
        assert!(state.last_error.is_none());
        assert!((21..=25).contains(&state.cumulative_count));
        assert_eq!(driver.records().len(), state.cumulative_count);

        let keys: HashSet<_> = driver.records().iter().map(|r| r.dedup_key()).collect();
        assert_eq!(keys.len(), driver.records().len());
    }

    #[tokio::test]
    async fn test_provider_error_keeps_first_page() {
        let fetcher = ScriptedFetcher::new()
            .page(page(0..20), true)
            .fail("503 Service Unavailable");
        let mut driver = driver(fetcher);

        driver.start_run(Query::new("graph theory", 25).unwrap()).unwrap();
        let snapshots = run(&mut driver).await;

        assert_eq!(snapshots.len(), 1);
        let state = driver.state();
        assert_eq!(state.status, RunStatus::Failed);
        assert!(state.last_error.as_deref().unwrap().contains("503"));
        assert_eq!(driver.records().len(), 20);
        assert_eq!(driver.records()[0].title, "Paper 0");
    }

    #[tokio::test]
    async fn test_stops_at_max_results() {
        let fetcher = ScriptedFetcher::new()
            .page(page(0..20), true)
            .page(page(20..40), true)
            .page(page(40..60), true);
        let mut driver = driver(fetcher.clone());

        driver.start_run(Query::new("x", 30).unwrap()).unwrap();
        let snapshots = run(&mut driver).await;

        assert_eq!(driver.records().len(), 30);
        assert_eq!(driver.state().status, RunStatus::Completed);
        assert_eq!(fetcher.call_count(), 2);
        assert_eq!(fetcher.calls(), vec![(0, 20), (20, 20)]);
        assert_eq!(snapshots.last().unwrap().percent(), 100);
    }

    #[tokio::test]
    async fn test_empty_first_page_completes_empty() {
        let mut driver = driver(ScriptedFetcher::new().page(Vec::new(), false));
        driver.start_run(Query::new("x", 10).unwrap()).unwrap();
        let snapshots = run(&mut driver).await;

        assert_eq!(snapshots.len(), 1);
        assert_eq!(driver.state().status, RunStatus::Completed);
        assert!(driver.records().is_empty());
    }

    #[tokio::test]
    async fn test_empty_page_with_more_flag_is_exhausted() {
        let fetcher = ScriptedFetcher::new()
            .page(page(0..5), true)
            .page(Vec::new(), true)
            .page(page(5..10), true);
        let mut driver = driver(fetcher.clone());
        driver.start_run(Query::new("x", 50).unwrap()).unwrap();
        let snapshots = run(&mut driver).await;

        assert_eq!(snapshots.len(), 2);
        assert_eq!(driver.state().status, RunStatus::Completed);
        assert_eq!(driver.records().len(), 5);
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_first_page_with_more_flag_is_exhausted() {
        let fetcher = ScriptedFetcher::new()
            .page(Vec::new(), true)
            .page(page(0..5), false);
        let mut driver = driver(fetcher.clone());
        driver.start_run(Query::new("x", 10).unwrap()).unwrap();
        run(&mut driver).await;

        assert_eq!(driver.state().status, RunStatus::Completed);
        assert!(driver.records().is_empty());
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_qualified_target_stops_early() {
        let fetcher = ScriptedFetcher::new()
            .page(page(0..20), true)
            .page(page(20..40), true);
        let mut driver = driver(fetcher.clone());

        let query = Query::new("x", 100)
            .unwrap()
            .with_threshold(TierThreshold::Level3Only)
            .with_target_qualified(Some(5))
            .unwrap();
        driver.start_run(query).unwrap();
        run(&mut driver).await;

        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(driver.state().qualified_count, 10);
        assert_eq!(driver.state().status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancel_between_steps() {
        let fetcher = ScriptedFetcher::new()
            .page(page(0..20), true)
            .page(page(20..40), true);
        let mut driver = driver(fetcher.clone());

        driver.start_run(Query::new("x", 100).unwrap()).unwrap();
        assert!(matches!(driver.step().await, Step::Progress(_)));
        driver.request_cancel();
        driver.request_cancel();
        assert_eq!(driver.state().status, RunStatus::Stopping);
        assert_eq!(driver.step().await, Step::Done);

        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(driver.state().status, RunStatus::Completed);
        assert_eq!(driver.records().len(), 20);
    }

    #[tokio::test]
    async fn test_cancel_during_fetch_keeps_page() {
        let flag_slot: Arc<std::sync::Mutex<Option<CancelFlag>>> = Arc::default();
        let slot = flag_slot.clone();
        let fetcher = ScriptedFetcher::new()
            .page(page(0..20), true)
            .page(page(20..40), true)
            .on_fetch(move |i| {
                if i == 0 {
                    if let Some(flag) = slot.lock().unwrap().as_ref() {
                        flag.request();
                    }
                }
            });
        let mut driver = driver(fetcher.clone());
        driver.start_run(Query::new("x", 100).unwrap()).unwrap();
        *flag_slot.lock().unwrap() = Some(driver.cancel_flag());

        let snapshots = run(&mut driver).await;
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].status, RunStatus::Completed);
        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(driver.records().len(), 20);
    }

    #[tokio::test]
    async fn test_malformed_and_out_of_range_records_skipped() {
        let records = vec![
            RawRecord {
                title: None,
                journal: Some("Even".into()),
                ..Default::default()
            },
            RawRecord::new("Old", "Even", Some(1990), None),
            RawRecord::new("Undated", "Even", None, None),
            RawRecord::new("Fits", "Even", Some(2012), None),
            RawRecord::new("Fits", "Even", Some(2012), None),
        ];
        let mut driver = driver(ScriptedFetcher::new().page(records, false));
        let query = Query::new("x", 10)
            .unwrap()
            .with_year_range(Some(YearRange::new(2010, 2015).unwrap()));
        driver.start_run(query).unwrap();
        run(&mut driver).await;

        assert_eq!(driver.records().len(), 1);
        assert_eq!(driver.records()[0].title, "Fits");
        assert_eq!(driver.state().next_offset, 5);
    }

    #[tokio::test]
    async fn test_conflict_and_restart() {
        let fetcher = ScriptedFetcher::new()
            .page(page(0..3), false)
            .page(page(100..102), false);
        let mut driver = driver(fetcher);

        driver.start_run(Query::new("first", 10).unwrap()).unwrap();
        let err = driver.start_run(Query::new("second", 10).unwrap()).unwrap_err();
        assert!(matches!(err, SearchError::Conflict));
        assert_eq!(driver.query().unwrap().keywords(), "first");

        run(&mut driver).await;
        assert_eq!(driver.records().len(), 3);

        driver.start_run(Query::new("second", 10).unwrap()).unwrap();
        assert_eq!(driver.state().cumulative_count, 0);
        run(&mut driver).await;
        assert_eq!(driver.records().len(), 2);
        assert_eq!(driver.records()[0].title, "Paper 100");
    }

    #[tokio::test]
    async fn test_limit_is_validation_error() {
        let mut driver = driver(ScriptedFetcher::new());
        let err = driver.start_run(Query::new("x", 5000).unwrap()).unwrap_err();
        assert!(matches!(err, SearchError::Validation(_)));
        assert_eq!(driver.state().status, RunStatus::Idle);
    }

    #[tokio::test]
    async fn test_counts_are_monotonic() {
        let fetcher = ScriptedFetcher::new()
            .page(page(0..20), true)
            .page(page(10..30), true)
            .page(page(30..35), false);
        let mut driver = driver(fetcher);
        driver.start_run(Query::new("x", 50).unwrap()).unwrap();
        let snapshots = run(&mut driver).await;

        for pair in snapshots.windows(2) {
            assert!(pair[0].cumulative <= pair[1].cumulative);
            assert!(pair[0].qualified <= pair[1].qualified);
        }
        for s in &snapshots {
            assert!(s.qualified <= s.cumulative);
        }
        assert_eq!(driver.state().cumulative_count, 35);
    }
}
