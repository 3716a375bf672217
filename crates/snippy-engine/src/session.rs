//! Session controller - runs the driver as a background task
//!
//! A session allows one active run at a time. Each run is a single tokio
//! task that loops over [`AggregationDriver::step`] and reports progress
//! over a bounded channel.

use crate::driver::{AggregationDriver, CancelFlag, Step};
use crate::progress::{RunEvent, RunOutcome};
use crate::{EngineConfig, SearchError};
use snippy_domain::{PageFetcher, Query, RankingClassifier};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Clears the session's active flag when dropped
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Starts aggregation runs and enforces one active run per session
///
/// # Examples
///
/// ```no_run
/// use snippy_engine::{EngineConfig, RunEvent, SessionController};
/// use snippy_providers::{CrossrefFetcher, JufoClassifier, ProvidersConfig};
/// use snippy_domain::Query;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let providers = ProvidersConfig::default();
///     let session = SessionController::new(
///         CrossrefFetcher::new(&providers.crossref)?,
///         JufoClassifier::new(&providers.jufo)?,
///         EngineConfig::default(),
///     );
///
///     let mut handle = session.start_run(Query::new("graph theory", 25)?)?;
///     while let Some(event) = handle.next_event().await {
///         if let RunEvent::Progress(p) = event {
///             println!("{}%", p.percent());
///         }
///     }
///     let outcome = handle.finish().await?;
///     println!("{}", outcome.summary());
///     Ok(())
/// }
/// ```
pub struct SessionController<F, C> {
    fetcher: Arc<F>,
    classifier: Arc<C>,
    config: EngineConfig,
    active: Arc<AtomicBool>,
}

impl<F, C> SessionController<F, C>
where
    F: PageFetcher + 'static,
    C: RankingClassifier + 'static,
{
    /// Create a session over a fetcher and classifier
    pub fn new(fetcher: F, classifier: C, config: EngineConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            classifier: Arc::new(classifier),
            config,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether a run is currently active
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Validate `query` and start a run in the background
    ///
    /// # Errors
    ///
    /// - [`SearchError::Validation`] or [`SearchError::Config`] for bad input
    /// - [`SearchError::Conflict`] when a run is already active
    ///
    /// Neither error changes any state.
    pub fn start_run(&self, query: Query) -> Result<RunHandle, SearchError> {
        self.config.validate()?;
        query.check_limit(self.config.max_results_limit)?;

        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(keywords = query.keywords(), "Rejected start while a run is active");
            return Err(SearchError::Conflict);
        }
        let guard = ActiveGuard(self.active.clone());

        let mut driver = AggregationDriver::new(
            self.fetcher.clone(),
            self.classifier.clone(),
            self.config.clone(),
        );
        driver.start_run(query.clone())?;
        let cancel = driver.cancel_flag();

        let (tx, rx) = mpsc::channel(self.config.progress_buffer);
        let task = tokio::spawn(drive(driver, query, tx, guard));

        Ok(RunHandle {
            events: rx,
            cancel,
            task,
        })
    }
}

/// Loop the driver to a terminal state, forwarding progress
async fn drive<F, C>(
    mut driver: AggregationDriver<F, C>,
    query: Query,
    events: mpsc::Sender<RunEvent>,
    guard: ActiveGuard,
) -> RunOutcome
where
    F: PageFetcher,
    C: RankingClassifier,
{
    while let Step::Progress(snapshot) = driver.step().await {
        // A dropped receiver only means nobody is watching
        let _ = events.send(RunEvent::Progress(snapshot)).await;
    }

    let outcome = driver.outcome().unwrap_or_else(|| RunOutcome {
        query,
        state: driver.state().clone(),
        records: Vec::new(),
    });

    // Session is free again before the consumer sees the final event
    drop(guard);
    let _ = events
        .send(RunEvent::Finished {
            status: outcome.state.status,
            last_error: outcome.state.last_error.clone(),
        })
        .await;

    outcome
}

/// Handle to one background run
pub struct RunHandle {
    events: mpsc::Receiver<RunEvent>,
    cancel: CancelFlag,
    task: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// Next progress or final event; `None` after `Finished`
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    /// Ask the run to stop after its in-flight fetch
    ///
    /// Idempotent, and a no-op once the run is terminal.
    pub fn request_cancel(&self) {
        self.cancel.request();
    }

    /// Cancellation flag, for signal handlers
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Wait for the run to end and return its outcome
    ///
    /// Unread events are discarded.
    pub async fn finish(self) -> Result<RunOutcome, SearchError> {
        let RunHandle { events, task, .. } = self;
        drop(events);
        task.await.map_err(|e| SearchError::Worker(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::RunStatus;
    use snippy_domain::{RawRecord, Tier, TierThreshold};
    use snippy_providers::{ScriptedFetcher, StaticClassifier};

    fn page(range: std::ops::Range<usize>, journal: &str) -> Vec<RawRecord> {
        range
            .map(|i| {
                RawRecord::new(
                    format!("Paper {}", i),
                    journal,
                    Some(2021),
                    Some(format!("https://doi.org/10.1/{}", i)),
                )
            })
            .collect()
    }

    fn session(fetcher: ScriptedFetcher) -> SessionController<ScriptedFetcher, StaticClassifier> {
        let classifier = StaticClassifier::new()
            .with("Top", Tier::Level3)
            .with("Mid", Tier::Level2)
            .with("Low", Tier::Level1);
        SessionController::new(fetcher, classifier, EngineConfig::default())
    }

    async fn collect(handle: &mut RunHandle) -> Vec<RunEvent> {
        let mut events = Vec::new();
        while let Some(event) = handle.next_event().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_events_end_with_finished() {
        let fetcher = ScriptedFetcher::new()
            .page(page(0..20, "Top"), true)
            .page(page(20..25, "Low"), false);
        let session = session(fetcher);

        let query = Query::new("graph theory", 25)
            .unwrap()
            .with_threshold(TierThreshold::Levels23);
        let mut handle = session.start_run(query).unwrap();
        let events = collect(&mut handle).await;

        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], RunEvent::Progress(p) if p.cumulative == 20 && p.qualified == 20));
        assert!(matches!(events[1], RunEvent::Progress(p) if p.cumulative == 25 && p.percent() == 100));
        assert_eq!(
            events[2],
            RunEvent::Finished {
                status: RunStatus::Completed,
                last_error: None
            }
        );

        let outcome = handle.finish().await.unwrap();
        assert_eq!(outcome.records.len(), 25);
        assert_eq!(outcome.state.qualified_count, 20);
        assert!(!session.is_running());
    }

    #[tokio::test]
    async fn test_failed_run_reports_error() {
        let fetcher = ScriptedFetcher::new()
            .page(page(0..20, "Mid"), true)
            .fail("connection reset");
        let session = session(fetcher);

        let mut handle = session.start_run(Query::new("x", 25).unwrap()).unwrap();
        let events = collect(&mut handle).await;
        match events.last() {
            Some(RunEvent::Finished { status, last_error }) => {
                assert_eq!(*status, RunStatus::Failed);
                assert!(last_error.as_deref().unwrap().contains("connection reset"));
            }
            other => panic!("unexpected final event: {:?}", other),
        }

        let outcome = handle.finish().await.unwrap();
        assert_eq!(outcome.records.len(), 20);
        assert!(outcome.is_saveable());
    }

    #[tokio::test]
    async fn test_concurrent_start_is_rejected() {
        let fetcher = ScriptedFetcher::new()
            .page(page(0..20, "Top"), true)
            .page(page(20..40, "Top"), false);
        let session = session(fetcher);

        let handle = session.start_run(Query::new("first", 40).unwrap()).unwrap();
        let err = session
            .start_run(Query::new("second", 40).unwrap())
            .err()
            .unwrap();
        assert!(matches!(err, SearchError::Conflict));

        let outcome = handle.finish().await.unwrap();
        assert_eq!(outcome.query.keywords(), "first");
        assert_eq!(outcome.records.len(), 40);

        // Free again once the first run is done
        let handle = session.start_run(Query::new("third", 5).unwrap()).unwrap();
        let outcome = handle.finish().await.unwrap();
        assert_eq!(outcome.query.keywords(), "third");
        assert!(outcome.records.is_empty());
    }

    #[tokio::test]
    async fn test_validation_does_not_occupy_session() {
        let session = session(ScriptedFetcher::new());
        let err = session.start_run(Query::new("x", 5000).unwrap()).err().unwrap();
        assert!(matches!(err, SearchError::Validation(_)));
        assert!(!session.is_running());
    }

    #[tokio::test]
    async fn test_cancel_stops_further_fetches() {
        let fetcher = ScriptedFetcher::new()
            .page(page(0..20, "Top"), true)
            .page(page(20..40, "Top"), true)
            .page(page(40..60, "Top"), true);
        let session = session(fetcher.clone());

        let mut handle = session.start_run(Query::new("x", 60).unwrap()).unwrap();
        let first = handle.next_event().await.unwrap();
        assert!(matches!(first, RunEvent::Progress(_)));
        handle.request_cancel();
        handle.request_cancel();

        let rest = collect(&mut handle).await;
        let outcome = handle.finish().await.unwrap();

        assert_eq!(outcome.status(), RunStatus::Completed);
        assert!(matches!(rest.last(), Some(RunEvent::Finished { status: RunStatus::Completed, .. })));
        // Cancel may land while the second fetch is in flight, never later
        assert!(fetcher.call_count() <= 2);
        assert_eq!(outcome.records.len(), fetcher.call_count() * 20);
    }

    #[tokio::test]
    async fn test_finish_without_reading_events() {
        let mut fetcher = ScriptedFetcher::new();
        for i in 0..50 {
            fetcher = fetcher.page(page(i * 2..i * 2 + 2, "Low"), true);
        }
        let session = SessionController::new(
            fetcher,
            StaticClassifier::new(),
            EngineConfig {
                progress_buffer: 1,
                ..EngineConfig::default()
            },
        );
        let handle = session.start_run(Query::new("x", 100).unwrap()).unwrap();
        let outcome = handle.finish().await.unwrap();
        assert_eq!(outcome.records.len(), 100);
    }
}
