//! Deterministic test doubles for the fetcher and classifier traits
//!
//! These make no network calls and are used by the engine tests and by
//! front ends in offline mode.

use crate::error::ProviderError;
use snippy_domain::{Page, PageFetcher, Query, RankingClassifier, RawRecord, Tier};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type FetchHook = Arc<dyn Fn(usize) + Send + Sync>;

/// One scripted fetch outcome
#[derive(Debug, Clone)]
enum Step {
    Page(Page),
    Fail(String),
}

/// Page fetcher that replays a fixed script of pages and failures
///
/// Once the script runs out every further call returns an exhausted page.
/// Clones share the script and the call log.
///
/// # Examples
///
/// ```
/// use snippy_providers::ScriptedFetcher;
/// use snippy_domain::RawRecord;
///
/// let fetcher = ScriptedFetcher::new()
///     .page(vec![RawRecord::new("A", "J", Some(2020), None)], true)
///     .fail("service unavailable");
/// assert_eq!(fetcher.remaining(), 2);
/// ```
#[derive(Clone, Default)]
pub struct ScriptedFetcher {
    steps: Arc<Mutex<VecDeque<Step>>>,
    calls: Arc<Mutex<Vec<(usize, usize)>>>,
    on_fetch: Option<FetchHook>,
}

impl ScriptedFetcher {
    /// Empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page to the script
    pub fn page(self, records: Vec<RawRecord>, has_more: bool) -> Self {
        self.push(Step::Page(Page::new(records, has_more)));
        self
    }

    /// Append a failure to the script
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Step::Fail(message.into()));
        self
    }

    /// Run `hook` with the zero-based call index at the start of each fetch
    pub fn on_fetch(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_fetch = Some(Arc::new(hook));
        self
    }

    fn push(&self, step: Step) {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(step);
    }

    /// Number of fetch calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// `(offset, batch_size)` of every call, in order
    pub fn calls(&self) -> Vec<(usize, usize)> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Script steps not yet consumed
    pub fn remaining(&self) -> usize {
        self.steps.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl PageFetcher for ScriptedFetcher {
    type Error = ProviderError;

    async fn fetch_page(
        &self,
        _query: &Query,
        offset: usize,
        batch_size: usize,
    ) -> Result<Page, Self::Error> {
        let index = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            calls.push((offset, batch_size));
            calls.len() - 1
        };
        if let Some(hook) = &self.on_fetch {
            hook(index);
        }

        let step = self
            .steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        tokio::task::yield_now().await;

        match step {
            Some(Step::Page(page)) => Ok(page),
            Some(Step::Fail(message)) => Err(ProviderError::Other(message)),
            None => Ok(Page::exhausted()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Classifier backed by a fixed journal → tier table
///
/// Journals missing from the table are unranked.
#[derive(Debug, Clone, Default)]
pub struct StaticClassifier {
    tiers: HashMap<String, Tier>,
    calls: Arc<AtomicUsize>,
}

impl StaticClassifier {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a journal to the table
    pub fn with(mut self, journal: impl Into<String>, tier: Tier) -> Self {
        self.tiers.insert(journal.into(), tier);
        self
    }

    /// Number of classify calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RankingClassifier for StaticClassifier {
    async fn classify(&self, journal: &str) -> Tier {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tiers.get(journal).copied().unwrap_or_default()
    }
}
