//! Run state, progress snapshots and the final run outcome

use snippy_domain::{rank_records, Query, Record, SavedSearch, Tier};
use std::collections::HashMap;
use std::fmt;

/// Lifecycle status of an aggregation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunStatus {
    /// No run started yet
    #[default]
    Idle,
    /// Fetching pages
    Running,
    /// Cancellation requested; no further fetch will be issued
    Stopping,
    /// Finished normally (target reached, exhausted or cancelled)
    Completed,
    /// Stopped by a provider error
    Failed,
}

impl RunStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::Stopping => "stopping",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    /// Completed or Failed
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    /// Running or Stopping
    pub fn is_active(&self) -> bool {
        matches!(self, RunStatus::Running | RunStatus::Stopping)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters and status owned by the aggregation driver
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    /// Current status
    pub status: RunStatus,
    /// Records accumulated so far
    pub cumulative_count: usize,
    /// Accumulated records that meet the threshold
    pub qualified_count: usize,
    /// Provider offset of the next fetch
    pub next_offset: usize,
    /// Message of the provider error that failed the run
    pub last_error: Option<String>,
}

/// Immutable progress report, one per completed fetch step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Status after the step
    pub status: RunStatus,
    /// Records accumulated so far
    pub cumulative: usize,
    /// Qualified records so far
    pub qualified: usize,
    /// Requested result count
    pub max_results: usize,
    /// Provider offset of the next fetch
    pub next_offset: usize,
    /// Number of pages fetched
    pub page: usize,
}

impl ProgressSnapshot {
    /// Completion percentage, rounded and capped at 100
    pub fn percent(&self) -> u8 {
        percent(self.cumulative, self.max_results)
    }
}

/// `min(round(cumulative / max * 100), 100)`
pub fn percent(cumulative: usize, max_results: usize) -> u8 {
    if max_results == 0 {
        return 0;
    }
    let pct = (cumulative as f64 / max_results as f64 * 100.0).round();
    pct.min(100.0) as u8
}

/// Event delivered to the consumer of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// A fetch step finished
    Progress(ProgressSnapshot),
    /// The run reached a terminal status; always the last event
    Finished {
        /// Terminal status
        status: RunStatus,
        /// Provider error message, for failed runs
        last_error: Option<String>,
    },
}

/// Final state and records of a finished run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Query the run executed
    pub query: Query,
    /// Final run state
    pub state: RunState,
    /// Accumulated set in insertion order
    pub records: Vec<Record>,
}

impl RunOutcome {
    /// Terminal status
    pub fn status(&self) -> RunStatus {
        self.state.status
    }

    /// Whether the outcome should be archived as a saved search
    pub fn is_saveable(&self) -> bool {
        self.state.status.is_terminal() && !self.records.is_empty()
    }

    /// Records per tier
    pub fn tier_counts(&self) -> HashMap<Tier, usize> {
        let mut counts = HashMap::new();
        for record in &self.records {
            *counts.entry(record.tier).or_insert(0) += 1;
        }
        counts
    }

    /// Snapshot for the archive, records in ranked order
    pub fn to_saved_search(&self, saved_at: u64) -> SavedSearch {
        SavedSearch {
            keywords: self.query.keywords().to_string(),
            saved_at,
            records: rank_records(&self.records),
        }
    }

    /// Generate a summary report of the run
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Search: {}", self.query.keywords()),
            format!("Status: {}", self.state.status),
            format!(
                "Records: {} of {} ({}%)",
                self.state.cumulative_count,
                self.query.max_results(),
                percent(self.state.cumulative_count, self.query.max_results())
            ),
            format!(
                "Qualified ({}): {}",
                self.query.tier_threshold(),
                self.state.qualified_count
            ),
        ];

        let counts = self.tier_counts();
        if !counts.is_empty() {
            lines.push("By tier:".to_string());
            for tier in Tier::ALL.iter().rev() {
                if let Some(count) = counts.get(tier) {
                    lines.push(format!("  {}: {}", tier, count));
                }
            }
        }

        if let Some(error) = &self.state.last_error {
            lines.push(format!("Error: {}", error));
        }

        lines.join("\n")
    }
}
