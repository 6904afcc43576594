//! Driving port for one bounded vehicle reconciliation run.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Error;

/// Whether a run writes results back to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunMode {
    /// Merge results and stamp timestamps.
    #[default]
    Write,
    /// Perform lookups only; the store is left untouched.
    DryRun,
}

impl RunMode {
    /// Return whether repository writes are allowed.
    pub fn writes(self) -> bool {
        matches!(self, Self::Write)
    }
}

/// Command request for one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationRequest {
    /// Identifier used to correlate log lines for this run.
    pub run_id: Uuid,
    /// Write or dry-run.
    pub mode: RunMode,
    /// Override for the configured batch size.
    pub batch_size: Option<usize>,
    /// Override for the configured batch limit.
    pub max_batches: Option<u32>,
}

impl ReconciliationRequest {
    /// Build a request using configured limits.
    pub fn new(mode: RunMode) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode,
            batch_size: None,
            max_batches: None,
        }
    }
}

/// Aggregate per-record outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationCounters {
    /// Records for which a lookup was attempted.
    pub attempted: u64,
    /// Records that gained at least one field.
    pub updated: u64,
    /// Records found with data but with nothing left to fill.
    pub skipped: u64,
    /// Records unknown upstream or returned empty.
    pub no_data: u64,
    /// Records whose lookup or write failed.
    pub failed: u64,
    /// Records rejected by upstream rate limiting.
    pub rate_limited: u64,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    /// No due records remained.
    Exhausted,
    /// Wall-clock safety bound reached.
    RuntimeExceeded,
    /// Configured batch limit reached.
    BatchLimitReached,
    /// Too many consecutive rate-limit responses.
    RateLimitBackoff,
}

/// Summary of one reconciliation run. Returned, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    /// Correlation identifier from the request.
    pub run_id: Uuid,
    /// Mode the run executed in.
    pub mode: RunMode,
    /// Lookup adapter name.
    pub source: String,
    /// Run start.
    pub started_at: DateTime<Utc>,
    /// Run end.
    pub finished_at: DateTime<Utc>,
    /// Elapsed wall-clock milliseconds.
    pub elapsed_ms: u64,
    /// Batches fetched and processed.
    pub batches: u32,
    /// Outcome counters.
    pub counters: ReconciliationCounters,
    /// Termination cause.
    pub stop_reason: StopReason,
}

/// Snapshot of how many vehicles are currently due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueSummary {
    /// Vehicles never checked or checked before `stale_before`.
    pub due: u64,
    /// Staleness cutoff used for the count.
    pub stale_before: DateTime<Utc>,
}

/// Driving port used by the HTTP adapter and CLI.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VehicleReconciliationCommand: Send + Sync {
    /// Execute one bounded reconciliation run.
    async fn reconcile(&self, request: ReconciliationRequest)
    -> Result<ReconciliationReport, Error>;

    /// Count vehicles due under the configured staleness TTL.
    async fn due_summary(&self) -> Result<DueSummary, Error>;
}
