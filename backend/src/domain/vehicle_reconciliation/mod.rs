//! Domain orchestration for bulk vehicle reconciliation.
//!
//! The reconciler owns batch selection (never-checked first, then oldest),
//! bounded fan-out, per-record fault isolation, transient retry policy
//! (jittered exponential backoff), rate-limit cooldown, and the wall-clock
//! safety bound. Persistence goes through domain ports.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use mockable::Clock;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    DueSummary, DueVehiclesQuery, ReconciliationReport, ReconciliationRequest, RunMode,
    StopReason, VehicleEnrichmentUpdate, VehicleLookup, VehicleLookupError, VehicleLookupSource,
    VehicleReconciliationCommand, VehicleRepository,
};
use crate::domain::{Error, Registration, StalenessPolicy, VehicleRecord};

mod governor;
mod mapping;
mod outcome;
mod runtime;

use governor::{Admission, RateLimitBackoffConfig, RunGovernor};
pub(crate) use mapping::map_lookup_error;
use outcome::{ProcessedRecord, RecordOutcome, RunTally};
pub use runtime::{AttemptJitter, ReconciliationRuntime, TokioSleeper, VehicleReconcilerPorts};

/// Largest batch a single fetch may request.
pub const MAX_BATCH_SIZE: usize = 500;

/// Whether a rate-limited record has its last-checked timestamp stamped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RateLimitPolicy {
    /// Leave the record due so the next run retries it.
    #[default]
    LeaveUnstamped,
    /// Stamp it like any other attempt; it waits a full TTL.
    StampAsChecked,
}

/// Reconciler configuration: batch shape, pacing, retries, and safety bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationConfig {
    /// Records fetched per batch.
    pub batch_size: usize,
    /// Lookups in flight at once.
    pub concurrency: usize,
    /// Pause each worker observes after its lookup.
    pub inter_request_delay: Duration,
    /// Pause between batches.
    pub inter_batch_delay: Duration,
    /// Wall-clock bound after which no new batch is fetched.
    pub max_runtime: Duration,
    /// Optional bound on fetched batches.
    pub max_batches: Option<u32>,
    /// Records checked within this window are not due.
    pub staleness_ttl: Duration,
    /// Lookup attempts per record for transient failures (including the first).
    pub max_attempts: u32,
    /// Initial transient retry backoff.
    pub initial_backoff: Duration,
    /// Transient retry backoff cap.
    pub max_backoff: Duration,
    /// Stamping decision for rate-limited records.
    pub rate_limit_policy: RateLimitPolicy,
    /// Cooldown after the first rate-limit response of a streak.
    pub rate_limit_cooldown: Duration,
    /// Consecutive rate-limit responses that stop the run.
    pub rate_limit_abort_threshold: u32,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            concurrency: 5,
            inter_request_delay: Duration::from_millis(100),
            inter_batch_delay: Duration::from_secs(1),
            max_runtime: Duration::from_secs(10 * 60),
            max_batches: None,
            staleness_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            max_attempts: 2,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
            rate_limit_policy: RateLimitPolicy::LeaveUnstamped,
            rate_limit_cooldown: Duration::from_secs(3),
            rate_limit_abort_threshold: 10,
        }
    }
}

impl ReconciliationConfig {
    fn rate_limit_backoff(&self) -> RateLimitBackoffConfig {
        RateLimitBackoffConfig {
            abort_threshold: self.rate_limit_abort_threshold,
            initial_cooldown: self.rate_limit_cooldown,
            max_cooldown: self.max_backoff.max(self.rate_limit_cooldown),
        }
    }
}

/// Async clock-independent sleeping abstraction for pacing and retries.
#[async_trait]
pub trait ReconciliationSleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Retry backoff jitter abstraction.
pub trait BackoffJitter: Send + Sync {
    /// Return a jittered delay from the exponential base delay.
    ///
    /// ```rust
    /// use garage_backend::domain::BackoffJitter;
    /// use chrono::{TimeZone, Utc};
    /// use std::time::Duration;
    /// struct FixedJitter;
    /// impl BackoffJitter for FixedJitter {
    ///     fn jittered_delay(&self, base: Duration, attempt: u32, _now: chrono::DateTime<chrono::Utc>) -> Duration {
    ///         base + Duration::from_millis(u64::from(attempt))
    ///     }
    /// }
    /// let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).single().expect("valid time");
    /// assert_eq!(
    ///     FixedJitter.jittered_delay(Duration::from_millis(250), 2, now),
    ///     Duration::from_millis(252)
    /// );
    /// ```
    fn jittered_delay(&self, base: Duration, attempt: u32, now: DateTime<Utc>) -> Duration;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RunLimits {
    batch_size: usize,
    max_batches: Option<u32>,
}

/// Domain-owned batch reconciler.
pub struct VehicleReconciler {
    source: Arc<dyn VehicleLookupSource>,
    repository: Arc<dyn VehicleRepository>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn ReconciliationSleeper>,
    jitter: Arc<dyn BackoffJitter>,
    config: ReconciliationConfig,
    run_lock: tokio::sync::Mutex<()>,
}

fn lock_governor(governor: &Mutex<RunGovernor>) -> MutexGuard<'_, RunGovernor> {
    governor.lock().unwrap_or_else(PoisonError::into_inner)
}

impl VehicleReconciler {
    /// Build a reconciler using Tokio sleeping and clock-seeded jitter.
    /// ```rust,ignore
    /// let reconciler = VehicleReconciler::new(ports, Arc::new(DefaultClock), config);
    /// ```
    pub fn new(
        ports: VehicleReconcilerPorts,
        clock: Arc<dyn Clock>,
        config: ReconciliationConfig,
    ) -> Self {
        Self::with_runtime(ports, clock, ReconciliationRuntime::default(), config)
    }

    /// Build a reconciler with injected runtime abstractions.
    pub fn with_runtime(
        ports: VehicleReconcilerPorts,
        clock: Arc<dyn Clock>,
        runtime: ReconciliationRuntime,
        config: ReconciliationConfig,
    ) -> Self {
        let config = ReconciliationConfig {
            batch_size: config.batch_size.clamp(1, MAX_BATCH_SIZE),
            concurrency: config.concurrency.max(1),
            max_attempts: config.max_attempts.max(1),
            ..config
        };
        Self {
            source: ports.source,
            repository: ports.repository,
            clock,
            sleeper: runtime.sleeper,
            jitter: runtime.jitter,
            config,
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Effective configuration after clamping.
    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    fn staleness(&self) -> StalenessPolicy {
        StalenessPolicy::new(self.config.staleness_ttl)
    }

    fn resolve_limits(&self, request: &ReconciliationRequest) -> Result<RunLimits, Error> {
        let batch_size = request.batch_size.unwrap_or(self.config.batch_size);
        if !(1..=MAX_BATCH_SIZE).contains(&batch_size) {
            return Err(Error::invalid_request(format!(
                "batch size must be between 1 and {MAX_BATCH_SIZE}"
            ))
            .with_details(json!({
                "field": "batchSize",
                "value": batch_size,
                "code": "invalid_batch_size"
            })));
        }
        let max_batches = request.max_batches.or(self.config.max_batches);
        if max_batches == Some(0) {
            return Err(
                Error::invalid_request("max batches must be at least 1").with_details(json!({
                    "field": "maxBatches",
                    "value": 0,
                    "code": "invalid_max_batches"
                })),
            );
        }
        Ok(RunLimits {
            batch_size,
            max_batches,
        })
    }

    fn safety_stop(
        &self,
        started_at: DateTime<Utc>,
        batches: u32,
        limits: RunLimits,
    ) -> Option<StopReason> {
        let elapsed = (self.clock.utc() - started_at).to_std().unwrap_or_default();
        if elapsed >= self.config.max_runtime {
            return Some(StopReason::RuntimeExceeded);
        }
        match limits.max_batches {
            Some(max_batches) if batches >= max_batches => Some(StopReason::BatchLimitReached),
            _ => None,
        }
    }

    async fn process_batch(
        &self,
        batch: Vec<VehicleRecord>,
        mode: RunMode,
        governor: &Mutex<RunGovernor>,
    ) -> Vec<ProcessedRecord> {
        stream::iter(batch)
            .map(|record| self.process_record(record, mode, governor))
            .buffer_unordered(self.config.concurrency)
            .collect()
            .await
    }

    async fn process_record(
        &self,
        record: VehicleRecord,
        mode: RunMode,
        governor: &Mutex<RunGovernor>,
    ) -> ProcessedRecord {
        let registration = record.registration.clone();
        let admission = lock_governor(governor).admit();
        if admission != Admission::Allowed {
            debug!(registration = %registration, ?admission, "lookup not admitted");
            return ProcessedRecord {
                registration,
                outcome: RecordOutcome::NotAttempted,
                stamped: false,
            };
        }

        let result = self.lookup_with_retry(&registration).await;
        let checked_at = self.clock.utc();

        let (outcome, written) = match result {
            Ok(VehicleLookup::Found(snapshot)) if snapshot.has_data() => {
                lock_governor(governor).record_response();
                let filled = record.details.fillable_fields(&snapshot);
                let update = VehicleEnrichmentUpdate {
                    registration: registration.clone(),
                    enrichment: snapshot,
                    checked_at,
                };
                if !self.write_enrichment(&update, mode).await {
                    (RecordOutcome::Failed, false)
                } else if filled.is_empty() {
                    (RecordOutcome::Skipped, true)
                } else {
                    debug!(
                        registration = %registration,
                        fields = ?filled.iter().map(|field| field.as_str()).collect::<Vec<_>>(),
                        "vehicle enriched"
                    );
                    (RecordOutcome::Updated, true)
                }
            }
            Ok(VehicleLookup::Found(_) | VehicleLookup::NotFound) => {
                lock_governor(governor).record_response();
                if self.stamp(&registration, checked_at, mode).await {
                    (RecordOutcome::NoData, true)
                } else {
                    (RecordOutcome::Failed, false)
                }
            }
            Err(error) if error.is_fatal() => {
                lock_governor(governor).abort();
                warn!(registration = %registration, %error, "vehicle lookup credentials rejected");
                return ProcessedRecord {
                    registration,
                    outcome: RecordOutcome::Fatal(error),
                    stamped: false,
                };
            }
            Err(VehicleLookupError::RateLimited { message }) => {
                let cooldown = lock_governor(governor).record_rate_limited();
                warn!(
                    registration = %registration,
                    %message,
                    cooldown_ms = u64::try_from(cooldown.as_millis()).unwrap_or(u64::MAX),
                    "vehicle lookup rate limited"
                );
                let written = self.config.rate_limit_policy == RateLimitPolicy::StampAsChecked
                    && self.stamp(&registration, checked_at, mode).await;
                self.sleeper.sleep(cooldown).await;
                (RecordOutcome::RateLimited, written)
            }
            Err(error) => {
                lock_governor(governor).record_response();
                warn!(registration = %registration, %error, "vehicle lookup failed");
                let written = self.stamp(&registration, checked_at, mode).await;
                (RecordOutcome::Failed, written)
            }
        };

        self.sleeper.sleep(self.config.inter_request_delay).await;
        ProcessedRecord {
            registration,
            outcome,
            stamped: written && mode.writes(),
        }
    }

    async fn lookup_with_retry(
        &self,
        registration: &Registration,
    ) -> Result<VehicleLookup, VehicleLookupError> {
        let max_attempts = self.config.max_attempts;
        let mut attempt = 1;
        loop {
            match self.source.lookup(registration).await {
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    let delay = self.jitter.jittered_delay(
                        self.retry_base_delay(attempt),
                        attempt,
                        self.clock.utc(),
                    );
                    debug!(registration = %registration, attempt, %error, "retrying vehicle lookup");
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn write_enrichment(&self, update: &VehicleEnrichmentUpdate, mode: RunMode) -> bool {
        if !mode.writes() {
            return true;
        }
        match self.repository.apply_enrichment(update).await {
            Ok(()) => true,
            Err(error) => {
                warn!(registration = %update.registration, %error, "failed to persist vehicle enrichment");
                false
            }
        }
    }

    async fn stamp(
        &self,
        registration: &Registration,
        checked_at: DateTime<Utc>,
        mode: RunMode,
    ) -> bool {
        if !mode.writes() {
            return true;
        }
        match self.repository.mark_checked(registration, checked_at).await {
            Ok(()) => true,
            Err(error) => {
                warn!(registration = %registration, %error, "failed to stamp vehicle as checked");
                false
            }
        }
    }

    fn retry_base_delay(&self, attempt: u32) -> Duration {
        let exponent = 2_u32.saturating_pow(attempt.saturating_sub(1));
        let base_ms = u64::try_from(self.config.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.config.max_backoff.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(u64::from(exponent)).min(max_ms))
    }
}

#[async_trait]
impl VehicleReconciliationCommand for VehicleReconciler {
    async fn reconcile(
        &self,
        request: ReconciliationRequest,
    ) -> Result<ReconciliationReport, Error> {
        let limits = self.resolve_limits(&request)?;
        let _run_guard = self
            .run_lock
            .try_lock()
            .map_err(|_| Error::conflict("a vehicle reconciliation run is already in progress"))?;

        let run_id = request.run_id;
        let mode = request.mode;
        let source = self.source.source_name();
        let staleness = self.staleness();
        let started_at = self.clock.utc();
        let governor = Mutex::new(RunGovernor::new(self.config.rate_limit_backoff()));
        let mut tally = RunTally::default();
        let stale_before = staleness.stale_before(started_at);
        let mut left_due = BTreeSet::<Registration>::new();
        let mut batches = 0_u32;

        info!(
            %run_id,
            ?mode,
            source,
            batch_size = limits.batch_size,
            concurrency = self.config.concurrency,
            "vehicle reconciliation started"
        );

        let stop_reason = loop {
            if let Some(reason) = self.safety_stop(started_at, batches, limits) {
                break reason;
            }
            if batches > 0 {
                self.sleeper.sleep(self.config.inter_batch_delay).await;
            }

            let query = DueVehiclesQuery {
                stale_before,
                limit: limits.batch_size,
                exclude: left_due.iter().cloned().collect(),
            };
            let batch = self.repository.fetch_due(&query).await.map_err(|error| {
                mapping::map_interrupted_run(
                    mapping::map_repository_error(error),
                    run_id,
                    &tally.counters,
                )
            })?;
            if batch.is_empty() {
                break StopReason::Exhausted;
            }

            batches += 1;
            debug!(%run_id, batch = batches, records = batch.len(), "processing batch");

            for processed in self.process_batch(batch, mode, &governor).await {
                if let Some(registration) = processed.left_due() {
                    left_due.insert(registration.clone());
                }
                tally.absorb(processed.outcome);
            }
            if let Some(error) = tally.take_fatal() {
                warn!(%run_id, counters = ?tally.counters, "vehicle reconciliation aborted");
                return Err(mapping::map_fatal_lookup_error(
                    error,
                    run_id,
                    &tally.counters,
                ));
            }
            if lock_governor(&governor).is_rate_limit_tripped() {
                warn!(%run_id, "rate-limit streak reached threshold; stopping run");
                break StopReason::RateLimitBackoff;
            }
        };

        let finished_at = self.clock.utc();
        let elapsed_ms = u64::try_from(
            (finished_at - started_at)
                .to_std()
                .unwrap_or_default()
                .as_millis(),
        )
        .unwrap_or(u64::MAX);

        info!(
            %run_id,
            ?stop_reason,
            batches,
            elapsed_ms,
            attempted = tally.counters.attempted,
            updated = tally.counters.updated,
            skipped = tally.counters.skipped,
            no_data = tally.counters.no_data,
            failed = tally.counters.failed,
            rate_limited = tally.counters.rate_limited,
            "vehicle reconciliation finished"
        );

        Ok(ReconciliationReport {
            run_id,
            mode,
            source: source.to_owned(),
            started_at,
            finished_at,
            elapsed_ms,
            batches,
            counters: tally.counters,
            stop_reason,
        })
    }

    async fn due_summary(&self) -> Result<DueSummary, Error> {
        let stale_before = self.staleness().stale_before(self.clock.utc());
        let due = self
            .repository
            .count_due(stale_before)
            .await
            .map_err(mapping::map_repository_error)?;
        Ok(DueSummary { due, stale_before })
    }
}
