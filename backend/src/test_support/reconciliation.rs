//! Shared test doubles for vehicle reconciliation tests.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::ports::{
    DueVehiclesQuery, VehicleEnrichmentUpdate, VehicleImportRecord, VehicleImportRepository,
    VehicleImportRepositoryError, VehicleLookup, VehicleLookupError, VehicleLookupSource,
    VehicleRepository, VehicleRepositoryError, VehicleUpsertSummary,
};
use crate::domain::{
    BackoffJitter, ReconciliationSleeper, Registration, VehicleDetails, VehicleRecord,
};

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("{name} mutex poisoned"),
    }
}

/// Parse a registration literal, panicking on invalid test input.
pub fn registration(raw: &str) -> Registration {
    match Registration::parse(raw) {
        Ok(registration) => registration,
        Err(error) => panic!("invalid test registration {raw:?}: {error}"),
    }
}

pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => {
                panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}")
            }
        };
        *lock(&self.0, "clock") += delta;
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0, "clock")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateSleeper;

#[async_trait]
impl ReconciliationSleeper for ImmediateSleeper {
    async fn sleep(&self, _duration: Duration) {}
}

/// Records every requested sleep without waiting.
#[derive(Default)]
pub struct RecordingSleeper(pub Mutex<Vec<Duration>>);

impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        lock(&self.0, "sleeper").clone()
    }
}

#[async_trait]
impl ReconciliationSleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        lock(&self.0, "sleeper").push(duration);
    }
}

/// Sleeper that advances a [`MutableClock`] instead of waiting.
pub struct ClockAdvancingSleeper(pub Arc<MutableClock>);

#[async_trait]
impl ReconciliationSleeper for ClockAdvancingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.0.advance(duration);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl BackoffJitter for NoJitter {
    fn jittered_delay(&self, base: Duration, _attempt: u32, _now: DateTime<Utc>) -> Duration {
        base
    }
}

/// In-memory vehicles table honouring the due ordering and COALESCE merge.
#[derive(Default)]
pub struct InMemoryVehicleRepository {
    rows: Mutex<BTreeMap<Registration, VehicleRecord>>,
    failing_writes: Mutex<BTreeSet<Registration>>,
    fail_fetch: Mutex<bool>,
    writes: AtomicUsize,
    fetches: Mutex<Vec<DueVehiclesQuery>>,
}

impl InMemoryVehicleRepository {
    pub fn with_records(records: impl IntoIterator<Item = VehicleRecord>) -> Self {
        let repository = Self::default();
        {
            let mut rows = lock(&repository.rows, "rows");
            for record in records {
                rows.insert(record.registration.clone(), record);
            }
        }
        repository
    }

    /// Make every write for `registration` fail with a query error.
    pub fn fail_writes_for(&self, registration: Registration) {
        lock(&self.failing_writes, "failing writes").insert(registration);
    }

    /// Make `fetch_due` fail with a connection error.
    pub fn fail_fetches(&self) {
        *lock(&self.fail_fetch, "fail fetch") = true;
    }

    pub fn record(&self, registration: &Registration) -> Option<VehicleRecord> {
        lock(&self.rows, "rows").get(registration).cloned()
    }

    pub fn records(&self) -> Vec<VehicleRecord> {
        lock(&self.rows, "rows").values().cloned().collect()
    }

    /// Successful and failed write calls combined.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fetch_queries(&self) -> Vec<DueVehiclesQuery> {
        lock(&self.fetches, "fetches").clone()
    }

    fn is_due(record: &VehicleRecord, stale_before: DateTime<Utc>) -> bool {
        record
            .last_checked_at
            .is_none_or(|checked_at| checked_at < stale_before)
    }

    fn write<F>(&self, registration: &Registration, apply: F) -> Result<(), VehicleRepositoryError>
    where
        F: FnOnce(&mut VehicleRecord),
    {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if lock(&self.failing_writes, "failing writes").contains(registration) {
            return Err(VehicleRepositoryError::query(format!(
                "scripted write failure for {registration}"
            )));
        }
        if let Some(record) = lock(&self.rows, "rows").get_mut(registration) {
            apply(record);
        }
        Ok(())
    }
}

#[async_trait]
impl VehicleRepository for InMemoryVehicleRepository {
    async fn fetch_due(
        &self,
        query: &DueVehiclesQuery,
    ) -> Result<Vec<VehicleRecord>, VehicleRepositoryError> {
        lock(&self.fetches, "fetches").push(query.clone());
        if *lock(&self.fail_fetch, "fail fetch") {
            return Err(VehicleRepositoryError::connection("scripted fetch failure"));
        }
        let rows = lock(&self.rows, "rows");
        let mut due = rows
            .values()
            .filter(|record| Self::is_due(record, query.stale_before))
            .filter(|record| !query.exclude.contains(&record.registration))
            .cloned()
            .collect::<Vec<_>>();
        due.sort_by(|left, right| {
            (left.last_checked_at.is_some(), left.last_checked_at, &left.registration).cmp(&(
                right.last_checked_at.is_some(),
                right.last_checked_at,
                &right.registration,
            ))
        });
        due.truncate(query.limit);
        Ok(due)
    }

    async fn count_due(&self, stale_before: DateTime<Utc>) -> Result<u64, VehicleRepositoryError> {
        let rows = lock(&self.rows, "rows");
        let count = rows
            .values()
            .filter(|record| Self::is_due(record, stale_before))
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn apply_enrichment(
        &self,
        update: &VehicleEnrichmentUpdate,
    ) -> Result<(), VehicleRepositoryError> {
        self.write(&update.registration, |record| {
            record.details = record.details.merge_missing(&update.enrichment);
            record.last_checked_at = Some(update.checked_at);
        })
    }

    async fn mark_checked(
        &self,
        registration: &Registration,
        checked_at: DateTime<Utc>,
    ) -> Result<(), VehicleRepositoryError> {
        self.write(registration, |record| {
            record.last_checked_at = Some(checked_at);
        })
    }

    async fn find(
        &self,
        registration: &Registration,
    ) -> Result<Option<VehicleRecord>, VehicleRepositoryError> {
        Ok(self.record(registration))
    }
}

#[async_trait]
impl VehicleImportRepository for InMemoryVehicleRepository {
    async fn upsert_vehicles(
        &self,
        records: &[VehicleImportRecord],
    ) -> Result<VehicleUpsertSummary, VehicleImportRepositoryError> {
        let mut rows = lock(&self.rows, "rows");
        let mut summary = VehicleUpsertSummary::default();
        for record in records {
            match rows.get_mut(&record.registration) {
                Some(existing) => {
                    existing.details = existing.details.merge_missing(&record.details);
                    summary.merged += 1;
                }
                None => {
                    rows.insert(
                        record.registration.clone(),
                        VehicleRecord {
                            details: record.details.clone(),
                            ..VehicleRecord::unchecked(record.registration.clone())
                        },
                    );
                    summary.inserted += 1;
                }
            }
        }
        Ok(summary)
    }
}

type LookupResult = Result<VehicleLookup, VehicleLookupError>;

/// Lookup source answering from per-registration scripts.
///
/// Each registration pops its next scripted response; once a script is empty
/// the fallback answer is returned. Concurrency is tracked so tests can assert
/// the fan-out bound.
pub struct ScriptedLookupSource {
    scripts: Mutex<HashMap<Registration, VecDeque<LookupResult>>>,
    fallback: LookupResult,
    calls: Mutex<Vec<Registration>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl Default for ScriptedLookupSource {
    fn default() -> Self {
        Self::with_fallback(Ok(VehicleLookup::NotFound))
    }
}

impl ScriptedLookupSource {
    pub fn with_fallback(fallback: LookupResult) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback,
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    /// Queue responses for `registration`, returned in order.
    pub fn script(self, registration: Registration, responses: Vec<LookupResult>) -> Self {
        lock(&self.scripts, "scripts")
            .entry(registration)
            .or_default()
            .extend(responses);
        self
    }

    /// Answer `registration` with a found snapshot.
    pub fn found(self, registration: Registration, details: VehicleDetails) -> Self {
        self.script(registration, vec![Ok(VehicleLookup::Found(details))])
    }

    pub fn calls(&self) -> Vec<Registration> {
        lock(&self.calls, "calls").clone()
    }

    pub fn calls_for(&self, registration: &Registration) -> usize {
        lock(&self.calls, "calls")
            .iter()
            .filter(|called| *called == registration)
            .count()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VehicleLookupSource for ScriptedLookupSource {
    fn source_name(&self) -> &'static str {
        "scripted"
    }

    async fn lookup(&self, registration: &Registration) -> LookupResult {
        lock(&self.calls, "calls").push(registration.clone());
        let active_now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active_now, Ordering::SeqCst);
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        lock(&self.scripts, "scripts")
            .get_mut(registration)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.fallback.clone())
    }
}
