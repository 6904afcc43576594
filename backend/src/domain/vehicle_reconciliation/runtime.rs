//! Port and runtime dependency bundles for the reconciliation worker.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{VehicleLookupSource, VehicleRepository};

use super::{BackoffJitter, ReconciliationSleeper};

/// Port bundle required by the reconciler.
pub struct VehicleReconcilerPorts {
    /// Outbound vehicle API adapter.
    pub source: Arc<dyn VehicleLookupSource>,
    /// Vehicle persistence adapter.
    pub repository: Arc<dyn VehicleRepository>,
}

impl VehicleReconcilerPorts {
    /// Build a strongly-typed port bundle.
    pub fn new(source: Arc<dyn VehicleLookupSource>, repository: Arc<dyn VehicleRepository>) -> Self {
        Self { source, repository }
    }
}

/// Runtime helpers used by pacing and retry.
pub struct ReconciliationRuntime {
    /// Async sleep implementation.
    pub sleeper: Arc<dyn ReconciliationSleeper>,
    /// Jitter strategy for retry delays.
    pub jitter: Arc<dyn BackoffJitter>,
}

impl Default for ReconciliationRuntime {
    fn default() -> Self {
        Self {
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(AttemptJitter),
        }
    }
}

/// Tokio-based sleeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl ReconciliationSleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Default jitter: adds up to a quarter of the base delay, seeded from the clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttemptJitter;

impl BackoffJitter for AttemptJitter {
    fn jittered_delay(&self, base: Duration, attempt: u32, now: DateTime<Utc>) -> Duration {
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let max_extra = (base_ms / 4).max(1);
        let seed = u64::from(now.timestamp_subsec_nanos()) ^ u64::from(attempt);
        let extra = seed % (max_extra.saturating_add(1));
        Duration::from_millis(base_ms.saturating_add(extra))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Duration::from_millis(0))]
    #[case(Duration::from_millis(250))]
    #[case(Duration::from_secs(4))]
    fn attempt_jitter_stays_within_a_quarter_of_base(#[case] base: Duration) {
        let now = Utc
            .with_ymd_and_hms(2026, 10, 18, 9, 0, 0)
            .single()
            .expect("valid time");
        for attempt in 1..=5 {
            let delay = AttemptJitter.jittered_delay(base, attempt, now);
            assert!(delay >= base);
            assert!(delay <= base + base / 4 + Duration::from_millis(1));
        }
    }
}
