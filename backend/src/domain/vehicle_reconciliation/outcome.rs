//! Record-local outcomes and their fold into run counters.
//!
//! Each worker returns one of these instead of an error so a failure on one
//! record never aborts the rest of its batch.

use crate::domain::Registration;
use crate::domain::ports::{ReconciliationCounters, VehicleLookupError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum RecordOutcome {
    Updated,
    Skipped,
    NoData,
    Failed,
    RateLimited,
    Fatal(VehicleLookupError),
    NotAttempted,
}

/// A worker's outcome plus whether its record still lacks a fresh stamp.
#[derive(Debug)]
pub(super) struct ProcessedRecord {
    pub(super) registration: Registration,
    pub(super) outcome: RecordOutcome,
    pub(super) stamped: bool,
}

impl ProcessedRecord {
    /// The registration to exclude from later batches of this run.
    ///
    /// Stamped records leave the due set on their own.
    pub(super) fn left_due(&self) -> Option<&Registration> {
        (!self.stamped).then_some(&self.registration)
    }
}

#[derive(Debug, Default)]
pub(super) struct RunTally {
    pub(super) counters: ReconciliationCounters,
    fatal: Option<VehicleLookupError>,
}

impl RunTally {
    pub(super) fn absorb(&mut self, outcome: RecordOutcome) {
        let counters = &mut self.counters;
        match outcome {
            RecordOutcome::NotAttempted => return,
            RecordOutcome::Updated => counters.updated += 1,
            RecordOutcome::Skipped => counters.skipped += 1,
            RecordOutcome::NoData => counters.no_data += 1,
            RecordOutcome::Failed => counters.failed += 1,
            RecordOutcome::RateLimited => counters.rate_limited += 1,
            RecordOutcome::Fatal(error) => {
                self.fatal.get_or_insert(error);
            }
        }
        self.counters.attempted += 1;
    }

    pub(super) fn take_fatal(&mut self) -> Option<VehicleLookupError> {
        self.fatal.take()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn not_attempted_records_are_not_counted() {
        let mut tally = RunTally::default();
        tally.absorb(RecordOutcome::NotAttempted);
        assert_eq!(tally.counters, ReconciliationCounters::default());
    }

    #[rstest]
    #[case::stamped(true, None)]
    #[case::unstamped(false, Some("AB12CDE"))]
    fn only_unstamped_records_stay_excluded(#[case] stamped: bool, #[case] expected: Option<&str>) {
        let processed = ProcessedRecord {
            registration: Registration::parse("AB12CDE").expect("valid registration"),
            outcome: RecordOutcome::NoData,
            stamped,
        };
        assert_eq!(
            processed.left_due().map(Registration::as_str),
            expected
        );
    }

    #[rstest]
    fn keeps_first_fatal_error() {
        let mut tally = RunTally::default();
        tally.absorb(RecordOutcome::Updated);
        tally.absorb(RecordOutcome::Fatal(VehicleLookupError::unauthorized("first")));
        tally.absorb(RecordOutcome::Fatal(VehicleLookupError::unauthorized("second")));

        assert_eq!(tally.counters.attempted, 3);
        assert_eq!(tally.counters.updated, 1);
        assert_eq!(
            tally.take_fatal(),
            Some(VehicleLookupError::unauthorized("first"))
        );
        assert_eq!(tally.take_fatal(), None);
    }
}
