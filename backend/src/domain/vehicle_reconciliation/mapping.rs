//! Mapping helpers from port failures to domain errors.

use serde_json::json;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::ports::{ReconciliationCounters, VehicleLookupError, VehicleRepositoryError};

pub(super) fn map_repository_error(error: VehicleRepositoryError) -> Error {
    match error {
        VehicleRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("vehicle store unavailable: {message}"))
        }
        other => Error::internal(format!("vehicle store query failed: {other}")),
    }
}

pub(super) fn map_interrupted_run(
    error: Error,
    run_id: Uuid,
    counters: &ReconciliationCounters,
) -> Error {
    let details = json!({ "runId": run_id, "counters": counters });
    error.with_details(details)
}

pub(super) fn map_fatal_lookup_error(
    error: VehicleLookupError,
    run_id: Uuid,
    counters: &ReconciliationCounters,
) -> Error {
    map_interrupted_run(
        Error::service_unavailable(format!("vehicle reconciliation aborted: {error}")),
        run_id,
        counters,
    )
}

/// Map a single interactive lookup failure to a domain error.
pub(crate) fn map_lookup_error(error: VehicleLookupError) -> Error {
    match error {
        VehicleLookupError::InvalidRequest { message } => {
            Error::invalid_request(format!("vehicle lookup rejected: {message}"))
        }
        VehicleLookupError::Decode { message } => {
            Error::internal(format!("vehicle lookup returned unreadable data: {message}"))
        }
        other => Error::service_unavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::ErrorCode;

    #[rstest]
    #[case::rate_limited(VehicleLookupError::rate_limited("429"), ErrorCode::ServiceUnavailable)]
    #[case::auth(VehicleLookupError::unauthorized("401"), ErrorCode::ServiceUnavailable)]
    #[case::timeout(VehicleLookupError::timeout("slow"), ErrorCode::ServiceUnavailable)]
    #[case::decode(VehicleLookupError::decode("bad json"), ErrorCode::InternalError)]
    #[case::invalid(VehicleLookupError::invalid_request("400"), ErrorCode::InvalidRequest)]
    fn lookup_errors_map_to_codes(#[case] error: VehicleLookupError, #[case] expected: ErrorCode) {
        assert_eq!(map_lookup_error(error).code(), expected);
    }

    #[rstest]
    fn fatal_errors_carry_partial_counters() {
        let counters = ReconciliationCounters {
            attempted: 2,
            updated: 1,
            ..ReconciliationCounters::default()
        };
        let error = map_fatal_lookup_error(
            VehicleLookupError::unauthorized("status 401"),
            Uuid::nil(),
            &counters,
        );

        assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
        let details = error.details().expect("details present");
        assert_eq!(details["counters"]["attempted"], 2);
        assert_eq!(details["counters"]["updated"], 1);
    }

    #[rstest]
    fn connection_failures_are_service_unavailable() {
        let error = map_repository_error(VehicleRepositoryError::connection("refused"));
        assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
        let error = map_repository_error(VehicleRepositoryError::query("syntax"));
        assert_eq!(error.code(), ErrorCode::InternalError);
    }
}
