//! Domain primitives, services, and ports.
//!
//! Purpose: define strongly typed vehicle entities and the services that
//! reconcile them against external APIs. Adapters live under `inbound` and
//! `outbound` and only meet the domain through `ports`.
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure payload.
//! - Registration, VehicleDetails, VehicleRecord, StalenessPolicy: data model.
//! - VehicleReconciler: bounded batch reconciliation run.
//! - VehicleLookupService: interactive single lookup.
//! - VehicleImportService: chunked CSV import.

pub mod error;
pub mod ports;
pub mod vehicle;
pub mod vehicle_import;
pub mod vehicle_lookup;
pub mod vehicle_reconciliation;

pub use self::error::{Error, ErrorCode};
pub use self::vehicle::{
    Registration, RegistrationValidationError, StalenessPolicy, VehicleDetails, VehicleField,
    VehicleRecord,
};
pub use self::vehicle_import::{
    RejectedImportRow, VehicleImportConfig, VehicleImportReport, VehicleImportRow,
    VehicleImportService,
};
pub use self::vehicle_lookup::VehicleLookupService;
pub use self::vehicle_reconciliation::{
    AttemptJitter, BackoffJitter, MAX_BATCH_SIZE, RateLimitPolicy, ReconciliationConfig,
    ReconciliationRuntime, ReconciliationSleeper, TokioSleeper, VehicleReconciler,
    VehicleReconcilerPorts,
};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use garage_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::conflict("run in progress"))
/// }
/// assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
