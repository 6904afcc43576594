//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`VehicleLookupSource`, `VehicleRepository`,
//! `VehicleImportRepository`) describe how the domain reaches vehicle APIs and
//! Postgres. The driving ports (`VehicleReconciliationCommand`,
//! `VehicleLookupQuery`) are what the HTTP adapter and CLI call. Each driven
//! port exposes a strongly typed error enum so adapters map failures into
//! predictable variants.

mod macros;
pub(crate) use macros::define_port_error;

mod vehicle_import_repository;
mod vehicle_lookup_query;
mod vehicle_lookup_source;
mod vehicle_reconciliation_command;
mod vehicle_repository;

#[cfg(test)]
pub use vehicle_import_repository::MockVehicleImportRepository;
pub use vehicle_import_repository::{
    VehicleImportRecord, VehicleImportRepository, VehicleImportRepositoryError,
    VehicleUpsertSummary,
};
#[cfg(test)]
pub use vehicle_lookup_query::MockVehicleLookupQuery;
pub use vehicle_lookup_query::{VehicleLookupQuery, VehicleLookupResponse};
#[cfg(test)]
pub use vehicle_lookup_source::MockVehicleLookupSource;
pub use vehicle_lookup_source::{
    FixtureVehicleLookupSource, VehicleLookup, VehicleLookupError, VehicleLookupSource,
};
#[cfg(test)]
pub use vehicle_reconciliation_command::MockVehicleReconciliationCommand;
pub use vehicle_reconciliation_command::{
    DueSummary, ReconciliationCounters, ReconciliationReport, ReconciliationRequest, RunMode,
    StopReason, VehicleReconciliationCommand,
};
#[cfg(test)]
pub use vehicle_repository::MockVehicleRepository;
pub use vehicle_repository::{
    DueVehiclesQuery, FixtureVehicleRepository, VehicleEnrichmentUpdate, VehicleRepository,
    VehicleRepositoryError,
};
