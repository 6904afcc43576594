//! Driven port for bulk vehicle upserts from CSV imports.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{Registration, VehicleDetails};

/// One normalised import row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleImportRecord {
    /// Natural key.
    pub registration: Registration,
    /// Imported details; blank values stay blank.
    pub details: VehicleDetails,
}

/// Result of one upsert chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VehicleUpsertSummary {
    /// Rows that created a new vehicle.
    pub inserted: usize,
    /// Rows merged into an existing vehicle.
    pub merged: usize,
}

define_port_error! {
    /// Errors raised while upserting imported vehicles.
    pub enum VehicleImportRepositoryError {
        /// Connection could not be checked out or was lost.
        Connection { message: String } =>
            "vehicle import connection failed: {message}",
        /// Upsert statement failed.
        Query { message: String } =>
            "vehicle import query failed: {message}",
    }
}

/// Port for inserting or merging imported vehicles keyed by registration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VehicleImportRepository: Send + Sync {
    /// Upsert one chunk; existing populated values are never overwritten.
    async fn upsert_vehicles(
        &self,
        records: &[VehicleImportRecord],
    ) -> Result<VehicleUpsertSummary, VehicleImportRepositoryError>;
}
