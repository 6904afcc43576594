//! Driven port for reading due vehicles and writing reconciliation results.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::define_port_error;
use crate::domain::{Registration, VehicleDetails, VehicleRecord};

/// Selection of vehicles due for an external lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueVehiclesQuery {
    /// Vehicles last checked before this instant (or never) are due.
    pub stale_before: DateTime<Utc>,
    /// Maximum rows to return.
    pub limit: usize,
    /// Registrations attempted earlier in the run but left unstamped.
    pub exclude: Vec<Registration>,
}

/// One COALESCE merge plus timestamp stamp, applied atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleEnrichmentUpdate {
    /// Vehicle to update.
    pub registration: Registration,
    /// Remote snapshot; only fills blank stored values.
    pub enrichment: VehicleDetails,
    /// Attempt time written to `last_checked_at`.
    pub checked_at: DateTime<Utc>,
}

define_port_error! {
    /// Errors raised by vehicle persistence adapters.
    pub enum VehicleRepositoryError {
        /// Connection could not be checked out or was lost.
        Connection { message: String } =>
            "vehicle persistence connection failed: {message}",
        /// Query or mutation failed.
        Query { message: String } =>
            "vehicle persistence query failed: {message}",
        /// A database constraint rejected the write.
        Constraint { message: String } =>
            "vehicle persistence constraint violated: {message}",
    }
}

/// Port for the reconciliation worker's view of the vehicles table.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VehicleRepository: Send + Sync {
    /// Load up to `query.limit` due vehicles, never-checked first, then oldest.
    async fn fetch_due(
        &self,
        query: &DueVehiclesQuery,
    ) -> Result<Vec<VehicleRecord>, VehicleRepositoryError>;

    /// Count vehicles due at `stale_before`.
    async fn count_due(&self, stale_before: DateTime<Utc>) -> Result<u64, VehicleRepositoryError>;

    /// Merge blank fields from the snapshot and stamp `last_checked_at`.
    async fn apply_enrichment(
        &self,
        update: &VehicleEnrichmentUpdate,
    ) -> Result<(), VehicleRepositoryError>;

    /// Stamp `last_checked_at` without touching details.
    async fn mark_checked(
        &self,
        registration: &Registration,
        checked_at: DateTime<Utc>,
    ) -> Result<(), VehicleRepositoryError>;

    /// Load a single vehicle.
    async fn find(
        &self,
        registration: &Registration,
    ) -> Result<Option<VehicleRecord>, VehicleRepositoryError>;
}

/// Fixture implementation backed by an empty table.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureVehicleRepository;

#[async_trait]
impl VehicleRepository for FixtureVehicleRepository {
    async fn fetch_due(
        &self,
        _query: &DueVehiclesQuery,
    ) -> Result<Vec<VehicleRecord>, VehicleRepositoryError> {
        Ok(Vec::new())
    }

    async fn count_due(&self, _stale_before: DateTime<Utc>) -> Result<u64, VehicleRepositoryError> {
        Ok(0)
    }

    async fn apply_enrichment(
        &self,
        _update: &VehicleEnrichmentUpdate,
    ) -> Result<(), VehicleRepositoryError> {
        Ok(())
    }

    async fn mark_checked(
        &self,
        _registration: &Registration,
        _checked_at: DateTime<Utc>,
    ) -> Result<(), VehicleRepositoryError> {
        Ok(())
    }

    async fn find(
        &self,
        _registration: &Registration,
    ) -> Result<Option<VehicleRecord>, VehicleRepositoryError> {
        Ok(None)
    }
}
