//! Driving port for one interactive vehicle lookup.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Error, Registration, VehicleDetails};

/// Result of a single live lookup. Nothing is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleLookupResponse {
    /// Normalised registration that was looked up.
    pub registration: Registration,
    /// Lookup adapter name.
    pub source: String,
    /// Snapshot returned upstream; `None` when unknown or empty.
    pub vehicle: Option<VehicleDetails>,
}

impl VehicleLookupResponse {
    /// Return whether the upstream API returned usable data.
    pub fn found(&self) -> bool {
        self.vehicle.is_some()
    }
}

/// Driving port used by the vehicle lookup endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VehicleLookupQuery: Send + Sync {
    /// Look one registration up against the configured source.
    async fn lookup_vehicle(
        &self,
        registration: &Registration,
    ) -> Result<VehicleLookupResponse, Error>;
}
