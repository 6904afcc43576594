//! Interactive single-vehicle lookup service.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::ports::{
    VehicleLookup, VehicleLookupQuery, VehicleLookupResponse, VehicleLookupSource,
};
use crate::domain::vehicle_reconciliation::map_lookup_error;
use crate::domain::{Error, Registration};

/// Answers [`VehicleLookupQuery`] by calling the lookup source once.
#[derive(Clone)]
pub struct VehicleLookupService {
    source: Arc<dyn VehicleLookupSource>,
}

impl VehicleLookupService {
    /// Build the service around a lookup source.
    pub fn new(source: Arc<dyn VehicleLookupSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl VehicleLookupQuery for VehicleLookupService {
    async fn lookup_vehicle(
        &self,
        registration: &Registration,
    ) -> Result<VehicleLookupResponse, Error> {
        let source = self.source.source_name();
        let vehicle = match self.source.lookup(registration).await {
            Ok(VehicleLookup::Found(details)) if details.has_data() => Some(details),
            Ok(_) => None,
            Err(error) => {
                warn!(registration = %registration, source, %error, "interactive vehicle lookup failed");
                return Err(map_lookup_error(error));
            }
        };
        debug!(registration = %registration, source, found = vehicle.is_some(), "vehicle looked up");
        Ok(VehicleLookupResponse {
            registration: registration.clone(),
            source: source.to_owned(),
            vehicle,
        })
    }
}
