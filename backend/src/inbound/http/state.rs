//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{VehicleLookupQuery, VehicleReconciliationCommand};

/// Parameter object bundling the port implementations used by handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub reconciliation: Arc<dyn VehicleReconciliationCommand>,
    pub lookup: Arc<dyn VehicleLookupQuery>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub reconciliation: Arc<dyn VehicleReconciliationCommand>,
    pub lookup: Arc<dyn VehicleLookupQuery>,
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports)
    }
}

impl HttpState {
    /// Construct state from a ports bundle.
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use garage_backend::domain::ports::{FixtureVehicleLookupSource, FixtureVehicleRepository};
    /// use garage_backend::domain::{
    ///     ReconciliationConfig, VehicleLookupService, VehicleReconciler, VehicleReconcilerPorts,
    /// };
    /// use garage_backend::inbound::http::state::{HttpState, HttpStatePorts};
    /// use mockable::DefaultClock;
    ///
    /// let reconciler = VehicleReconciler::new(
    ///     VehicleReconcilerPorts::new(
    ///         Arc::new(FixtureVehicleLookupSource),
    ///         Arc::new(FixtureVehicleRepository),
    ///     ),
    ///     Arc::new(DefaultClock),
    ///     ReconciliationConfig::default(),
    /// );
    /// let state = HttpState::new(HttpStatePorts {
    ///     reconciliation: Arc::new(reconciler),
    ///     lookup: Arc::new(VehicleLookupService::new(Arc::new(FixtureVehicleLookupSource))),
    /// });
    /// let _lookup = state.lookup.clone();
    /// ```
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            reconciliation,
            lookup,
        } = ports;
        Self {
            reconciliation,
            lookup,
        }
    }
}
