//! Builders wiring adapters into the HTTP handler state.

use std::sync::Arc;

use actix_web::web;
use garage_backend::domain::{VehicleLookupService, VehicleReconciler, VehicleReconcilerPorts};
use garage_backend::inbound::http::state::{HttpState, HttpStatePorts};
use mockable::DefaultClock;

use super::ServerConfig;

/// Build handler state: one reconciler shared by every worker so its run
/// lock spans the whole process.
pub(crate) fn build_http_state(config: &ServerConfig) -> web::Data<HttpState> {
    let reconciler = VehicleReconciler::new(
        VehicleReconcilerPorts::new(config.lookup_source.clone(), config.repository.clone()),
        Arc::new(DefaultClock),
        config.reconciliation.clone(),
    );
    web::Data::new(HttpState::new(HttpStatePorts {
        reconciliation: Arc::new(reconciler),
        lookup: Arc::new(VehicleLookupService::new(config.lookup_source.clone())),
    }))
}
