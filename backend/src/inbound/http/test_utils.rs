//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};

use crate::domain::ports::{MockVehicleLookupQuery, MockVehicleReconciliationCommand};
use crate::inbound::http::state::{HttpState, HttpStatePorts};

/// Wrap mocks into shared handler state.
pub fn mock_state(
    reconciliation: MockVehicleReconciliationCommand,
    lookup: MockVehicleLookupQuery,
) -> web::Data<HttpState> {
    web::Data::new(HttpState::new(HttpStatePorts {
        reconciliation: Arc::new(reconciliation),
        lookup: Arc::new(lookup),
    }))
}

/// Build an app exposing the `/api/v1` surface over the given state.
pub fn test_app(
    state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(state)
        .app_data(crate::inbound::http::validation::json_config())
        .service(web::scope("/api/v1").configure(crate::inbound::http::configure_api))
}
