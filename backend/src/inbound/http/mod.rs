//! HTTP inbound adapter exposing REST endpoints.

use actix_web::web;

pub mod error;
pub mod health;
pub mod reconciliation;
pub mod schemas;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod validation;
pub mod vehicles;

pub use error::{ApiResult, ErrorEnvelope};

/// Register every `/api/v1` handler on a scope or app.
///
/// ```no_run
/// use actix_web::{App, web};
/// use garage_backend::inbound::http::configure_api;
///
/// let _app = App::new().service(web::scope("/api/v1").configure(configure_api));
/// ```
pub fn configure_api(config: &mut web::ServiceConfig) {
    config
        .service(reconciliation::start_reconciliation_run)
        .service(reconciliation::count_due_vehicles)
        .service(vehicles::lookup_vehicle);
}
