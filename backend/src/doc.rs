//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers the reconciliation, lookup, and health endpoints along
//! with the schema wrappers from [`crate::inbound::http::schemas`], so domain
//! types stay free of utoipa derives.
//!
//! The document backs Swagger UI (debug builds) and is exported via
//! `cargo run --bin openapi-dump` for external tooling.

use utoipa::OpenApi;

use crate::inbound::http::reconciliation::{
    DueVehiclesResponse, ReconciliationCountersBody, ReconciliationReportBody,
    ReconciliationRunResponse, RunModeBody, StartReconciliationRequest, StopReasonBody,
};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema, VehicleDetailsSchema};
use crate::inbound::http::vehicles::VehicleLookupResponseBody;

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Garage vehicle data API",
        description = "Reconciles stored vehicle details against the DVLA and DVSA APIs."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::reconciliation::start_reconciliation_run,
        crate::inbound::http::reconciliation::count_due_vehicles,
        crate::inbound::http::vehicles::lookup_vehicle,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        VehicleDetailsSchema,
        StartReconciliationRequest,
        RunModeBody,
        ReconciliationRunResponse,
        ReconciliationReportBody,
        ReconciliationCountersBody,
        StopReasonBody,
        DueVehiclesResponse,
        VehicleLookupResponseBody,
    )),
    tags(
        (name = "reconciliation", description = "Batch vehicle reconciliation runs"),
        (name = "vehicles", description = "Interactive vehicle lookups"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
