//! OpenAPI schema definitions for domain types.
//!
//! Domain types remain framework-agnostic by not deriving `ToSchema`. The
//! wrappers here mirror their wire shape so utoipa can document them from the
//! inbound adapter layer.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// The requested resource does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// A reconciliation run is already in progress.
    #[schema(rename = "conflict")]
    Conflict,
    /// The database or vehicle API is unavailable.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for the error envelope returned by every endpoint.
#[derive(ToSchema)]
#[schema(as = ErrorResponse)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    /// Always `false` for errors.
    #[schema(example = false)]
    success: bool,
    /// Human-readable message returned to clients.
    #[schema(example = "registration must not be empty")]
    error: String,
    /// Stable machine-readable error code.
    code: ErrorCodeSchema,
    /// Supplementary error details for clients.
    details: Option<serde_json::Value>,
}

/// OpenAPI schema for [`crate::domain::VehicleDetails`].
#[derive(ToSchema)]
#[schema(as = VehicleDetails)]
#[schema(rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct VehicleDetailsSchema {
    #[schema(example = "FORD")]
    make: Option<String>,
    #[schema(example = "FOCUS")]
    model: Option<String>,
    #[schema(example = "BLUE")]
    colour: Option<String>,
    #[schema(example = "PETROL")]
    fuel_type: Option<String>,
    #[schema(example = 2015)]
    year_of_manufacture: Option<i32>,
    #[schema(example = 1596)]
    engine_capacity_cc: Option<i32>,
    #[schema(value_type = Option<String>, format = Date, example = "2025-03-01")]
    mot_expiry_date: Option<String>,
    #[schema(example = "Taxed")]
    tax_status: Option<String>,
    #[schema(value_type = Option<String>, format = Date, example = "2025-06-01")]
    tax_due_date: Option<String>,
}
