//! Interactive single-vehicle lookup endpoint.
//!
//! The lookup hits the configured vehicle API once and returns the result;
//! nothing is written to the store.

use actix_web::{HttpResponse, get, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::VehicleDetails;
use crate::domain::ports::VehicleLookupResponse;
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ErrorSchema, VehicleDetailsSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::parse_registration;

/// Response body for `GET /api/v1/vehicles/{registration}/lookup`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VehicleLookupResponseBody {
    pub success: bool,
    /// Whether the vehicle API returned any data.
    pub found: bool,
    /// Normalised registration that was looked up.
    #[schema(example = "AB12CDE")]
    pub registration: String,
    /// Vehicle API that answered.
    #[schema(example = "dvla")]
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<VehicleDetailsSchema>)]
    pub vehicle: Option<VehicleDetails>,
}

impl From<VehicleLookupResponse> for VehicleLookupResponseBody {
    fn from(value: VehicleLookupResponse) -> Self {
        Self {
            success: true,
            found: value.found(),
            registration: value.registration.into(),
            source: value.source,
            vehicle: value.vehicle,
        }
    }
}

/// Look up one vehicle in the configured vehicle API.
#[utoipa::path(
    get,
    path = "/api/v1/vehicles/{registration}/lookup",
    params(
        ("registration" = String, Path, description = "UK registration mark; spaces and case are normalised")
    ),
    responses(
        (status = 200, description = "Lookup result", body = VehicleLookupResponseBody),
        (status = 400, description = "Invalid registration", body = ErrorSchema),
        (status = 503, description = "Vehicle API unavailable, rate limited, or rejecting credentials", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["vehicles"],
    operation_id = "lookupVehicle"
)]
#[get("/vehicles/{registration}/lookup")]
pub async fn lookup_vehicle(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let registration = parse_registration(&path.into_inner())?;
    let response = state.lookup.lookup_vehicle(&registration).await?;
    Ok(HttpResponse::Ok().json(VehicleLookupResponseBody::from(response)))
}
