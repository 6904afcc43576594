//! DTOs for the DVSA MOT history API and its token endpoint.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::domain::VehicleDetails;
use crate::outbound::vehicle_api::non_blank;

#[derive(Debug, Deserialize)]
pub(super) struct TokenResponseDto {
    pub(super) access_token: String,
    #[serde(default = "default_expires_in")]
    pub(super) expires_in: u64,
}

fn default_expires_in() -> u64 {
    3_600
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MotVehicleDto {
    pub(super) make: Option<String>,
    pub(super) model: Option<String>,
    pub(super) primary_colour: Option<String>,
    pub(super) fuel_type: Option<String>,
    pub(super) manufacture_date: Option<NaiveDate>,
    pub(super) engine_size: Option<String>,
    #[serde(default)]
    pub(super) mot_tests: Vec<MotTestDto>,
    pub(super) mot_test_due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MotTestDto {
    pub(super) expiry_date: Option<NaiveDate>,
}

impl MotVehicleDto {
    /// The MOT history API carries no tax data.
    pub(super) fn into_details(self) -> VehicleDetails {
        let mot_expiry_date = self
            .mot_tests
            .iter()
            .filter_map(|test| test.expiry_date)
            .max()
            .or(self.mot_test_due_date);
        VehicleDetails {
            make: non_blank(self.make),
            model: non_blank(self.model),
            colour: non_blank(self.primary_colour),
            fuel_type: non_blank(self.fuel_type),
            year_of_manufacture: self.manufacture_date.map(|date| date.year()),
            engine_capacity_cc: self
                .engine_size
                .and_then(|size| size.trim().parse::<i32>().ok())
                .filter(|size| *size > 0),
            mot_expiry_date,
            tax_status: None,
            tax_due_date: None,
        }
    }
}
