//! DTOs for the DVLA Vehicle Enquiry Service.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::VehicleDetails;
use crate::outbound::vehicle_api::non_blank;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct VehicleEnquiryRequestDto<'a> {
    pub(super) registration_number: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct VehicleEnquiryResponseDto {
    pub(super) make: Option<String>,
    pub(super) colour: Option<String>,
    pub(super) fuel_type: Option<String>,
    pub(super) year_of_manufacture: Option<i32>,
    pub(super) engine_capacity: Option<i32>,
    pub(super) mot_expiry_date: Option<NaiveDate>,
    pub(super) tax_status: Option<String>,
    pub(super) tax_due_date: Option<NaiveDate>,
}

impl VehicleEnquiryResponseDto {
    /// DVLA does not report the model.
    pub(super) fn into_details(self) -> VehicleDetails {
        VehicleDetails {
            make: non_blank(self.make),
            model: None,
            colour: non_blank(self.colour),
            fuel_type: non_blank(self.fuel_type),
            year_of_manufacture: self.year_of_manufacture,
            engine_capacity_cc: self.engine_capacity.filter(|capacity| *capacity > 0),
            mot_expiry_date: self.mot_expiry_date,
            tax_status: non_blank(self.tax_status),
            tax_due_date: self.tax_due_date,
        }
    }
}
