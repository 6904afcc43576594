//! Internal Diesel row structs for the vehicles table.
//!
//! These types never leave the persistence layer; repositories convert them
//! into domain records.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::sql_types::Bool;

use super::schema::vehicles;
use crate::domain::{Registration, RegistrationValidationError, VehicleDetails, VehicleRecord};

/// Row struct for reading from the vehicles table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = vehicles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct VehicleRow {
    pub registration: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub colour: Option<String>,
    pub fuel_type: Option<String>,
    pub year_of_manufacture: Option<i32>,
    pub engine_capacity_cc: Option<i32>,
    pub mot_expiry_date: Option<NaiveDate>,
    pub tax_status: Option<String>,
    pub tax_due_date: Option<NaiveDate>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl TryFrom<VehicleRow> for VehicleRecord {
    type Error = RegistrationValidationError;

    fn try_from(row: VehicleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            registration: Registration::parse(&row.registration)?,
            details: VehicleDetails {
                make: row.make,
                model: row.model,
                colour: row.colour,
                fuel_type: row.fuel_type,
                year_of_manufacture: row.year_of_manufacture,
                engine_capacity_cc: row.engine_capacity_cc,
                mot_expiry_date: row.mot_expiry_date,
                tax_status: row.tax_status,
                tax_due_date: row.tax_due_date,
            },
            last_checked_at: row.last_checked_at,
        })
    }
}

/// Per-row result of the import upsert's `RETURNING` clause.
#[derive(Debug, Clone, Copy, QueryableByName)]
pub(crate) struct UpsertOutcomeRow {
    #[diesel(sql_type = Bool)]
    pub inserted: bool,
}

/// Column-major view of a chunk, bound as arrays into one `unnest` upsert.
#[derive(Debug, Default)]
pub(crate) struct VehicleColumns {
    pub registrations: Vec<String>,
    pub makes: Vec<Option<String>>,
    pub models: Vec<Option<String>>,
    pub colours: Vec<Option<String>>,
    pub fuel_types: Vec<Option<String>>,
    pub years: Vec<Option<i32>>,
    pub engine_capacities: Vec<Option<i32>>,
    pub mot_expiry_dates: Vec<Option<NaiveDate>>,
    pub tax_statuses: Vec<Option<String>>,
    pub tax_due_dates: Vec<Option<NaiveDate>>,
}

impl VehicleColumns {
    pub(crate) fn push(&mut self, registration: &Registration, details: &VehicleDetails) {
        self.registrations.push(registration.as_str().to_owned());
        self.makes.push(details.make.clone());
        self.models.push(details.model.clone());
        self.colours.push(details.colour.clone());
        self.fuel_types.push(details.fuel_type.clone());
        self.years.push(details.year_of_manufacture);
        self.engine_capacities.push(details.engine_capacity_cc);
        self.mot_expiry_dates.push(details.mot_expiry_date);
        self.tax_statuses.push(details.tax_status.clone());
        self.tax_due_dates.push(details.tax_due_date);
    }
}
