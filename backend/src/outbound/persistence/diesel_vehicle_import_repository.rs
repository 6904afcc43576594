//! PostgreSQL-backed bulk upsert for imported vehicles.

use async_trait::async_trait;
use diesel::sql_query;
use diesel::sql_types::{Array, Date, Int4, Nullable, Text};
use diesel_async::RunQueryDsl;

use super::diesel_helpers::{DieselFailure, classify_diesel_error, map_pool_error_message};
use super::models::{UpsertOutcomeRow, VehicleColumns};
use super::pool::{DbPool, PoolError};
use crate::domain::ports::{
    VehicleImportRecord, VehicleImportRepository, VehicleImportRepositoryError,
    VehicleUpsertSummary,
};

/// Diesel-backed implementation of [`VehicleImportRepository`].
#[derive(Clone)]
pub struct DieselVehicleImportRepository {
    pool: DbPool,
}

impl DieselVehicleImportRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// `xmax = 0` holds only for rows this statement inserted.
const UPSERT_VEHICLES_SQL: &str = r#"
INSERT INTO vehicles (
    registration, make, model, colour, fuel_type, year_of_manufacture,
    engine_capacity_cc, mot_expiry_date, tax_status, tax_due_date
)
SELECT * FROM unnest(
    $1::text[],
    $2::text[],
    $3::text[],
    $4::text[],
    $5::text[],
    $6::int4[],
    $7::int4[],
    $8::date[],
    $9::text[],
    $10::date[]
)
ON CONFLICT (registration)
DO UPDATE SET
    make = COALESCE(NULLIF(BTRIM(vehicles.make), ''), EXCLUDED.make),
    model = COALESCE(NULLIF(BTRIM(vehicles.model), ''), EXCLUDED.model),
    colour = COALESCE(NULLIF(BTRIM(vehicles.colour), ''), EXCLUDED.colour),
    fuel_type = COALESCE(NULLIF(BTRIM(vehicles.fuel_type), ''), EXCLUDED.fuel_type),
    year_of_manufacture = COALESCE(vehicles.year_of_manufacture, EXCLUDED.year_of_manufacture),
    engine_capacity_cc = COALESCE(vehicles.engine_capacity_cc, EXCLUDED.engine_capacity_cc),
    mot_expiry_date = COALESCE(vehicles.mot_expiry_date, EXCLUDED.mot_expiry_date),
    tax_status = COALESCE(NULLIF(BTRIM(vehicles.tax_status), ''), EXCLUDED.tax_status),
    tax_due_date = COALESCE(vehicles.tax_due_date, EXCLUDED.tax_due_date),
    updated_at = now()
RETURNING (xmax = 0) AS inserted
"#;

fn map_pool_error(error: PoolError) -> VehicleImportRepositoryError {
    VehicleImportRepositoryError::connection(map_pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> VehicleImportRepositoryError {
    match classify_diesel_error(&error, "upsert imported vehicles") {
        (DieselFailure::Connection, message) => VehicleImportRepositoryError::connection(message),
        (DieselFailure::Constraint | DieselFailure::Query, message) => {
            VehicleImportRepositoryError::query(message)
        }
    }
}

fn to_columns(records: &[VehicleImportRecord]) -> VehicleColumns {
    let mut columns = VehicleColumns::default();
    for record in records {
        columns.push(&record.registration, &record.details);
    }
    columns
}

#[async_trait]
impl VehicleImportRepository for DieselVehicleImportRepository {
    async fn upsert_vehicles(
        &self,
        records: &[VehicleImportRecord],
    ) -> Result<VehicleUpsertSummary, VehicleImportRepositoryError> {
        if records.is_empty() {
            return Ok(VehicleUpsertSummary::default());
        }

        let columns = to_columns(records);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let outcomes = sql_query(UPSERT_VEHICLES_SQL)
            .bind::<Array<Text>, _>(&columns.registrations)
            .bind::<Array<Nullable<Text>>, _>(&columns.makes)
            .bind::<Array<Nullable<Text>>, _>(&columns.models)
            .bind::<Array<Nullable<Text>>, _>(&columns.colours)
            .bind::<Array<Nullable<Text>>, _>(&columns.fuel_types)
            .bind::<Array<Nullable<Int4>>, _>(&columns.years)
            .bind::<Array<Nullable<Int4>>, _>(&columns.engine_capacities)
            .bind::<Array<Nullable<Date>>, _>(&columns.mot_expiry_dates)
            .bind::<Array<Nullable<Text>>, _>(&columns.tax_statuses)
            .bind::<Array<Nullable<Date>>, _>(&columns.tax_due_dates)
            .load::<UpsertOutcomeRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let inserted = outcomes.iter().filter(|outcome| outcome.inserted).count();
        Ok(VehicleUpsertSummary {
            inserted,
            merged: outcomes.len() - inserted,
        })
    }
}
