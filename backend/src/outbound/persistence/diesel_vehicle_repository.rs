//! PostgreSQL-backed vehicle repository for the reconciliation worker.
//!
//! Due-row selection uses the Diesel DSL. The enrichment merge is one raw
//! `UPDATE` so the COALESCE rule and the timestamp stamp land atomically.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::now;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{Date, Int4, Nullable, Text, Timestamptz};
use diesel_async::RunQueryDsl;

use super::diesel_helpers::{DieselFailure, classify_diesel_error, map_pool_error_message};
use super::models::VehicleRow;
use super::pool::{DbPool, PoolError};
use super::schema::vehicles;
use crate::domain::ports::{
    DueVehiclesQuery, VehicleEnrichmentUpdate, VehicleRepository, VehicleRepositoryError,
};
use crate::domain::{Registration, VehicleRecord};

/// Diesel-backed implementation of [`VehicleRepository`].
#[derive(Clone)]
pub struct DieselVehicleRepository {
    pool: DbPool,
}

impl DieselVehicleRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const APPLY_ENRICHMENT_SQL: &str = r#"
UPDATE vehicles SET
    make = COALESCE(NULLIF(BTRIM(make), ''), NULLIF(BTRIM($2), '')),
    model = COALESCE(NULLIF(BTRIM(model), ''), NULLIF(BTRIM($3), '')),
    colour = COALESCE(NULLIF(BTRIM(colour), ''), NULLIF(BTRIM($4), '')),
    fuel_type = COALESCE(NULLIF(BTRIM(fuel_type), ''), NULLIF(BTRIM($5), '')),
    year_of_manufacture = COALESCE(year_of_manufacture, $6),
    engine_capacity_cc = COALESCE(engine_capacity_cc, $7),
    mot_expiry_date = COALESCE(mot_expiry_date, $8),
    tax_status = COALESCE(NULLIF(BTRIM(tax_status), ''), NULLIF(BTRIM($9), '')),
    tax_due_date = COALESCE(tax_due_date, $10),
    last_checked_at = $11,
    updated_at = now()
WHERE registration = $1
"#;

fn map_pool_error(error: PoolError) -> VehicleRepositoryError {
    VehicleRepositoryError::connection(map_pool_error_message(error))
}

fn map_diesel_error(
    operation: &'static str,
) -> impl Fn(diesel::result::Error) -> VehicleRepositoryError {
    move |error| match classify_diesel_error(&error, operation) {
        (DieselFailure::Connection, message) => VehicleRepositoryError::connection(message),
        (DieselFailure::Constraint, message) => VehicleRepositoryError::constraint(message),
        (DieselFailure::Query, message) => VehicleRepositoryError::query(message),
    }
}

fn into_record(row: VehicleRow) -> Result<VehicleRecord, VehicleRepositoryError> {
    let stored = row.registration.clone();
    VehicleRecord::try_from(row).map_err(|error| {
        VehicleRepositoryError::query(format!("stored registration {stored:?} is invalid: {error}"))
    })
}

fn limit_to_i64(limit: usize) -> Result<i64, VehicleRepositoryError> {
    i64::try_from(limit)
        .map_err(|_| VehicleRepositoryError::query("requested limit exceeds i64 range"))
}

#[async_trait]
impl VehicleRepository for DieselVehicleRepository {
    async fn fetch_due(
        &self,
        query: &DueVehiclesQuery,
    ) -> Result<Vec<VehicleRecord>, VehicleRepositoryError> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }
        let limit = limit_to_i64(query.limit)?;
        let excluded = query
            .exclude
            .iter()
            .map(|registration| registration.as_str().to_owned())
            .collect::<Vec<_>>();

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut select = vehicles::table
            .select(VehicleRow::as_select())
            .filter(
                vehicles::last_checked_at
                    .is_null()
                    .or(vehicles::last_checked_at.lt(query.stale_before)),
            )
            .into_boxed();
        if !excluded.is_empty() {
            select = select.filter(vehicles::registration.ne_all(excluded));
        }

        let rows = select
            .order((
                vehicles::last_checked_at.asc().nulls_first(),
                vehicles::registration.asc(),
            ))
            .limit(limit)
            .load::<VehicleRow>(&mut conn)
            .await
            .map_err(map_diesel_error("fetch due vehicles"))?;

        rows.into_iter().map(into_record).collect()
    }

    async fn count_due(&self, stale_before: DateTime<Utc>) -> Result<u64, VehicleRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let count = vehicles::table
            .filter(
                vehicles::last_checked_at
                    .is_null()
                    .or(vehicles::last_checked_at.lt(stale_before)),
            )
            .count()
            .get_result::<i64>(&mut conn)
            .await
            .map_err(map_diesel_error("count due vehicles"))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn apply_enrichment(
        &self,
        update: &VehicleEnrichmentUpdate,
    ) -> Result<(), VehicleRepositoryError> {
        let details = &update.enrichment;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        sql_query(APPLY_ENRICHMENT_SQL)
            .bind::<Text, _>(update.registration.as_str())
            .bind::<Nullable<Text>, _>(details.make.as_deref())
            .bind::<Nullable<Text>, _>(details.model.as_deref())
            .bind::<Nullable<Text>, _>(details.colour.as_deref())
            .bind::<Nullable<Text>, _>(details.fuel_type.as_deref())
            .bind::<Nullable<Int4>, _>(details.year_of_manufacture)
            .bind::<Nullable<Int4>, _>(details.engine_capacity_cc)
            .bind::<Nullable<Date>, _>(details.mot_expiry_date)
            .bind::<Nullable<Text>, _>(details.tax_status.as_deref())
            .bind::<Nullable<Date>, _>(details.tax_due_date)
            .bind::<Timestamptz, _>(update.checked_at)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error("apply vehicle enrichment"))
    }

    async fn mark_checked(
        &self,
        registration: &Registration,
        checked_at: DateTime<Utc>,
    ) -> Result<(), VehicleRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(vehicles::table.find(registration.as_str()))
            .set((
                vehicles::last_checked_at.eq(checked_at),
                vehicles::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error("stamp vehicle checked"))
    }

    async fn find(
        &self,
        registration: &Registration,
    ) -> Result<Option<VehicleRecord>, VehicleRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = vehicles::table
            .find(registration.as_str())
            .select(VehicleRow::as_select())
            .first::<VehicleRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error("find vehicle"))?;
        row.map(into_record).transpose()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn enrichment_update_never_overwrites_populated_columns() {
        for column in [
            "make", "model", "colour", "fuel_type", "tax_status",
        ] {
            assert!(
                APPLY_ENRICHMENT_SQL.contains(&format!(
                    "{column} = COALESCE(NULLIF(BTRIM({column}), ''),"
                )),
                "{column} should keep stored values first"
            );
        }
        for column in [
            "year_of_manufacture",
            "engine_capacity_cc",
            "mot_expiry_date",
            "tax_due_date",
        ] {
            assert!(
                APPLY_ENRICHMENT_SQL.contains(&format!("{column} = COALESCE({column},")),
                "{column} should keep stored values first"
            );
        }
    }

    #[rstest]
    fn invalid_stored_registrations_surface_as_query_errors() {
        let row = VehicleRow {
            registration: "AB-12".to_owned(),
            make: None,
            model: None,
            colour: None,
            fuel_type: None,
            year_of_manufacture: None,
            engine_capacity_cc: None,
            mot_expiry_date: None,
            tax_status: None,
            tax_due_date: None,
            last_checked_at: None,
        };
        let error = into_record(row).expect_err("conversion should fail");
        assert!(matches!(error, VehicleRepositoryError::Query { .. }));
    }
}
