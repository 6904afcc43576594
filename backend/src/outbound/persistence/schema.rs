//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Garage vehicles keyed by normalised registration.
    ///
    /// Enrichable columns are nullable until filled by import or lookup.
    /// `last_checked_at` is null for vehicles never looked up externally.
    vehicles (registration) {
        /// Upper-case alphanumeric registration, 1 to 8 characters.
        registration -> Varchar,
        make -> Nullable<Varchar>,
        model -> Nullable<Varchar>,
        colour -> Nullable<Varchar>,
        fuel_type -> Nullable<Varchar>,
        year_of_manufacture -> Nullable<Int4>,
        engine_capacity_cc -> Nullable<Int4>,
        mot_expiry_date -> Nullable<Date>,
        tax_status -> Nullable<Varchar>,
        tax_due_date -> Nullable<Date>,
        /// Last external lookup attempt.
        last_checked_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}
