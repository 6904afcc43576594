//! Shared error mapping for the vehicle repositories.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Coarse classification of a Diesel failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DieselFailure {
    Connection,
    Constraint,
    Query,
}

/// Extract a readable message from a pool error.
pub(crate) fn map_pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

/// Classify a Diesel error and emit debug context.
///
/// Database messages are logged at debug level only; the returned message
/// names the operation rather than echoing SQL details.
pub(crate) fn classify_diesel_error(
    error: &DieselError,
    operation: &str,
) -> (DieselFailure, String) {
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), %operation, "diesel operation failed");
        }
        other => debug!(error = %other, %operation, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => (
            DieselFailure::Connection,
            format!("{operation}: database connection closed"),
        ),
        DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation
            | DatabaseErrorKind::CheckViolation
            | DatabaseErrorKind::NotNullViolation
            | DatabaseErrorKind::ForeignKeyViolation,
            info,
        ) => (
            DieselFailure::Constraint,
            format!(
                "{operation}: constraint {} violated",
                info.constraint_name().unwrap_or("unknown")
            ),
        ),
        DieselError::DeserializationError(_) => (
            DieselFailure::Query,
            format!("{operation}: unreadable row"),
        ),
        _ => (DieselFailure::Query, format!("{operation}: database error")),
    }
}
