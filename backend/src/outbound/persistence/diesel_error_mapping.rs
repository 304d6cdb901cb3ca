//! Shared Diesel error classification for the lending repositories.
//!
//! Each repository maps a [`DieselFailure`] onto the variants its port
//! exposes, so constraint violations surface as duplicates or missing
//! references instead of opaque query errors.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Storage failure reduced to the cases the ports distinguish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum DieselFailure {
    /// The store could not be reached or dropped the connection.
    Connection(String),
    /// A unique constraint rejected the write; carries the constraint name.
    UniqueViolation(String),
    /// A foreign key constraint rejected the write; carries the constraint name.
    ForeignKeyViolation(String),
    /// Any other query failure.
    Query(String),
}

/// Map pool errors into a repository-specific connection error constructor.
pub(super) fn map_pool_error_into<E, C>(error: PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    connection(message)
}

/// Classify a Diesel error, logging the database detail at debug level.
///
/// Database messages can quote row values, so only constraint names and
/// fixed strings leave this function.
pub(super) fn classify_diesel_error(error: DieselError) -> DieselFailure {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(
                ?kind,
                message = info.message(),
                constraint = info.constraint_name(),
                "diesel operation failed"
            );
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => DieselFailure::Query("record not found".to_owned()),
        DieselError::QueryBuilderError(_) => {
            DieselFailure::Query("database query error".to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            DieselFailure::Connection("database connection error".to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            DieselFailure::UniqueViolation(constraint_label(info.constraint_name()))
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
            DieselFailure::ForeignKeyViolation(constraint_label(info.constraint_name()))
        }
        DieselError::DeserializationError(_) | DieselError::SerializationError(_) => {
            DieselFailure::Query("database value could not be converted".to_owned())
        }
        _ => DieselFailure::Query("database error".to_owned()),
    }
}

fn constraint_label(name: Option<&str>) -> String {
    name.unwrap_or("unnamed constraint").to_owned()
}

/// Error type for transaction bodies that can reject a write.
///
/// Returning `Rejected` rolls the transaction back like any Diesel error.
#[derive(Debug)]
pub(super) enum TxError<E> {
    Diesel(DieselError),
    Rejected(E),
}

impl<E> From<DieselError> for TxError<E> {
    fn from(error: DieselError) -> Self {
        Self::Diesel(error)
    }
}

impl<E> TxError<E> {
    /// Collapse into the port error, mapping Diesel failures with `map`.
    pub(super) fn into_port<F>(self, map: F) -> E
    where
        F: FnOnce(DieselError) -> E,
    {
        match self {
            Self::Diesel(error) => map(error),
            Self::Rejected(error) => error,
        }
    }
}

/// Narrow a stored `INTEGER` version to the domain's unsigned counter.
pub(super) fn stored_version(value: i32, column: &str) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("{column} is negative: {value}"))
}

/// Widen a domain version for storage.
pub(super) fn storable_version(value: u32, column: &str) -> Result<i32, String> {
    i32::try_from(value).map_err(|_| format!("{column} overflows INTEGER: {value}"))
}
