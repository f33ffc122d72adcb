use sea_orm::{DbErr, RuntimeErr, SqlErr, sqlx};
use thiserror::Error;
use tracing::warn;

/// Error types for the compute module
#[derive(Error, Debug)]
pub enum ComputeError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Input could not be parsed into a calendar date
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Unknown IANA time zone name
    #[error("Invalid time zone: {0}")]
    InvalidTimezone(String),

    /// A business rule was violated (non-positive amount, inverted range, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested period or transaction does not exist for this user
    #[error("Not found: {0}")]
    NotFound(String),

    /// The write would break a uniqueness rule, e.g. overlapping periods
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Ledger arithmetic left the range of `Decimal`
    #[error("Amount overflow: {0}")]
    Overflow(String),
}

impl ComputeError {
    /// Reclassifies constraint violations reported by the storage driver.
    pub fn from_write(err: DbErr, what: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                warn!(%detail, "Unique constraint violated while writing {}", what);
                ComputeError::Conflict(format!("{} conflicts with an existing record", what))
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                warn!(%detail, "Foreign key violated while writing {}", what);
                ComputeError::Validation(format!("{} references a missing record", what))
            }
            _ if is_serialization_failure(&err) => {
                warn!(error = %err, "Concurrent write lost the race while writing {}", what);
                ComputeError::Conflict(format!(
                    "{} conflicts with a concurrent change, retry the request",
                    what
                ))
            }
            _ => ComputeError::Database(err),
        }
    }
}

/// SQLSTATE codes a serializable transaction fails with when a concurrent writer wins.
const SERIALIZATION_FAILURE_CODES: &[&str] = &["40001", "40P01"];

fn is_serialization_failure(err: &DbErr) -> bool {
    let (DbErr::Exec(RuntimeErr::SqlxError(sqlx_err))
    | DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
    | DbErr::Conn(RuntimeErr::SqlxError(sqlx_err))) = err
    else {
        return false;
    };
    match sqlx_err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .is_some_and(|code| SERIALIZATION_FAILURE_CODES.contains(&code.as_ref())),
        _ => false,
    }
}

/// Type alias for Result with ComputeError
pub type Result<T> = std::result::Result<T, ComputeError>;
