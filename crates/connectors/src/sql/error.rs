use std::time::Duration;
use thiserror::Error;

/// Errors raised while reading or writing records.
#[derive(Debug, Error)]
pub enum DbError {
    /// Any driver error that is not a constraint violation.
    #[error("SQL error: {0}")]
    Sql(tokio_postgres::Error),

    /// Primary-key, foreign-key, not-null or check violation.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// A value does not fit the declared type of its column.
    #[error("Cannot store {value} in '{field}' ({data_type})")]
    Coercion {
        field: String,
        value: String,
        data_type: String,
    },

    #[error("Cannot decode column '{column}': {reason}")]
    Decode { column: String, reason: String },

    /// Writing rows failed at the application level.
    #[error("Write error: {0}")]
    Write(String),

    /// The statements of a batch did not finish in time. Nothing was committed.
    #[error("commit timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl From<tokio_postgres::Error> for DbError {
    fn from(err: tokio_postgres::Error) -> Self {
        // Class 23 is "integrity constraint violation".
        if let Some(db) = err.as_db_error()
            && db.code().code().starts_with("23")
        {
            let message = match db.detail() {
                Some(detail) => format!("{} ({detail})", db.message()),
                None => db.message().to_string(),
            };
            return DbError::Constraint(message);
        }
        DbError::Sql(err)
    }
}

/// Errors happening during connection setup.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    #[error("Postgres connection failed: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),
}
