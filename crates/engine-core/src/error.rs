use connectors::{file::csv::error::FileError, sql::error::DbError, storage::error::StorageError};
use model::core::data_type::CoercionError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Category of an error entry in an ingestion report.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SourceUnavailable,
    NoFilesFound,
    ParseError,
    ValidationError,
    CommitFailure,
    UnexpectedFailure,
}

/// Why a single row was rejected before staging.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("row has {found} field(s), expected {expected}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("field '{field}': {source}")]
    Coercion {
        field: String,
        #[source]
        source: CoercionError,
    },

    #[error("primary key '{field}' is empty")]
    MissingPrimaryKey { field: String },
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(#[from] StorageError),

    #[error("no files found under '{prefix}'")]
    NoFilesFound { prefix: String },

    #[error("parse error: {0}")]
    Parse(#[from] FileError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("batch failed: {0}")]
    Commit(String),

    #[error("lookup failed: {0}")]
    Lookup(DbError),

    #[error("{operation} timed out after {}ms", .timeout.as_millis())]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("{0}")]
    Unexpected(String),
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::SourceUnavailable(_) => ErrorKind::SourceUnavailable,
            IngestError::NoFilesFound { .. } => ErrorKind::NoFilesFound,
            IngestError::Parse(_) => ErrorKind::ParseError,
            IngestError::Validation(_) => ErrorKind::ValidationError,
            IngestError::Commit(_) => ErrorKind::CommitFailure,
            IngestError::Lookup(_) | IngestError::Timeout { .. } | IngestError::Unexpected(_) => {
                ErrorKind::UnexpectedFailure
            }
        }
    }

    pub fn cancelled() -> Self {
        IngestError::Unexpected("cancelled".to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
