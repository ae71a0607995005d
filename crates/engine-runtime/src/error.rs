use model::entity::SchemaError;
use thiserror::Error;

/// Errors that prevent a run from starting. Failures while ingesting are
/// recorded in the reports instead.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Invalid entity request: {0}")]
    Schema(#[from] SchemaError),

    #[error("No entities requested")]
    NothingRequested,
}
