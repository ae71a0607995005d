use connectors::{sql::error::ConnectorError, storage::error::StorageError};
use engine_core::error::ConfigError;
use engine_runtime::error::RuntimeError;
use model::entity::SchemaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid settings: {0}")]
    Settings(#[from] ConfigError),

    #[error("Invalid schema catalog: {0}")]
    Schema(#[from] SchemaError),

    #[error("Failed to connect to the record store: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Object store error: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to run the ingestion: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Either --entity or --all is required")]
    NoEntitySelected,
}
