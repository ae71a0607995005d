use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("Object not found: {container}/{key}")]
    KeyNotFound { container: String, key: String },

    /// Timeouts, dropped connections and throttling.
    #[error("Transient storage error: {0}")]
    Transient(String),

    #[error("Storage service error: {0}")]
    Service(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage configuration: {0}")]
    Config(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::ContainerNotFound(_) | StorageError::KeyNotFound { .. }
        )
    }
}
