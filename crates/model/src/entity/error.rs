use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Entity '{entity}' declares primary key '{field}' which is not one of its fields")]
    MissingPrimaryKey { entity: String, field: String },

    #[error("Entity '{entity}' declares field '{field}' more than once")]
    DuplicateField { entity: String, field: String },

    #[error("Entity '{entity}' has no fields")]
    EmptySchema { entity: String },

    #[error("Foreign key '{entity}.{field}' references unknown {target}")]
    InvalidForeignKey {
        entity: String,
        field: String,
        target: String,
    },

    #[error("Entity '{0}' is defined more than once")]
    DuplicateEntity(String),

    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("Circular dependency detected between entities: {0}")]
    CircularReference(String),

    #[error("Failed to parse schema catalog: {0}")]
    Parse(String),
}
