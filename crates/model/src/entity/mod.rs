pub mod catalog;
pub mod error;
pub mod schema;

pub use catalog::SchemaCatalog;
pub use error::SchemaError;
pub use schema::{EntitySchema, FieldDef, ForeignKey};
