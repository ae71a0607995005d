use crate::{core::data_type::DataType, entity::error::SchemaError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForeignKey {
    pub field: String,
    /// Name of the referenced entity; the reference targets its primary key.
    pub references: String,
}

/// Static description of one target table: ordered typed fields, the primary key
/// and the foreign keys that decide processing order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntitySchema {
    pub name: String,
    pub table: String,
    pub primary_key: String,
    pub fields: Vec<FieldDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKey>,
}

impl EntitySchema {
    pub fn new(name: &str, table: &str, primary_key: &str) -> Self {
        EntitySchema {
            name: name.to_string(),
            table: table.to_string(),
            primary_key: primary_key.to_string(),
            fields: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn field(mut self, name: &str, data_type: DataType) -> Self {
        self.fields.push(FieldDef {
            name: name.to_string(),
            data_type,
        });
        self
    }

    pub fn foreign_key(mut self, field: &str, references: &str) -> Self {
        self.foreign_keys.push(ForeignKey {
            field: field.to_string(),
            references: references.to_string(),
        });
        self
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn field_def(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn primary_key_def(&self) -> Option<&FieldDef> {
        self.field_def(&self.primary_key)
    }

    /// Object-store folder holding this entity's files, e.g. `Department/`.
    pub fn folder_prefix(&self) -> String {
        format!("{}/", self.name)
    }

    /// Entities that must be fully ingested before this one starts.
    pub fn dependencies(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = Vec::new();
        for fk in &self.foreign_keys {
            if !fk.references.eq_ignore_ascii_case(&self.name)
                && !deps.contains(&fk.references.as_str())
            {
                deps.push(fk.references.as_str());
            }
        }
        deps
    }

    /// Checks the schema on its own; cross-entity references are checked by the catalog.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.fields.is_empty() {
            return Err(SchemaError::EmptySchema {
                entity: self.name.clone(),
            });
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.to_lowercase()) {
                return Err(SchemaError::DuplicateField {
                    entity: self.name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        if self.primary_key_def().is_none() {
            return Err(SchemaError::MissingPrimaryKey {
                entity: self.name.clone(),
                field: self.primary_key.clone(),
            });
        }

        for fk in &self.foreign_keys {
            if self.field_def(&fk.field).is_none() {
                return Err(SchemaError::InvalidForeignKey {
                    entity: self.name.clone(),
                    field: fk.field.clone(),
                    target: format!("field '{}'", fk.field),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee() -> EntitySchema {
        EntitySchema::new("Employee", "employee", "id")
            .field("id", DataType::Int)
            .field("name", DataType::String)
            .field("department_id", DataType::Int)
            .field("job_id", DataType::Int)
            .foreign_key("department_id", "Department")
            .foreign_key("job_id", "Job")
    }

    #[test]
    fn dependencies_follow_foreign_keys() {
        assert_eq!(employee().dependencies(), vec!["Department", "Job"]);
        assert_eq!(employee().folder_prefix(), "Employee/");
    }

    #[test]
    fn rejects_missing_primary_key() {
        let schema = EntitySchema::new("Job", "job", "job_id").field("id", DataType::Int);
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::MissingPrimaryKey { .. })
        ));
    }

    #[test]
    fn rejects_foreign_key_on_unknown_field() {
        let schema = EntitySchema::new("Employee", "employee", "id")
            .field("id", DataType::Int)
            .foreign_key("dept", "Department");
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::InvalidForeignKey { .. })
        ));
    }

    #[test]
    fn deserializes_type_aliases() {
        let json = r#"{
            "name": "Job", "table": "job", "primary_key": "id",
            "fields": [{"name": "id", "type": "integer"}, {"name": "job", "type": "varchar"}]
        }"#;
        let schema: EntitySchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.fields[0].data_type, DataType::Int);
        assert_eq!(schema.fields[1].data_type, DataType::String);
        assert!(schema.foreign_keys.is_empty());
        schema.validate().unwrap();
    }
}
