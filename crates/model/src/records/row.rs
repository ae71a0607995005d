use crate::core::value::{FieldValue, Value};
use serde::{Deserialize, Serialize};

/// One logical record of a source file, before any validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line where the record starts in its file.
    pub line: usize,
    pub fields: Vec<String>,
}

impl RawRow {
    pub fn new(line: usize, fields: Vec<String>) -> Self {
        RawRow { line, fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A typed record conforming to an entity schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RowData {
    pub entity: String,
    pub field_values: Vec<FieldValue>,
}

impl RowData {
    pub fn new(entity: &str, field_values: Vec<FieldValue>) -> Self {
        RowData {
            entity: entity.to_string(),
            field_values,
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.field_values
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(field))
    }

    pub fn get_value(&self, field: &str) -> Value {
        self.get(field)
            .and_then(|f| f.value.clone())
            .unwrap_or(Value::Null)
    }

    /// Fields the source actually provided.
    pub fn present_fields(&self) -> impl Iterator<Item = &FieldValue> {
        self.field_values.iter().filter(|f| f.is_set())
    }

    /// Overlays the set fields of `changes` onto this record.
    pub fn apply(&mut self, changes: &[FieldValue]) {
        for change in changes.iter().filter(|c| c.is_set()) {
            match self
                .field_values
                .iter_mut()
                .find(|f| f.name.eq_ignore_ascii_case(&change.name))
            {
                Some(existing) => existing.value = change.value.clone(),
                None => self.field_values.push(change.clone()),
            }
        }
    }
}
