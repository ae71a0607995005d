use engine_core::error::ValidationError;
use model::{
    core::value::FieldValue,
    entity::EntitySchema,
    records::row::{RawRow, RowData},
};

/// Turns raw rows into typed records of one entity.
pub struct RecordMapper<'a> {
    schema: &'a EntitySchema,
}

impl<'a> RecordMapper<'a> {
    pub fn new(schema: &'a EntitySchema) -> Self {
        RecordMapper { schema }
    }

    /// Values are matched to fields by position. Blank values become unset
    /// fields; a blank primary key rejects the row.
    pub fn map(&self, raw: &RawRow) -> Result<RowData, ValidationError> {
        let expected = self.schema.field_count();
        if raw.len() != expected {
            return Err(ValidationError::ShapeMismatch {
                expected,
                found: raw.len(),
            });
        }

        let mut field_values = Vec::with_capacity(expected);
        for (def, cell) in self.schema.fields.iter().zip(&raw.fields) {
            let value = def
                .data_type
                .parse_value(cell)
                .map_err(|source| ValidationError::Coercion {
                    field: def.name.clone(),
                    source,
                })?;

            if value.is_none() && def.name.eq_ignore_ascii_case(&self.schema.primary_key) {
                return Err(ValidationError::MissingPrimaryKey {
                    field: def.name.clone(),
                });
            }

            field_values.push(FieldValue::new(&def.name, value, def.data_type));
        }

        Ok(RowData::new(&self.schema.name, field_values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{core::value::Value, entity::SchemaCatalog};

    fn raw(fields: &[&str]) -> RawRow {
        RawRow::new(1, fields.iter().map(|f| f.to_string()).collect())
    }

    #[test]
    fn maps_fields_by_position() {
        let catalog = SchemaCatalog::builtin();
        let mapper = RecordMapper::new(catalog.get("Employee").unwrap());
        let record = mapper
            .map(&raw(&["4535", "Marcelo Gonzalez", "2021-07-27T16:02:08Z", "1", "2"]))
            .unwrap();

        assert_eq!(record.get_value("id"), Value::Int(4535));
        assert_eq!(record.get_value("name"), Value::String("Marcelo Gonzalez".into()));
        assert_eq!(record.get_value("job_id"), Value::Int(2));
        assert!(matches!(record.get_value("hire_date"), Value::Timestamp(_)));
    }

    #[test]
    fn blank_cells_are_unset() {
        let catalog = SchemaCatalog::builtin();
        let mapper = RecordMapper::new(catalog.get("Department").unwrap());
        let record = mapper.map(&raw(&["1", ""])).unwrap();
        assert!(!record.get("department").unwrap().is_set());
        assert_eq!(record.present_fields().count(), 1);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let catalog = SchemaCatalog::builtin();
        let mapper = RecordMapper::new(catalog.get("Department").unwrap());
        assert_eq!(
            mapper.map(&raw(&["2", "Sales", "ExtraField"])).unwrap_err(),
            ValidationError::ShapeMismatch {
                expected: 2,
                found: 3
            }
        );
        assert!(mapper.map(&raw(&["2"])).is_err());
    }

    #[test]
    fn bad_values_and_blank_keys_are_rejected() {
        let catalog = SchemaCatalog::builtin();
        let mapper = RecordMapper::new(catalog.get("Department").unwrap());

        let err = mapper.map(&raw(&["two", "Sales"])).unwrap_err();
        assert!(matches!(err, ValidationError::Coercion { ref field, .. } if field == "id"));

        let err = mapper.map(&raw(&[" ", "Sales"])).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingPrimaryKey {
                field: "id".into()
            }
        );
    }
}
