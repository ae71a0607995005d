use crate::sql::{error::DbError, store::RecordStore};
use async_trait::async_trait;
use model::{
    core::{
        data_type::DataType,
        value::{FieldValue, Value},
    },
    entity::EntitySchema,
    records::{
        batch::{StagedWrite, WriteOp},
        row::RowData,
    },
};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::{Mutex, RwLock};

type Table = BTreeMap<String, RowData>;

/// Record store held in memory, keyed by entity name.
///
/// Enforces primary-key uniqueness, foreign keys and column types at commit time,
/// and applies each batch all-or-nothing.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    commits: Mutex<Vec<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts rows directly, bypassing constraint checks.
    pub async fn seed(&self, schema: &EntitySchema, rows: Vec<RowData>) {
        let mut tables = self.tables.write().await;
        let table = tables.entry(schema.name.clone()).or_default();
        for row in rows {
            let key = row.get_value(&schema.primary_key).key_string();
            table.insert(key, normalize(schema, &row));
        }
    }

    /// Stored rows of an entity, ordered by key.
    pub async fn rows(&self, entity: &str) -> Vec<RowData> {
        self.tables
            .read()
            .await
            .get(entity)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn count(&self, entity: &str) -> usize {
        self.tables.read().await.get(entity).map_or(0, |t| t.len())
    }

    /// Entity names of successful commits, in commit order.
    pub async fn commits(&self) -> Vec<String> {
        self.commits.lock().await.clone()
    }

    fn apply(
        tables: &HashMap<String, Table>,
        working: &mut Table,
        schema: &EntitySchema,
        write: &StagedWrite,
    ) -> Result<(), DbError> {
        match &write.op {
            WriteOp::Insert(record) => {
                let key = record.get_value(&schema.primary_key);
                if key.is_null() {
                    return Err(DbError::Constraint(format!(
                        "null value in primary key '{}' of '{}'",
                        schema.primary_key, schema.table
                    )));
                }
                let key = key.key_string();
                if working.contains_key(&key) {
                    return Err(DbError::Constraint(format!(
                        "duplicate key value violates unique constraint \"{}_pkey\" (Key ({})=({key}) already exists.)",
                        schema.table, schema.primary_key
                    )));
                }
                check_fields(tables, working, schema, record.present_fields())?;
                working.insert(key, normalize(schema, record));
            }
            WriteOp::Update { key, changes } => {
                check_fields(tables, working, schema, changes.iter().filter(|c| c.is_set()))?;
                let stored = working.get_mut(&key.key_string()).ok_or_else(|| {
                    DbError::Write(format!("no '{}' record with key {key}", schema.table))
                })?;
                let changes: Vec<FieldValue> = changes
                    .iter()
                    .filter(|c| !c.name.eq_ignore_ascii_case(&schema.primary_key))
                    .cloned()
                    .collect();
                stored.apply(&changes);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn get(&self, schema: &EntitySchema, key: &Value) -> Result<Option<RowData>, DbError> {
        Ok(self
            .tables
            .read()
            .await
            .get(&schema.name)
            .and_then(|t| t.get(&key.key_string()))
            .cloned())
    }

    async fn commit_batch(
        &self,
        schema: &EntitySchema,
        writes: &[StagedWrite],
    ) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        let mut working = tables.get(&schema.name).cloned().unwrap_or_default();

        for write in writes {
            Self::apply(&tables, &mut working, schema, write)?;
        }

        tables.insert(schema.name.clone(), working);
        self.commits.lock().await.push(schema.name.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

/// Full-width copy of `record`: unset fields are stored as explicit nulls.
fn normalize(schema: &EntitySchema, record: &RowData) -> RowData {
    let fields = schema
        .fields
        .iter()
        .map(|def| {
            let value = record
                .get(&def.name)
                .and_then(|f| f.value.clone())
                .unwrap_or(Value::Null);
            FieldValue::new(&def.name, Some(value), def.data_type)
        })
        .collect();
    RowData::new(&schema.name, fields)
}

fn check_fields<'a>(
    tables: &HashMap<String, Table>,
    working: &Table,
    schema: &EntitySchema,
    fields: impl Iterator<Item = &'a FieldValue>,
) -> Result<(), DbError> {
    for field in fields {
        let Some(value) = &field.value else { continue };
        let def = schema.field_def(&field.name).ok_or_else(|| {
            DbError::Write(format!(
                "column '{}' does not exist in '{}'",
                field.name, schema.table
            ))
        })?;

        if !accepts(def.data_type, value) {
            return Err(DbError::Coercion {
                field: def.name.clone(),
                value: value.to_string(),
                data_type: def.data_type.to_string(),
            });
        }

        if value.is_null() {
            continue;
        }

        for fk in schema
            .foreign_keys
            .iter()
            .filter(|fk| fk.field.eq_ignore_ascii_case(&def.name))
        {
            // Self references resolve against the batch being built.
            let target = if fk.references.eq_ignore_ascii_case(&schema.name) {
                Some(working)
            } else {
                tables
                    .iter()
                    .find(|(entity, _)| entity.eq_ignore_ascii_case(&fk.references))
                    .map(|(_, table)| table)
            };
            if !target.is_some_and(|t| t.contains_key(&value.key_string())) {
                return Err(DbError::Constraint(format!(
                    "insert or update on table \"{}\" violates foreign key constraint on \"{}\" (Key ({})=({}) is not present in {}.)",
                    schema.table,
                    def.name,
                    def.name,
                    value.key_string(),
                    fk.references
                )));
            }
        }
    }
    Ok(())
}

fn accepts(data_type: DataType, value: &Value) -> bool {
    matches!(
        (data_type, value),
        (_, Value::Null)
            | (DataType::Int | DataType::Long, Value::Int(_))
            | (DataType::Float, Value::Float(_) | Value::Int(_))
            | (DataType::Boolean, Value::Boolean(_))
            | (DataType::String, Value::String(_))
            | (DataType::Date, Value::Date(_))
            | (DataType::Timestamp, Value::Timestamp(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{entity::SchemaCatalog, records::row::RawRow};

    fn schema(name: &str) -> EntitySchema {
        SchemaCatalog::builtin().get(name).unwrap().clone()
    }

    fn department(id: i64, name: Option<&str>) -> RowData {
        RowData::new(
            "Department",
            vec![
                FieldValue::new("id", Some(Value::Int(id)), DataType::Int),
                FieldValue::new(
                    "department",
                    name.map(|n| Value::String(n.to_string())),
                    DataType::String,
                ),
            ],
        )
    }

    fn raw() -> RawRow {
        RawRow::new(1, vec![])
    }

    #[tokio::test]
    async fn commits_inserts_and_updates() {
        let store = InMemoryStore::new();
        let dept = schema("Department");
        store
            .commit_batch(
                &dept,
                &[
                    StagedWrite::insert(department(1, Some("Sales")), raw()),
                    StagedWrite::insert(department(2, None), raw()),
                ],
            )
            .await
            .unwrap();

        store
            .commit_batch(
                &dept,
                &[StagedWrite::update(
                    Value::Int(2),
                    department(2, Some("Ops")).field_values,
                    raw(),
                )],
            )
            .await
            .unwrap();

        let stored = store.get(&dept, &Value::Int(2)).await.unwrap().unwrap();
        assert_eq!(stored.get_value("department"), Value::String("Ops".into()));
        assert_eq!(store.count("Department").await, 2);
        assert_eq!(store.commits().await, vec!["Department", "Department"]);
    }

    #[tokio::test]
    async fn unset_insert_fields_are_stored_as_null() {
        let store = InMemoryStore::new();
        let dept = schema("Department");
        store
            .commit_batch(&dept, &[StagedWrite::insert(department(5, None), raw())])
            .await
            .unwrap();
        let stored = store.get(&dept, &Value::Int(5)).await.unwrap().unwrap();
        assert_eq!(stored.get("department").unwrap().value, Some(Value::Null));
    }

    #[tokio::test]
    async fn failed_batch_leaves_no_trace() {
        let store = InMemoryStore::new();
        let dept = schema("Department");
        let err = store
            .commit_batch(
                &dept,
                &[
                    StagedWrite::insert(department(1, Some("Sales")), raw()),
                    StagedWrite::insert(department(1, Some("Again")), raw()),
                ],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Constraint(_)));
        assert_eq!(store.count("Department").await, 0);
        assert!(store.commits().await.is_empty());
    }

    #[tokio::test]
    async fn enforces_foreign_keys() {
        let store = InMemoryStore::new();
        let employee = schema("Employee");
        let record = RowData::new(
            "Employee",
            vec![
                FieldValue::new("id", Some(Value::Int(1)), DataType::Int),
                FieldValue::new("department_id", Some(Value::Int(9)), DataType::Int),
            ],
        );
        let err = store
            .commit_batch(&employee, &[StagedWrite::insert(record.clone(), raw())])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("foreign key"));

        store
            .seed(&schema("Department"), vec![department(9, Some("Sales"))])
            .await;
        store
            .commit_batch(&employee, &[StagedWrite::insert(record, raw())])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejects_mistyped_values() {
        let store = InMemoryStore::new();
        let record = RowData::new(
            "Department",
            vec![FieldValue::new(
                "id",
                Some(Value::String("one".into())),
                DataType::Int,
            )],
        );
        let err = store
            .commit_batch(&schema("Department"), &[StagedWrite::insert(record, raw())])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Coercion { .. }));
    }

    #[tokio::test]
    async fn update_of_missing_key_fails() {
        let store = InMemoryStore::new();
        let err = store
            .commit_batch(
                &schema("Department"),
                &[StagedWrite::update(Value::Int(3), vec![], raw())],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Write(_)));
    }

    #[tokio::test]
    async fn foreign_key_target_matches_entity_name_in_any_case() {
        let store = InMemoryStore::new();
        store
            .seed(&schema("Department"), vec![department(1, Some("Sales"))])
            .await;
        let assignment = EntitySchema::new("Assignment", "assignment", "id")
            .field("id", DataType::Int)
            .field("department_id", DataType::Int)
            .foreign_key("department_id", "department");
        let row = |id: i64, dept: i64| {
            RowData::new(
                "Assignment",
                vec![
                    FieldValue::new("id", Some(Value::Int(id)), DataType::Int),
                    FieldValue::new("department_id", Some(Value::Int(dept)), DataType::Int),
                ],
            )
        };

        store
            .commit_batch(&assignment, &[StagedWrite::insert(row(1, 1), raw())])
            .await
            .unwrap();
        let err = store
            .commit_batch(&assignment, &[StagedWrite::insert(row(2, 7), raw())])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));
        assert_eq!(store.count("Assignment").await, 1);
    }
}
