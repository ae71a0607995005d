use crate::{
    core::data_type::DataType,
    entity::{error::SchemaError, schema::EntitySchema},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The set of target entities known to a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaCatalog {
    pub entities: Vec<EntitySchema>,
}

impl SchemaCatalog {
    pub fn new(entities: Vec<EntitySchema>) -> Result<Self, SchemaError> {
        let mut catalog = SchemaCatalog { entities };
        catalog.resolve_references();
        catalog.validate()?;
        Ok(catalog)
    }

    /// Departments, jobs and hired employees.
    pub fn builtin() -> Self {
        SchemaCatalog {
            entities: vec![
                EntitySchema::new("Department", "department", "id")
                    .field("id", DataType::Int)
                    .field("department", DataType::String),
                EntitySchema::new("Job", "job", "id")
                    .field("id", DataType::Int)
                    .field("job", DataType::String),
                EntitySchema::new("Employee", "employee", "id")
                    .field("id", DataType::Int)
                    .field("name", DataType::String)
                    .field("hire_date", DataType::Timestamp)
                    .field("department_id", DataType::Int)
                    .field("job_id", DataType::Int)
                    .foreign_key("department_id", "Department")
                    .foreign_key("job_id", "Job"),
            ],
        }
    }

    pub fn from_json(source: &str) -> Result<Self, SchemaError> {
        let catalog: SchemaCatalog =
            serde_json::from_str(source).map_err(|e| SchemaError::Parse(e.to_string()))?;
        Self::new(catalog.entities)
    }

    /// Rewrites every foreign-key target to the canonical name of the entity it
    /// resolves to (references may use any case or the table name). Unresolvable
    /// targets are left as written for `validate` to report.
    fn resolve_references(&mut self) {
        let resolved: Vec<Vec<Option<String>>> = self
            .entities
            .iter()
            .map(|entity| {
                entity
                    .foreign_keys
                    .iter()
                    .map(|fk| self.get(&fk.references).map(|target| target.name.clone()))
                    .collect()
            })
            .collect();

        for (entity, names) in self.entities.iter_mut().zip(resolved) {
            for (fk, name) in entity.foreign_keys.iter_mut().zip(names) {
                if let Some(name) = name {
                    fk.references = name;
                }
            }
        }
    }

    /// Canonical names of the entities `schema` depends on, excluding itself.
    fn resolved_dependencies(&self, schema: &EntitySchema) -> Vec<&str> {
        let mut deps: Vec<&str> = Vec::new();
        for fk in &schema.foreign_keys {
            if let Some(target) = self.get(&fk.references)
                && target.name != schema.name
                && !deps.contains(&target.name.as_str())
            {
                deps.push(target.name.as_str());
            }
        }
        deps
    }

    pub fn get(&self, name: &str) -> Option<&EntitySchema> {
        self.entities
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name) || e.table.eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut names = HashSet::new();
        for entity in &self.entities {
            entity.validate()?;
            if !names.insert(entity.name.to_lowercase()) {
                return Err(SchemaError::DuplicateEntity(entity.name.clone()));
            }
        }

        for entity in &self.entities {
            for fk in &entity.foreign_keys {
                if self.get(&fk.references).is_none() {
                    return Err(SchemaError::InvalidForeignKey {
                        entity: entity.name.clone(),
                        field: fk.field.clone(),
                        target: format!("entity '{}'", fk.references),
                    });
                }
            }
        }

        // Surfaces cycles at load time instead of at the first run.
        self.dependency_levels(&self.names())?;
        Ok(())
    }

    /// Groups the requested entities into levels: every entity of a level only
    /// depends on entities of earlier levels. Dependencies that were not requested
    /// do not constrain the order. Within a level, catalog order is kept.
    pub fn dependency_levels(&self, requested: &[&str]) -> Result<Vec<Vec<EntitySchema>>, SchemaError> {
        let mut selected: Vec<&EntitySchema> = Vec::with_capacity(requested.len());
        for name in requested {
            let schema = self
                .get(name)
                .ok_or_else(|| SchemaError::UnknownEntity(name.to_string()))?;
            if !selected.iter().any(|s| s.name == schema.name) {
                selected.push(schema);
            }
        }
        selected.sort_by_key(|s| self.position(&s.name));

        let in_scope: HashSet<&str> = selected.iter().map(|s| s.name.as_str()).collect();
        let mut done: HashSet<&str> = HashSet::new();
        let mut remaining = selected;
        let mut levels = Vec::new();

        while !remaining.is_empty() {
            let (ready, blocked): (Vec<&EntitySchema>, Vec<&EntitySchema>) =
                remaining.into_iter().partition(|schema| {
                    self.resolved_dependencies(schema)
                        .iter()
                        .filter(|dep| in_scope.contains(*dep))
                        .all(|dep| done.contains(dep))
                });

            if ready.is_empty() {
                let names: Vec<&str> = blocked.iter().map(|s| s.name.as_str()).collect();
                return Err(SchemaError::CircularReference(names.join(", ")));
            }

            done.extend(ready.iter().map(|s| s.name.as_str()));
            levels.push(ready.into_iter().cloned().collect());
            remaining = blocked;
        }

        Ok(levels)
    }

    fn position(&self, name: &str) -> usize {
        self.entities
            .iter()
            .position(|e| e.name == name)
            .unwrap_or(usize::MAX)
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
