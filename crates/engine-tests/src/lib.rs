#![allow(dead_code)]

use connectors::{
    sql::{memory::InMemoryStore, store::RecordStore},
    storage::{ObjectStore, memory::InMemoryObjectStore},
};
use engine_core::{
    config::IngestSettings, context::RunContext, events::CollectingSink,
    report::summary::IngestionReport,
};
use engine_runtime::Orchestrator;
use model::{
    core::{
        data_type::DataType,
        value::{FieldValue, Value},
    },
    entity::{EntitySchema, SchemaCatalog},
    records::row::RowData,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub mod failures;
pub mod mocks;

pub const BUCKET: &str = "hr-exports";

/// In-memory record store and object store wired into a run context, with every
/// published event collected.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub objects: Arc<InMemoryObjectStore>,
    pub sink: CollectingSink,
    pub settings: IngestSettings,
    pub catalog: SchemaCatalog,
    pub cancel: CancellationToken,
}

impl Harness {
    pub async fn new() -> Self {
        let objects = Arc::new(InMemoryObjectStore::new());
        objects.create_container(BUCKET).await;
        Harness {
            store: Arc::new(InMemoryStore::new()),
            objects,
            sink: CollectingSink::new(),
            settings: IngestSettings::default().with_container(BUCKET),
            catalog: SchemaCatalog::builtin(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_settings(mut self, f: impl FnOnce(IngestSettings) -> IngestSettings) -> Self {
        self.settings = f(self.settings);
        self
    }

    pub fn with_catalog(mut self, catalog: SchemaCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub async fn put(&self, key: &str, content: &str) {
        self.objects.put(BUCKET, key, content.to_string()).await;
    }

    pub fn context(&self) -> RunContext {
        self.context_with(self.store.clone(), self.objects.clone())
    }

    pub fn context_with(
        &self,
        store: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
    ) -> RunContext {
        RunContext::new(store, objects, self.settings.clone())
            .with_catalog(self.catalog.clone())
            .with_sink(Arc::new(self.sink.clone()))
            .with_cancel(self.cancel.clone())
    }

    pub async fn run(&self, entities: &[&str]) -> Vec<IngestionReport> {
        Orchestrator::new(self.context())
            .ingest(entities)
            .await
            .expect("run ingestion")
    }

    pub async fn run_one(&self, entity: &str) -> IngestionReport {
        Orchestrator::new(self.context())
            .ingest_entity(entity)
            .await
            .expect("run ingestion")
    }

    pub async fn seed(&self, entity: &str, rows: Vec<RowData>) {
        self.store.seed(&self.schema(entity), rows).await;
    }

    pub fn schema(&self, entity: &str) -> EntitySchema {
        self.catalog.get(entity).expect("known entity").clone()
    }

    /// Stored `(id, name)` pairs of a two-column entity such as Department or Job.
    pub async fn pairs(&self, entity: &str, column: &str) -> Vec<(i64, Value)> {
        self.store
            .rows(entity)
            .await
            .into_iter()
            .map(|row| {
                let id = row.get_value("id").as_i64().expect("integer id");
                (id, row.get_value(column))
            })
            .collect()
    }
}

pub fn department(id: i64, name: &str) -> RowData {
    RowData::new(
        "Department",
        vec![
            FieldValue::new("id", Some(Value::Int(id)), DataType::Int),
            FieldValue::new("department", Some(Value::String(name.into())), DataType::String),
        ],
    )
}

pub fn text(value: &str) -> Value {
    Value::String(value.to_string())
}
