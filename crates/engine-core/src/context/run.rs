use crate::{
    config::IngestSettings,
    events::{EventSink, TracingSink},
};
use connectors::{sql::store::RecordStore, storage::ObjectStore};
use model::{entity::SchemaCatalog, events::ingest::IngestEvent};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything one ingestion run needs, shared by the tasks driving its entities.
#[derive(Clone)]
pub struct RunContext {
    pub run_id: String,
    pub catalog: Arc<SchemaCatalog>,
    pub store: Arc<dyn RecordStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub settings: Arc<IngestSettings>,
    pub sink: Arc<dyn EventSink>,
    pub cancel: CancellationToken,
}

impl RunContext {
    pub fn new(
        store: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
        settings: IngestSettings,
    ) -> Self {
        RunContext {
            run_id: uuid::Uuid::new_v4().to_string(),
            catalog: Arc::new(SchemaCatalog::builtin()),
            store,
            objects,
            settings: Arc::new(settings),
            sink: Arc::new(TracingSink),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_catalog(mut self, catalog: SchemaCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn emit(&self, event: IngestEvent) {
        self.sink.publish(event);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
