use bytes::Bytes;
use chrono::Utc;
use connectors::storage::error::StorageError;
use engine_core::{context::RunContext, error::IngestError};
use model::{entity::EntitySchema, events::ingest::IngestEvent};
use std::{future::Future, time::Duration};
use tracing::{debug, info};

/// Finds and fetches the source files of an entity.
pub struct SourceLocator {
    ctx: RunContext,
}

impl SourceLocator {
    pub fn new(ctx: &RunContext) -> Self {
        SourceLocator { ctx: ctx.clone() }
    }

    fn container(&self) -> &str {
        &self.ctx.settings.container
    }

    /// Fails with `SourceUnavailable` when the container is missing or unreachable.
    pub async fn check_container(&self) -> Result<(), IngestError> {
        bounded(
            self.ctx.settings.storage_timeout,
            "head_container",
            self.ctx.objects.head_container(self.container()),
        )
        .await
    }

    /// Keys under `<Entity>/` ending in the configured extension, in key order.
    /// An empty list is not an error.
    pub async fn locate(&self, schema: &EntitySchema) -> Result<Vec<String>, IngestError> {
        let prefix = schema.folder_prefix();
        let listed = bounded(
            self.ctx.settings.storage_timeout,
            "list_objects",
            self.ctx.objects.list_objects(self.container(), &prefix),
        )
        .await?;

        let listed_count = listed.len();
        let files: Vec<String> = listed
            .into_iter()
            .filter(|key| self.ctx.settings.csv.matches(key))
            .collect();

        debug!(
            entity = %schema.name,
            prefix = %prefix,
            listed = listed_count,
            matched = files.len(),
            "Filtered source keys"
        );

        if !files.is_empty() {
            info!(entity = %schema.name, files = files.len(), "Discovered source files");
            self.ctx.emit(IngestEvent::FilesDiscovered {
                run_id: self.ctx.run_id.clone(),
                entity: schema.name.clone(),
                files: files.clone(),
                timestamp: Utc::now(),
            });
        }

        Ok(files)
    }

    pub async fn fetch(&self, key: &str) -> Result<Bytes, IngestError> {
        bounded(
            self.ctx.settings.storage_timeout,
            "get_object",
            self.ctx.objects.get_object(self.container(), key),
        )
        .await
    }
}

/// A timed-out storage call counts as an unreachable source.
async fn bounded<T>(
    timeout: Duration,
    operation: &str,
    call: impl Future<Output = Result<T, StorageError>>,
) -> Result<T, IngestError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(IngestError::SourceUnavailable),
        Err(_) => Err(IngestError::SourceUnavailable(StorageError::Transient(
            format!("{operation} timed out after {}ms", timeout.as_millis()),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use connectors::{
        sql::memory::InMemoryStore,
        storage::{ObjectStore, memory::InMemoryObjectStore},
    };
    use engine_core::{config::IngestSettings, error::ErrorKind, events::CollectingSink};
    use model::entity::SchemaCatalog;
    use std::sync::Arc;

    fn context(objects: Arc<dyn ObjectStore>, sink: CollectingSink) -> RunContext {
        RunContext::new(
            Arc::new(InMemoryStore::new()),
            objects,
            IngestSettings::default().with_container("bucket"),
        )
        .with_sink(Arc::new(sink))
    }

    fn department() -> EntitySchema {
        SchemaCatalog::builtin().get("Department").unwrap().clone()
    }

    #[tokio::test]
    async fn keeps_only_matching_extensions() {
        let objects = Arc::new(InMemoryObjectStore::new());
        objects.put("bucket", "Department/a.csv", "1,Eng\n").await;
        objects.put("bucket", "Department/notes.txt", "x").await;
        objects.put("bucket", "Department/", "").await;
        objects.put("bucket", "Departments/b.csv", "2,Ops\n").await;
        let sink = CollectingSink::new();

        let locator = SourceLocator::new(&context(objects, sink.clone()));
        let files = locator.locate(&department()).await.unwrap();

        assert_eq!(files, vec!["Department/a.csv"]);
        assert_eq!(sink.event_types(), vec!["files.discovered"]);
    }

    #[tokio::test]
    async fn empty_folder_is_not_an_error() {
        let objects = Arc::new(InMemoryObjectStore::new());
        objects.create_container("bucket").await;
        let locator = SourceLocator::new(&context(objects, CollectingSink::new()));
        assert!(locator.locate(&department()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_container_is_source_unavailable() {
        let locator = SourceLocator::new(&context(
            Arc::new(InMemoryObjectStore::new()),
            CollectingSink::new(),
        ));
        let err = locator.check_container().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
        let err = locator.locate(&department()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    }

    struct StalledStore;

    #[async_trait]
    impl ObjectStore for StalledStore {
        async fn list_objects(&self, _: &str, _: &str) -> Result<Vec<String>, StorageError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }

        async fn get_object(&self, _: &str, _: &str) -> Result<Bytes, StorageError> {
            Err(StorageError::Transient("unused".into()))
        }

        async fn head_container(&self, _: &str) -> Result<(), StorageError> {
            Ok(())
        }

        fn kind(&self) -> &'static str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn listing_is_bounded_by_the_storage_timeout() {
        let mut ctx = context(Arc::new(StalledStore), CollectingSink::new());
        ctx.settings = Arc::new(
            IngestSettings::default()
                .with_container("bucket")
                .with_storage_timeout(Duration::from_millis(20)),
        );
        let err = SourceLocator::new(&ctx).locate(&department()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
        assert!(err.to_string().contains("list_objects timed out"));
    }
}
