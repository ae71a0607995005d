use async_trait::async_trait;
use bytes::Bytes;
use connectors::{
    sql::{error::DbError, memory::InMemoryStore, store::RecordStore},
    storage::{ObjectStore, error::StorageError, memory::InMemoryObjectStore},
};
use engine_core::events::EventSink;
use model::{
    core::value::Value,
    entity::EntitySchema,
    events::ingest::IngestEvent,
    records::{batch::StagedWrite, row::RowData},
};
use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio_util::sync::CancellationToken;

/// Fails the commit calls whose 1-based position is listed; every other call
/// reaches the wrapped store.
pub struct FailingCommitStore {
    inner: Arc<InMemoryStore>,
    fail_on: HashSet<usize>,
    calls: AtomicUsize,
}

impl FailingCommitStore {
    pub fn new(inner: Arc<InMemoryStore>, fail_on: &[usize]) -> Self {
        FailingCommitStore {
            inner,
            fail_on: fail_on.iter().copied().collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RecordStore for FailingCommitStore {
    async fn get(&self, schema: &EntitySchema, key: &Value) -> Result<Option<RowData>, DbError> {
        self.inner.get(schema, key).await
    }

    async fn commit_batch(
        &self,
        schema: &EntitySchema,
        writes: &[StagedWrite],
    ) -> Result<(), DbError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&call) {
            return Err(DbError::Write("connection reset by peer".into()));
        }
        self.inner.commit_batch(schema, writes).await
    }

    async fn ping(&self) -> Result<(), DbError> {
        self.inner.ping().await
    }

    fn kind(&self) -> &'static str {
        "failing"
    }
}

/// Answers lookups only after `delay`.
pub struct SlowLookupStore {
    inner: Arc<InMemoryStore>,
    delay: Duration,
}

impl SlowLookupStore {
    pub fn new(inner: Arc<InMemoryStore>, delay: Duration) -> Self {
        SlowLookupStore { inner, delay }
    }
}

#[async_trait]
impl RecordStore for SlowLookupStore {
    async fn get(&self, schema: &EntitySchema, key: &Value) -> Result<Option<RowData>, DbError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(schema, key).await
    }

    async fn commit_batch(
        &self,
        schema: &EntitySchema,
        writes: &[StagedWrite],
    ) -> Result<(), DbError> {
        self.inner.commit_batch(schema, writes).await
    }

    async fn ping(&self) -> Result<(), DbError> {
        self.inner.ping().await
    }

    fn kind(&self) -> &'static str {
        "slow"
    }
}

/// Object store whose reads of the listed keys fail with a transient error.
pub struct UnreadableKeys {
    inner: Arc<InMemoryObjectStore>,
    keys: HashSet<String>,
}

impl UnreadableKeys {
    pub fn new(inner: Arc<InMemoryObjectStore>, keys: &[&str]) -> Self {
        UnreadableKeys {
            inner,
            keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[async_trait]
impl ObjectStore for UnreadableKeys {
    async fn list_objects(&self, container: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.inner.list_objects(container, prefix).await
    }

    async fn get_object(&self, container: &str, key: &str) -> Result<Bytes, StorageError> {
        if self.keys.contains(key) {
            return Err(StorageError::Transient(format!("read of {key} interrupted")));
        }
        self.inner.get_object(container, key).await
    }

    async fn head_container(&self, container: &str) -> Result<(), StorageError> {
        self.inner.head_container(container).await
    }

    fn kind(&self) -> &'static str {
        "unreadable"
    }
}

/// Requests cancellation once `after` batches have committed.
pub struct CancelAfterCommits {
    cancel: CancellationToken,
    after: usize,
    seen: AtomicUsize,
}

impl CancelAfterCommits {
    pub fn new(cancel: CancellationToken, after: usize) -> Self {
        CancelAfterCommits {
            cancel,
            after,
            seen: AtomicUsize::new(0),
        }
    }
}

impl EventSink for CancelAfterCommits {
    fn publish(&self, event: IngestEvent) {
        if matches!(event, IngestEvent::BatchCommitted { .. })
            && self.seen.fetch_add(1, Ordering::SeqCst) + 1 >= self.after
        {
            self.cancel.cancel();
        }
    }
}
