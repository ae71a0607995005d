pub mod error;
pub mod local;
pub mod memory;
pub mod s3;

use crate::storage::error::StorageError;
use async_trait::async_trait;
use bytes::Bytes;

/// Read access to a bucket-like object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Every key in `container` starting with `prefix`, in lexicographic order.
    async fn list_objects(&self, container: &str, prefix: &str)
    -> Result<Vec<String>, StorageError>;

    async fn get_object(&self, container: &str, key: &str) -> Result<Bytes, StorageError>;

    /// Succeeds when the container exists and is reachable.
    async fn head_container(&self, container: &str) -> Result<(), StorageError>;

    fn kind(&self) -> &'static str;
}
