use crate::storage::{ObjectStore, error::StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// Object store held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    containers: RwLock<HashMap<String, BTreeMap<String, Bytes>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_container(&self, container: &str) {
        self.containers
            .write()
            .await
            .entry(container.to_string())
            .or_default();
    }

    /// Stores an object, creating the container if needed.
    pub async fn put(&self, container: &str, key: &str, data: impl Into<Bytes>) {
        self.containers
            .write()
            .await
            .entry(container.to_string())
            .or_default()
            .insert(key.to_string(), data.into());
    }

    pub async fn remove(&self, container: &str, key: &str) -> bool {
        self.containers
            .write()
            .await
            .get_mut(container)
            .is_some_and(|objects| objects.remove(key).is_some())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn list_objects(
        &self,
        container: &str,
        prefix: &str,
    ) -> Result<Vec<String>, StorageError> {
        let containers = self.containers.read().await;
        let objects = containers
            .get(container)
            .ok_or_else(|| StorageError::ContainerNotFound(container.to_string()))?;
        Ok(objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get_object(&self, container: &str, key: &str) -> Result<Bytes, StorageError> {
        let containers = self.containers.read().await;
        let objects = containers
            .get(container)
            .ok_or_else(|| StorageError::ContainerNotFound(container.to_string()))?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::KeyNotFound {
                container: container.to_string(),
                key: key.to_string(),
            })
    }

    async fn head_container(&self, container: &str) -> Result<(), StorageError> {
        if self.containers.read().await.contains_key(container) {
            Ok(())
        } else {
            Err(StorageError::ContainerNotFound(container.to_string()))
        }
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
