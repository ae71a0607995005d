use crate::storage::{ObjectStore, error::StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

/// Object store backed by a directory tree: containers are the directories
/// directly under `root`, keys are `/`-separated paths relative to a container.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalObjectStore { root: root.into() }
    }

    fn container_path(&self, container: &str) -> Result<PathBuf, StorageError> {
        if container.is_empty() || container.contains(['/', '\\']) || container == ".." {
            return Err(StorageError::Config(format!(
                "invalid container name '{container}'"
            )));
        }
        Ok(self.root.join(container))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn list_objects(
        &self,
        container: &str,
        prefix: &str,
    ) -> Result<Vec<String>, StorageError> {
        let base = self.container_path(container)?;
        if !is_dir(&base).await? {
            return Err(StorageError::ContainerNotFound(container.to_string()));
        }

        let mut keys = Vec::new();
        let mut pending = vec![base.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                if let Some(key) = relative_key(&base, &path)
                    && key.starts_with(prefix)
                {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn get_object(&self, container: &str, key: &str) -> Result<Bytes, StorageError> {
        let base = self.container_path(container)?;
        if key.split('/').any(|part| part == "..") {
            return Err(StorageError::Config(format!("invalid key '{key}'")));
        }

        match tokio::fs::read(base.join(key)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                if is_dir(&base).await? {
                    Err(StorageError::KeyNotFound {
                        container: container.to_string(),
                        key: key.to_string(),
                    })
                } else {
                    Err(StorageError::ContainerNotFound(container.to_string()))
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn head_container(&self, container: &str) -> Result<(), StorageError> {
        let base = self.container_path(container)?;
        if is_dir(&base).await? {
            Ok(())
        } else {
            Err(StorageError::ContainerNotFound(container.to_string()))
        }
    }

    fn kind(&self) -> &'static str {
        "local"
    }
}

async fn is_dir(path: &Path) -> Result<bool, StorageError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(meta.is_dir()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

fn relative_key(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}
