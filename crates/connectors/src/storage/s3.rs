use crate::storage::{ObjectStore, error::StorageError};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
};
use bytes::Bytes;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct S3Settings {
    pub region: Option<String>,
    /// Custom endpoint, e.g. a MinIO or LocalStack instance.
    pub endpoint_url: Option<String>,
    pub timeout: Option<Duration>,
}

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub async fn connect(settings: &S3Settings) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(endpoint) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if settings.endpoint_url.is_some() {
            builder = builder.force_path_style(true);
        }
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout_config(
                aws_sdk_s3::config::timeout::TimeoutConfig::builder()
                    .operation_timeout(timeout)
                    .build(),
            );
        }

        S3ObjectStore {
            client: Client::from_conf(builder.build()),
        }
    }

    pub fn from_client(client: Client) -> Self {
        S3ObjectStore { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_objects(
        &self,
        container: &str,
        prefix: &str,
    ) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0;

        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(container)
                .prefix(prefix)
                .set_continuation_token(token.take())
                .send()
                .await
                .map_err(|err| classify(err, container, None))?;
            pages += 1;

            keys.extend(
                resp.contents()
                    .iter()
                    .filter_map(|obj| obj.key())
                    .map(str::to_string),
            );

            match resp.next_continuation_token() {
                Some(next) if resp.is_truncated().unwrap_or(false) => {
                    token = Some(next.to_string())
                }
                _ => break,
            }
        }

        debug!(container, prefix, pages, keys = keys.len(), "Listed S3 objects");
        keys.sort();
        Ok(keys)
    }

    async fn get_object(&self, container: &str, key: &str) -> Result<Bytes, StorageError> {
        let resp = self
            .client
            .get_object()
            .bucket(container)
            .key(key)
            .send()
            .await
            .map_err(|err| classify(err, container, Some(key)))?;

        let body = resp
            .body
            .collect()
            .await
            .map_err(|err| StorageError::Transient(format!("reading {container}/{key}: {err}")))?;
        Ok(body.into_bytes())
    }

    async fn head_container(&self, container: &str) -> Result<(), StorageError> {
        self.client
            .head_bucket()
            .bucket(container)
            .send()
            .await
            .map_err(|err| classify(err, container, None))?;
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "s3"
    }
}

/// Maps an SDK failure onto the not-found / transient / service split.
fn classify<E>(err: SdkError<E>, container: &str, key: Option<&str>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let message = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::ServiceError(service) => match service.err().code().unwrap_or_default() {
            "NoSuchBucket" => StorageError::ContainerNotFound(container.to_string()),
            "NoSuchKey" => StorageError::KeyNotFound {
                container: container.to_string(),
                key: key.unwrap_or_default().to_string(),
            },
            // HEAD requests carry no body, so a missing bucket only shows up as `NotFound`.
            "NotFound" => match key {
                Some(key) => StorageError::KeyNotFound {
                    container: container.to_string(),
                    key: key.to_string(),
                },
                None => StorageError::ContainerNotFound(container.to_string()),
            },
            "SlowDown" | "RequestTimeout" | "InternalError" | "ServiceUnavailable" => {
                StorageError::Transient(message)
            }
            _ => StorageError::Service(message),
        },
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            StorageError::Transient(message)
        }
        SdkError::ConstructionFailure(_) => StorageError::Config(message),
        _ => StorageError::Service(message),
    }
}
