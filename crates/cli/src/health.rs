use crate::error::CliError;
use connectors::{sql::store::RecordStore, storage::ObjectStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct DependencyHealth {
    pub kind: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DependencyHealth {
    fn from_result<E: std::fmt::Display>(kind: &str, result: Result<(), E>) -> Self {
        match result {
            Ok(()) => DependencyHealth {
                kind: kind.to_string(),
                status: HealthStatus::Healthy,
                error: None,
            },
            Err(err) => {
                warn!(dependency = kind, error = %err, "Dependency unhealthy");
                DependencyHealth {
                    kind: kind.to_string(),
                    status: HealthStatus::Unhealthy,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub record_store: DependencyHealth,
    pub object_store: DependencyHealth,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Pings the record store and checks the container. A store that could not be
/// built at all is reported as unhealthy.
pub async fn check(
    store: Result<Arc<dyn RecordStore>, CliError>,
    objects: Result<Arc<dyn ObjectStore>, CliError>,
    container: &str,
) -> HealthReport {
    let record_store = match store {
        Ok(store) => DependencyHealth::from_result(store.kind(), store.ping().await),
        Err(err) => DependencyHealth::from_result("record_store", Err(err)),
    };
    let object_store = match objects {
        Ok(objects) => {
            DependencyHealth::from_result(objects.kind(), objects.head_container(container).await)
        }
        Err(err) => DependencyHealth::from_result("object_store", Err(err)),
    };

    let status = if record_store.status == HealthStatus::Healthy
        && object_store.status == HealthStatus::Healthy
    {
        HealthStatus::Healthy
    } else {
        HealthStatus::Unhealthy
    };

    HealthReport {
        status,
        record_store,
        object_store,
    }
}
