use crate::{env::EnvManager, error::CliError};
use connectors::{
    sql::{postgres::store::PgStore, store::RecordStore},
    storage::{ObjectStore, local::LocalObjectStore, s3::{S3ObjectStore, S3Settings}},
};
use engine_core::{
    config::{ENV_DATABASE_URL, ENV_LOCAL_ROOT, IngestSettings, ObjectStoreKind},
    error::ConfigError,
};
use model::entity::SchemaCatalog;
use std::sync::Arc;
use tracing::info;

pub fn load_env(env_file: Option<&str>) -> Result<EnvManager, CliError> {
    let mut env = EnvManager::new();
    match env_file {
        Some(path) => {
            env.load_from_file(path)?;
            info!("Loaded environment from {path}");
        }
        None => {
            if env.load_default_file()? {
                info!("Loaded environment from .env");
            }
        }
    }
    Ok(env)
}

pub fn load_settings(env: &EnvManager) -> Result<IngestSettings, CliError> {
    let settings = IngestSettings::from_vars(env.all())?;
    settings.validate()?;
    Ok(settings)
}

/// The built-in catalog, or the JSON catalog at `path`.
pub async fn load_catalog(path: Option<&str>) -> Result<SchemaCatalog, CliError> {
    match path {
        Some(path) => {
            let source = tokio::fs::read_to_string(path).await?;
            Ok(SchemaCatalog::from_json(&source)?)
        }
        None => Ok(SchemaCatalog::builtin()),
    }
}

pub async fn object_store(settings: &IngestSettings) -> Result<Arc<dyn ObjectStore>, CliError> {
    match settings.object_store {
        ObjectStoreKind::S3 => {
            let s3 = S3Settings {
                region: settings.aws_region.clone(),
                endpoint_url: settings.aws_endpoint_url.clone(),
                timeout: Some(settings.storage_timeout),
            };
            Ok(Arc::new(S3ObjectStore::connect(&s3).await))
        }
        ObjectStoreKind::Local => {
            let root = settings
                .local_root
                .clone()
                .ok_or(ConfigError::Missing(ENV_LOCAL_ROOT))?;
            Ok(Arc::new(LocalObjectStore::new(root)))
        }
    }
}

pub async fn record_store(settings: &IngestSettings) -> Result<Arc<dyn RecordStore>, CliError> {
    let url = settings
        .database_url
        .as_deref()
        .ok_or(ConfigError::Missing(ENV_DATABASE_URL))?;
    Ok(Arc::new(PgStore::connect(url).await?))
}
