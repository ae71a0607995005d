use crate::error::ConfigError;
use connectors::file::csv::settings::CsvSettings;
use std::{collections::HashMap, path::PathBuf, str::FromStr, time::Duration};

pub const ENV_BUCKET: &str = "S3_BUCKET_NAME";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_BATCH_SIZE: &str = "INGEST_BATCH_SIZE";
pub const ENV_FILE_EXTENSION: &str = "INGEST_FILE_EXTENSION";
pub const ENV_DELIMITER: &str = "INGEST_DELIMITER";
pub const ENV_PARALLEL_ENTITIES: &str = "INGEST_PARALLEL_ENTITIES";
pub const ENV_STORE_TIMEOUT: &str = "INGEST_STORE_TIMEOUT_SECS";
pub const ENV_STORAGE_TIMEOUT: &str = "INGEST_STORAGE_TIMEOUT_SECS";
pub const ENV_OBJECT_STORE: &str = "OBJECT_STORE";
pub const ENV_LOCAL_ROOT: &str = "LOCAL_STORE_ROOT";
pub const ENV_AWS_ENDPOINT: &str = "AWS_ENDPOINT_URL";
pub const ENV_AWS_REGION: &str = "AWS_REGION";

pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectStoreKind {
    #[default]
    S3,
    Local,
}

impl FromStr for ObjectStoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(ObjectStoreKind::S3),
            "local" | "fs" => Ok(ObjectStoreKind::Local),
            other => Err(format!("unknown object store '{other}', expected 's3' or 'local'")),
        }
    }
}

/// Settings for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Bucket (or local directory name) holding the source files.
    pub container: String,

    pub database_url: Option<String>,

    /// Maximum number of staged writes per transaction.
    pub batch_size: usize,

    pub csv: CsvSettings,

    /// Run entities of the same dependency level concurrently.
    pub parallel_entities: bool,

    /// Bound for each primary-key lookup and each batch commit.
    pub store_timeout: Duration,

    /// Bound for each object-store call.
    pub storage_timeout: Duration,

    pub object_store: ObjectStoreKind,
    pub local_root: Option<PathBuf>,
    pub aws_endpoint_url: Option<String>,
    pub aws_region: Option<String>,
}

impl Default for IngestSettings {
    fn default() -> Self {
        IngestSettings {
            container: String::new(),
            database_url: None,
            batch_size: DEFAULT_BATCH_SIZE,
            csv: CsvSettings::default(),
            parallel_entities: false,
            store_timeout: Duration::from_secs(30),
            storage_timeout: Duration::from_secs(60),
            object_store: ObjectStoreKind::default(),
            local_root: None,
            aws_endpoint_url: None,
            aws_region: None,
        }
    }
}

impl IngestSettings {
    pub fn with_container(mut self, container: &str) -> Self {
        self.container = container.to_string();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_parallel_entities(mut self, enabled: bool) -> Self {
        self.parallel_entities = enabled;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.storage_timeout = timeout;
        self
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.csv = self.csv.with_extension(extension);
        self
    }

    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Reads settings from a variable map; unset keys keep their defaults.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };
        let mut settings = IngestSettings::default();

        if let Some(bucket) = get(ENV_BUCKET) {
            settings.container = bucket.to_string();
        }
        settings.database_url = get(ENV_DATABASE_URL).map(str::to_string);

        if let Some(raw) = get(ENV_BATCH_SIZE) {
            let size: usize = parse(ENV_BATCH_SIZE, raw)?;
            if size == 0 {
                return Err(invalid(ENV_BATCH_SIZE, raw, "must be at least 1"));
            }
            settings.batch_size = size;
        }

        if let Some(ext) = get(ENV_FILE_EXTENSION) {
            settings.csv = settings.csv.with_extension(ext);
        }

        if let Some(raw) = get(ENV_DELIMITER) {
            let mut chars = raw.chars();
            let delimiter = match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => return Err(invalid(ENV_DELIMITER, raw, "expected a single character")),
            };
            settings.csv = settings
                .csv
                .with_delimiter(delimiter)
                .map_err(|e| invalid(ENV_DELIMITER, raw, e))?;
        }

        if let Some(raw) = get(ENV_PARALLEL_ENTITIES) {
            settings.parallel_entities = parse_bool(ENV_PARALLEL_ENTITIES, raw)?;
        }

        if let Some(raw) = get(ENV_STORE_TIMEOUT) {
            settings.store_timeout = Duration::from_secs(parse(ENV_STORE_TIMEOUT, raw)?);
        }
        if let Some(raw) = get(ENV_STORAGE_TIMEOUT) {
            settings.storage_timeout = Duration::from_secs(parse(ENV_STORAGE_TIMEOUT, raw)?);
        }

        if let Some(raw) = get(ENV_OBJECT_STORE) {
            settings.object_store = raw
                .parse()
                .map_err(|e: String| invalid(ENV_OBJECT_STORE, raw, e))?;
        }
        settings.local_root = get(ENV_LOCAL_ROOT).map(PathBuf::from);
        settings.aws_endpoint_url = get(ENV_AWS_ENDPOINT).map(str::to_string);
        settings.aws_region = get(ENV_AWS_REGION).map(str::to_string);

        Ok(settings)
    }

    /// Checks the settings a run cannot start without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.container.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_BUCKET));
        }
        if self.object_store == ObjectStoreKind::Local && self.local_root.is_none() {
            return Err(ConfigError::Missing(ENV_LOCAL_ROOT));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e| invalid(key, raw, e))
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, raw, "expected true or false")),
    }
}

fn invalid(key: &'static str, raw: &str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let settings = IngestSettings::from_vars(&HashMap::new()).unwrap();
        assert_eq!(settings.batch_size, 1000);
        assert_eq!(settings.csv.extension, ".csv");
        assert!(!settings.parallel_entities);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn reads_every_setting() {
        let settings = IngestSettings::from_vars(&vars(&[
            (ENV_BUCKET, "hr-files"),
            (ENV_BATCH_SIZE, "250"),
            (ENV_FILE_EXTENSION, "txt"),
            (ENV_DELIMITER, ";"),
            (ENV_PARALLEL_ENTITIES, "yes"),
            (ENV_STORE_TIMEOUT, "5"),
            (ENV_OBJECT_STORE, "local"),
            (ENV_LOCAL_ROOT, "/data"),
        ]))
        .unwrap();

        assert_eq!(settings.container, "hr-files");
        assert_eq!(settings.batch_size, 250);
        assert_eq!(settings.csv.extension, ".txt");
        assert_eq!(settings.csv.delimiter, b';');
        assert!(settings.parallel_entities);
        assert_eq!(settings.store_timeout, Duration::from_secs(5));
        assert_eq!(settings.object_store, ObjectStoreKind::Local);
        settings.validate().unwrap();
    }

    #[test]
    fn rejects_bad_values() {
        assert!(IngestSettings::from_vars(&vars(&[(ENV_BATCH_SIZE, "0")])).is_err());
        assert!(IngestSettings::from_vars(&vars(&[(ENV_BATCH_SIZE, "many")])).is_err());
        assert!(IngestSettings::from_vars(&vars(&[(ENV_OBJECT_STORE, "ftp")])).is_err());
        assert!(IngestSettings::from_vars(&vars(&[(ENV_DELIMITER, ";;")])).is_err());
    }

    #[test]
    fn local_store_needs_a_root() {
        let settings = IngestSettings::default().with_container("bucket");
        settings.validate().unwrap();

        let local = IngestSettings {
            object_store: ObjectStoreKind::Local,
            ..settings
        };
        assert!(matches!(
            local.validate(),
            Err(ConfigError::Missing(ENV_LOCAL_ROOT))
        ));
    }
}
