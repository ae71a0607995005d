use crate::error::CliError;
use std::{collections::HashMap, fs, path::Path};

/// Process environment overlaid with the contents of `.env` files.
#[derive(Debug, Clone, Default)]
pub struct EnvManager {
    vars: HashMap<String, String>,
}

impl EnvManager {
    pub fn new() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Loads `KEY=VALUE` lines; keys from the file win over the process environment.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CliError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read env file {}: {}", path.display(), e))
        })?;

        self.parse_env_content(&content)?;
        Ok(())
    }

    /// Loads `.env` from the working directory when it exists.
    pub fn load_default_file(&mut self) -> Result<bool, CliError> {
        let path = Path::new(".env");
        if !path.is_file() {
            return Ok(false);
        }
        self.load_from_file(path)?;
        Ok(true)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn all(&self) -> &HashMap<String, String> {
        &self.vars
    }

    fn parse_env_content(&mut self, content: &str) -> Result<(), CliError> {
        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);

            let (key, value) = line.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid env file: line {} is not KEY=VALUE",
                    idx + 1
                ))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::Config(format!(
                    "Invalid env file: empty key at line {}",
                    idx + 1
                )));
            }

            self.vars.insert(key.to_string(), unquote(value.trim()).to_string());
        }
        Ok(())
    }
}

fn unquote(value: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|q| value.strip_prefix(*q)?.strip_suffix(*q))
        .unwrap_or(value)
}
