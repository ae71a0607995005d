use crate::core::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::HashMap, fmt};
use thiserror::Error;

/// Column types a target entity field can be declared with.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Int,
    Long,
    Float,
    Boolean,
    String,
    Date,
    Timestamp,
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("cannot coerce '{raw}' to {data_type}: {reason}")]
pub struct CoercionError {
    pub raw: String,
    pub data_type: DataType,
    pub reason: String,
}

lazy_static! {
    static ref TYPE_ALIASES: HashMap<&'static str, DataType> = build_type_aliases();
}

const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

impl DataType {
    /// Resolves a type name as written in schema configuration (`int`, `varchar`, `timestamp`, ...).
    pub fn from_name(type_name: &str) -> Result<Self, String> {
        let normalized = type_name.trim().to_lowercase();
        TYPE_ALIASES
            .get(normalized.as_str())
            .copied()
            .ok_or_else(|| format!("Unknown field type: {type_name}"))
    }

    pub fn postgres_name(&self) -> &'static str {
        match self {
            DataType::Int => "INTEGER",
            DataType::Long => "BIGINT",
            DataType::Float => "DOUBLE PRECISION",
            DataType::Boolean => "BOOLEAN",
            DataType::String => "TEXT",
            DataType::Date => "DATE",
            DataType::Timestamp => "TIMESTAMPTZ",
        }
    }

    /// Coerces a raw source cell into a typed value.
    ///
    /// Empty or whitespace-only input yields `Ok(None)`: the field is unset, which is
    /// never a type error.
    pub fn parse_value(&self, raw: &str) -> Result<Option<Value>, CoercionError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let value = match self {
            DataType::Int => trimmed
                .parse::<i32>()
                .map(|v| Value::Int(v as i64))
                .map_err(|e| self.coercion_error(raw, e))?,
            DataType::Long => trimmed
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| self.coercion_error(raw, e))?,
            DataType::Float => trimmed
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| self.coercion_error(raw, e))?,
            DataType::Boolean => match trimmed.to_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" => Value::Boolean(true),
                "false" | "f" | "no" | "n" | "0" => Value::Boolean(false),
                _ => return Err(self.coercion_error(raw, "not a boolean literal")),
            },
            // Strings keep their original spacing; only blank input is treated as unset.
            DataType::String => Value::String(raw.to_string()),
            DataType::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|e| self.coercion_error(raw, e))?,
            DataType::Timestamp => Value::Timestamp(parse_timestamp(trimmed).ok_or_else(|| {
                self.coercion_error(raw, "expected RFC 3339 or 'YYYY-MM-DD HH:MM:SS'")
            })?),
        };

        Ok(Some(value))
    }

    fn coercion_error(&self, raw: &str, reason: impl fmt::Display) -> CoercionError {
        CoercionError {
            raw: raw.to_string(),
            data_type: *self,
            reason: reason.to_string(),
        }
    }
}

/// Naive timestamps (no offset) are interpreted as UTC.
fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Int => "int",
            DataType::Long => "long",
            DataType::Float => "float",
            DataType::Boolean => "boolean",
            DataType::String => "string",
            DataType::Date => "date",
            DataType::Timestamp => "timestamp",
        };
        write!(f, "{name}")
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        DataType::from_name(&name).map_err(serde::de::Error::custom)
    }
}

fn build_type_aliases() -> HashMap<&'static str, DataType> {
    let mut map = HashMap::new();
    for name in ["int", "integer", "int4", "smallint", "int2", "serial"] {
        map.insert(name, DataType::Int);
    }
    for name in ["long", "bigint", "int8", "bigserial"] {
        map.insert(name, DataType::Long);
    }
    for name in ["float", "double", "real", "float8", "double precision", "numeric"] {
        map.insert(name, DataType::Float);
    }
    for name in ["bool", "boolean"] {
        map.insert(name, DataType::Boolean);
    }
    for name in ["string", "str", "text", "varchar", "char"] {
        map.insert(name, DataType::String);
    }
    map.insert("date", DataType::Date);
    for name in ["timestamp", "timestamptz", "datetime"] {
        map.insert(name, DataType::Timestamp);
    }
    map
}
