use model::{core::data_type::DataType, entity::EntitySchema};
use std::time::Duration;

pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Parameter cast matching the Rust type each value is bound with.
pub(crate) fn param_cast(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Int | DataType::Long => "BIGINT",
        DataType::Float => "DOUBLE PRECISION",
        DataType::Boolean => "BOOLEAN",
        DataType::String => "TEXT",
        DataType::Date => "DATE",
        DataType::Timestamp => "TIMESTAMPTZ",
    }
}

fn placeholder(index: usize, data_type: DataType) -> String {
    format!("${}::{}", index + 1, param_cast(data_type))
}

pub(crate) fn select_by_key(schema: &EntitySchema, key_type: DataType) -> String {
    let columns: Vec<String> = schema.fields.iter().map(|f| quote_ident(&f.name)).collect();
    format!(
        "SELECT {} FROM {} WHERE {} = {}",
        columns.join(", "),
        quote_ident(&schema.table),
        quote_ident(&schema.primary_key),
        placeholder(0, key_type)
    )
}

pub(crate) fn insert(table: &str, columns: &[(&str, DataType)]) -> String {
    let names: Vec<String> = columns.iter().map(|(name, _)| quote_ident(name)).collect();
    let values: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, (_, ty))| placeholder(i, *ty))
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(", "),
        values.join(", ")
    )
}

/// The key is bound last, after every assigned column.
pub(crate) fn update(
    table: &str,
    columns: &[(&str, DataType)],
    key: (&str, DataType),
) -> String {
    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, (name, ty))| format!("{} = {}", quote_ident(name), placeholder(i, *ty)))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE {} = {}",
        quote_ident(table),
        assignments.join(", "),
        quote_ident(key.0),
        placeholder(columns.len(), key.1)
    )
}

/// Per-transaction statement limit. Zero would disable it, so it is at least 1ms.
pub(crate) fn statement_timeout(timeout: Duration) -> String {
    format!(
        "SET LOCAL statement_timeout = {}",
        timeout.as_millis().max(1)
    )
}
