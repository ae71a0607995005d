use crate::sql::error::DbError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use model::{
    core::{
        data_type::DataType,
        value::{FieldValue, Value},
    },
    entity::EntitySchema,
    records::row::RowData,
};
use tokio_postgres::{Row as PgRow, types::FromSql};

/// Decodes a row selected with the schema's columns, in schema order.
pub(crate) fn to_row_data(schema: &EntitySchema, row: &PgRow) -> Result<RowData, DbError> {
    let fields = schema
        .fields
        .iter()
        .enumerate()
        .map(|(idx, def)| {
            let value = decode(row, idx, def.data_type).ok_or_else(|| DbError::Decode {
                column: def.name.clone(),
                reason: format!("column is not compatible with {}", def.data_type),
            })?;
            Ok(FieldValue::new(&def.name, Some(value), def.data_type))
        })
        .collect::<Result<Vec<_>, DbError>>()?;

    Ok(RowData::new(&schema.name, fields))
}

/// `None` when the column type does not match the declared type. A SQL NULL
/// decodes to `Value::Null`.
fn decode(row: &PgRow, idx: usize, data_type: DataType) -> Option<Value> {
    match data_type {
        DataType::Int | DataType::Long => try_get::<i32>(row, idx)
            .map(|v| v.map(|v| Value::Int(v as i64)))
            .or_else(|| try_get::<i64>(row, idx).map(|v| v.map(Value::Int)))
            .or_else(|| try_get::<i16>(row, idx).map(|v| v.map(|v| Value::Int(v as i64)))),
        DataType::Float => try_get::<f64>(row, idx)
            .map(|v| v.map(Value::Float))
            .or_else(|| try_get::<f32>(row, idx).map(|v| v.map(|v| Value::Float(v as f64)))),
        DataType::Boolean => try_get::<bool>(row, idx).map(|v| v.map(Value::Boolean)),
        DataType::String => try_get::<String>(row, idx).map(|v| v.map(Value::String)),
        DataType::Date => try_get::<NaiveDate>(row, idx).map(|v| v.map(Value::Date)),
        DataType::Timestamp => try_get::<DateTime<Utc>>(row, idx)
            .map(|v| v.map(Value::Timestamp))
            .or_else(|| {
                try_get::<NaiveDateTime>(row, idx).map(|v| v.map(|ts| Value::Timestamp(ts.and_utc())))
            }),
    }
    .map(|v| v.unwrap_or(Value::Null))
}

fn try_get<'a, T: FromSql<'a>>(row: &'a PgRow, idx: usize) -> Option<Option<T>> {
    row.try_get::<_, Option<T>>(idx).ok()
}
