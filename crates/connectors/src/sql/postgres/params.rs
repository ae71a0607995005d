use crate::sql::error::DbError;
use chrono::{DateTime, NaiveDate, Utc};
use model::core::{data_type::DataType, value::Value};
use tokio_postgres::types::ToSql;

pub struct PgParam(Box<dyn ToSql + Sync + Send>);

impl PgParam {
    /// Binds `value` with the Rust type expected by the placeholder cast of
    /// `data_type`. Nulls are bound as typed `None`s so the cast still applies.
    pub fn typed(field: &str, value: &Value, data_type: DataType) -> Result<Self, DbError> {
        let param: Box<dyn ToSql + Sync + Send> = match (data_type, value) {
            (DataType::Int | DataType::Long, Value::Null) => Box::new(Option::<i64>::None),
            (DataType::Float, Value::Null) => Box::new(Option::<f64>::None),
            (DataType::Boolean, Value::Null) => Box::new(Option::<bool>::None),
            (DataType::String, Value::Null) => Box::new(Option::<String>::None),
            (DataType::Date, Value::Null) => Box::new(Option::<NaiveDate>::None),
            (DataType::Timestamp, Value::Null) => Box::new(Option::<DateTime<Utc>>::None),

            (DataType::Int | DataType::Long, Value::Int(v)) => Box::new(*v),
            (DataType::Float, Value::Float(v)) => Box::new(*v),
            (DataType::Float, Value::Int(v)) => Box::new(*v as f64),
            (DataType::Boolean, Value::Boolean(v)) => Box::new(*v),
            (DataType::String, Value::String(v)) => Box::new(v.clone()),
            (DataType::Date, Value::Date(v)) => Box::new(*v),
            (DataType::Timestamp, Value::Timestamp(v)) => Box::new(*v),

            (data_type, other) => {
                return Err(DbError::Coercion {
                    field: field.to_string(),
                    value: other.to_string(),
                    data_type: data_type.to_string(),
                });
            }
        };
        Ok(PgParam(param))
    }
}

impl AsRef<dyn ToSql + Sync> for PgParam {
    fn as_ref(&self) -> &(dyn ToSql + Sync + 'static) {
        &*self.0
    }
}

#[derive(Default)]
pub struct PgParamStore {
    pub params: Vec<PgParam>,
}

impl PgParamStore {
    pub fn push(&mut self, field: &str, value: &Value, data_type: DataType) -> Result<(), DbError> {
        self.params.push(PgParam::typed(field, value, data_type)?);
        Ok(())
    }

    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|param| param.as_ref())
            .collect::<Vec<_>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_value_is_a_coercion_error() {
        let err = PgParam::typed("id", &Value::String("x".into()), DataType::Int)
            .err()
            .unwrap();
        assert!(matches!(err, DbError::Coercion { .. }));
    }

    #[test]
    fn nulls_bind_for_every_type() {
        let mut store = PgParamStore::default();
        for ty in [DataType::Int, DataType::String, DataType::Timestamp] {
            store.push("f", &Value::Null, ty).unwrap();
        }
        assert_eq!(store.as_refs().len(), 3);
    }
}
