use crate::sql::{
    error::{ConnectorError, DbError},
    postgres::{params::PgParamStore, query, row::to_row_data, utils::connect_client},
    store::RecordStore,
};
use async_trait::async_trait;
use model::{
    core::{data_type::DataType, value::Value},
    entity::EntitySchema,
    records::{
        batch::{StagedWrite, WriteOp},
        row::RowData,
    },
};
use std::{sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tokio_postgres::{Client, Transaction, error::SqlState};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct PgStore {
    client: Arc<RwLock<Client>>,
}

impl PgStore {
    pub async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let client = Arc::new(RwLock::new(connect_client(url).await?));
        Ok(PgStore { client })
    }

    async fn apply(
        tx: &Transaction<'_>,
        schema: &EntitySchema,
        writes: &[StagedWrite],
    ) -> Result<(), DbError> {
        let key_type = key_type(schema)?;

        for write in writes {
            match &write.op {
                WriteOp::Insert(record) => {
                    let mut columns = Vec::new();
                    let mut params = PgParamStore::default();
                    for field in record.present_fields() {
                        let data_type = column_type(schema, &field.name)?;
                        let value = field.value.as_ref().unwrap_or(&Value::Null);
                        params.push(&field.name, value, data_type)?;
                        columns.push((field.name.as_str(), data_type));
                    }

                    let sql = query::insert(&schema.table, &columns);
                    tx.execute(&sql, &params.as_refs()).await?;
                }
                WriteOp::Update { key, changes } => {
                    let mut columns = Vec::new();
                    let mut params = PgParamStore::default();
                    for change in changes.iter().filter(|c| {
                        c.is_set() && !c.name.eq_ignore_ascii_case(&schema.primary_key)
                    }) {
                        let data_type = column_type(schema, &change.name)?;
                        let value = change.value.as_ref().unwrap_or(&Value::Null);
                        params.push(&change.name, value, data_type)?;
                        columns.push((change.name.as_str(), data_type));
                    }

                    // Only the key was present: nothing to overwrite.
                    if columns.is_empty() {
                        continue;
                    }

                    params.push(&schema.primary_key, key, key_type)?;
                    let sql = query::update(
                        &schema.table,
                        &columns,
                        (schema.primary_key.as_str(), key_type),
                    );
                    let affected = tx.execute(&sql, &params.as_refs()).await?;
                    if affected == 0 {
                        return Err(DbError::Write(format!(
                            "no '{}' record with key {key}",
                            schema.table
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn get(&self, schema: &EntitySchema, key: &Value) -> Result<Option<RowData>, DbError> {
        let key_type = key_type(schema)?;
        let sql = query::select_by_key(schema, key_type);
        let mut params = PgParamStore::default();
        params.push(&schema.primary_key, key, key_type)?;

        let client = self.client.read().await;
        let row = client.query_opt(&sql, &params.as_refs()).await?;
        row.map(|row| to_row_data(schema, &row)).transpose()
    }

    async fn commit_batch(
        &self,
        schema: &EntitySchema,
        writes: &[StagedWrite],
    ) -> Result<(), DbError> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut client = self.client.write().await;
        let tx = client.transaction().await?;
        match Self::apply(&tx, schema, writes).await {
            Ok(()) => {
                tx.commit().await?;
                debug!(table = %schema.table, rows = writes.len(), "Committed batch");
                Ok(())
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(table = %schema.table, error = %rollback, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Only the batch statements are bounded, server side and client side. COMMIT is
    /// awaited to completion so the outcome of a batch is never unknown.
    async fn commit_batch_within(
        &self,
        schema: &EntitySchema,
        writes: &[StagedWrite],
        timeout: Duration,
    ) -> Result<(), DbError> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut client = self.client.write().await;
        let tx = client.transaction().await?;
        let applied = async {
            tx.batch_execute(&query::statement_timeout(timeout)).await?;
            Self::apply(&tx, schema, writes).await
        };
        let outcome = match tokio::time::timeout(timeout, applied).await {
            Ok(Err(DbError::Sql(err))) if err.code() == Some(&SqlState::QUERY_CANCELED) => {
                Err(DbError::Timeout(timeout))
            }
            Ok(result) => result,
            Err(_) => Err(DbError::Timeout(timeout)),
        };

        match outcome {
            Ok(()) => {
                tx.commit().await?;
                debug!(table = %schema.table, rows = writes.len(), "Committed batch");
                Ok(())
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(table = %schema.table, error = %rollback, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn ping(&self) -> Result<(), DbError> {
        let client = self.client.read().await;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }
}

fn key_type(schema: &EntitySchema) -> Result<DataType, DbError> {
    column_type(schema, &schema.primary_key)
}

fn column_type(schema: &EntitySchema, name: &str) -> Result<DataType, DbError> {
    schema
        .field_def(name)
        .map(|def| def.data_type)
        .ok_or_else(|| {
            DbError::Write(format!(
                "column '{name}' does not exist in '{}'",
                schema.table
            ))
        })
}
