use crate::sql::error::DbError;
use async_trait::async_trait;
use std::time::Duration;
use model::{
    core::value::Value,
    entity::EntitySchema,
    records::{batch::StagedWrite, row::RowData},
};

/// Keyed access to the target tables.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// The stored record with primary key `key`, if any.
    async fn get(&self, schema: &EntitySchema, key: &Value) -> Result<Option<RowData>, DbError>;

    /// Applies all writes in order as one transaction. On error nothing is applied.
    async fn commit_batch(
        &self,
        schema: &EntitySchema,
        writes: &[StagedWrite],
    ) -> Result<(), DbError>;

    /// Like `commit_batch`, but gives up with `DbError::Timeout` once `timeout` has elapsed.
    ///
    /// The default drops the whole commit future. That is only sound for stores whose
    /// commit point is not an awaited round-trip; a dropped network COMMIT leaves the
    /// outcome unknown. Such stores override this and bound their statements instead.
    async fn commit_batch_within(
        &self,
        schema: &EntitySchema,
        writes: &[StagedWrite],
        timeout: Duration,
    ) -> Result<(), DbError> {
        match tokio::time::timeout(timeout, self.commit_batch(schema, writes)).await {
            Ok(result) => result,
            Err(_) => Err(DbError::Timeout(timeout)),
        }
    }

    async fn ping(&self) -> Result<(), DbError>;

    fn kind(&self) -> &'static str;
}
