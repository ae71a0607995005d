use connectors::sql::store::RecordStore;
use engine_core::{context::RunContext, error::IngestError};
use model::{
    core::value::FieldValue,
    entity::EntitySchema,
    records::{
        batch::StagedWrite,
        row::{RawRow, RowData},
    },
};
use std::{collections::HashSet, sync::Arc, time::Duration};

/// Decides insert or update for each record of a batch.
///
/// Keys staged earlier in the current batch are treated as existing, so a key
/// repeated within one batch becomes an insert followed by updates.
pub struct UpsertEngine {
    store: Arc<dyn RecordStore>,
    schema: EntitySchema,
    timeout: Duration,
    staged: HashSet<String>,
}

impl UpsertEngine {
    pub fn new(ctx: &RunContext, schema: &EntitySchema) -> Self {
        UpsertEngine {
            store: ctx.store.clone(),
            schema: schema.clone(),
            timeout: ctx.settings.store_timeout,
            staged: HashSet::new(),
        }
    }

    pub async fn stage(&mut self, record: RowData, raw: RawRow) -> Result<StagedWrite, IngestError> {
        let key = record.get_value(&self.schema.primary_key);
        let key_str = key.key_string();

        let exists = self.staged.contains(&key_str) || self.lookup(&record).await?;
        let write = if exists {
            let changes: Vec<FieldValue> = record
                .present_fields()
                .filter(|f| !f.name.eq_ignore_ascii_case(&self.schema.primary_key))
                .cloned()
                .collect();
            StagedWrite::update(key, changes, raw)
        } else {
            StagedWrite::insert(record, raw)
        };

        self.staged.insert(key_str);
        Ok(write)
    }

    /// Forgets the keys of the previous batch once it is committed or rolled back.
    pub fn reset(&mut self) {
        self.staged.clear();
    }

    async fn lookup(&self, record: &RowData) -> Result<bool, IngestError> {
        let key = record.get_value(&self.schema.primary_key);
        match tokio::time::timeout(self.timeout, self.store.get(&self.schema, &key)).await {
            Ok(Ok(found)) => Ok(found.is_some()),
            Ok(Err(err)) => Err(IngestError::Lookup(err)),
            Err(_) => Err(IngestError::Timeout {
                operation: "lookup",
                timeout: self.timeout,
            }),
        }
    }
}
