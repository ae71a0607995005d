use chrono::Utc;
use engine_core::{context::RunContext, error::IngestError};
use model::{entity::EntitySchema, events::ingest::IngestEvent, records::batch::Batch};
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitResult {
    pub inserted: usize,
    pub updated: usize,
    pub duration: Duration,
}

/// Commits batches as single transactions. Failures are not retried.
pub struct BatchCommitter {
    ctx: RunContext,
}

impl BatchCommitter {
    pub fn new(ctx: &RunContext) -> Self {
        BatchCommitter { ctx: ctx.clone() }
    }

    /// On error nothing of the batch is durable; the caller fails every row of it.
    pub async fn commit(
        &self,
        schema: &EntitySchema,
        batch: &Batch,
    ) -> Result<CommitResult, IngestError> {
        let start = Instant::now();
        let (inserted, updated) = batch.counts();

        if batch.is_empty() {
            return Ok(CommitResult {
                inserted,
                updated,
                duration: start.elapsed(),
            });
        }

        info!(
            batch_id = %batch.id,
            entity = %batch.entity,
            file = %batch.source_key,
            batch = batch.number,
            rows = batch.len(),
            "Committing batch"
        );

        let timeout = self.ctx.settings.store_timeout;
        let outcome = self
            .ctx
            .store
            .commit_batch_within(schema, &batch.writes, timeout)
            .await
            .map_err(|err| IngestError::Commit(err.to_string()));
        let duration = start.elapsed();

        match outcome {
            Ok(()) => {
                info!(
                    batch_id = %batch.id,
                    inserted,
                    updated,
                    duration_ms = duration.as_millis(),
                    "Batch committed"
                );
                self.ctx.emit(IngestEvent::BatchCommitted {
                    run_id: self.ctx.run_id.clone(),
                    entity: batch.entity.clone(),
                    file: batch.source_key.clone(),
                    batch_id: batch.id.clone(),
                    batch: batch.number,
                    inserted,
                    updated,
                    duration_ms: duration.as_millis() as u64,
                    timestamp: Utc::now(),
                });
                Ok(CommitResult {
                    inserted,
                    updated,
                    duration,
                })
            }
            Err(err) => {
                warn!(batch_id = %batch.id, rows = batch.len(), error = %err, "Batch rolled back");
                self.ctx.emit(IngestEvent::BatchRolledBack {
                    run_id: self.ctx.run_id.clone(),
                    entity: batch.entity.clone(),
                    file: batch.source_key.clone(),
                    batch_id: batch.id.clone(),
                    batch: batch.number,
                    rows: batch.len(),
                    error: err.to_string(),
                    timestamp: Utc::now(),
                });
                Err(err)
            }
        }
    }
}
