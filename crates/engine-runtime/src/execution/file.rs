use chrono::Utc;
use connectors::file::csv::extractor::RowExtractor;
use engine_core::{
    context::RunContext,
    error::IngestError,
    report::{entry::ErrorEntry, summary::IngestionReport},
};
use engine_processing::{
    committer::BatchCommitter, locator::SourceLocator, mapper::RecordMapper, upsert::UpsertEngine,
};
use model::{
    entity::EntitySchema,
    events::ingest::IngestEvent,
    records::{batch::Batch, row::RawRow},
};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileOutcome {
    Completed,
    Cancelled,
}

/// Streams one file through mapping, staging and batched commits.
pub(crate) struct FileIngestor<'a> {
    ctx: &'a RunContext,
    schema: &'a EntitySchema,
    key: &'a str,
    committer: BatchCommitter,
    upsert: UpsertEngine,
    batch: Batch,
}

impl<'a> FileIngestor<'a> {
    pub(crate) fn new(ctx: &'a RunContext, schema: &'a EntitySchema, key: &'a str) -> Self {
        FileIngestor {
            ctx,
            schema,
            key,
            committer: BatchCommitter::new(ctx),
            upsert: UpsertEngine::new(ctx, schema),
            batch: Batch::new(&schema.name, key, 1),
        }
    }

    pub(crate) async fn run(
        mut self,
        locator: &SourceLocator,
        report: &mut IngestionReport,
    ) -> FileOutcome {
        self.ctx.emit(IngestEvent::FileStarted {
            run_id: self.ctx.run_id.clone(),
            entity: self.schema.name.clone(),
            file: self.key.to_string(),
            timestamp: Utc::now(),
        });

        let extractor = match locator.fetch(self.key).await.and_then(|data| {
            RowExtractor::new(data, &self.ctx.settings.csv).map_err(IngestError::from)
        }) {
            Ok(extractor) => extractor,
            Err(err) => {
                self.fail_file(report, &err);
                return FileOutcome::Completed;
            }
        };

        report.record_file(self.key);
        let mapper = RecordMapper::new(self.schema);
        let batch_size = self.ctx.settings.batch_size.max(1);

        for item in extractor.rows() {
            let raw = match item {
                Ok(raw) => raw,
                Err(err) => {
                    // Rows read so far are still committed; the rest of the file is skipped.
                    self.flush(report).await;
                    self.fail_file(report, &IngestError::from(err));
                    return FileOutcome::Completed;
                }
            };

            let record = match mapper.map(&raw) {
                Ok(record) => record,
                Err(err) => {
                    self.reject_row(report, &raw, &IngestError::from(err));
                    continue;
                }
            };

            match self.upsert.stage(record, raw.clone()).await {
                Ok(write) => self.batch.push(write),
                Err(err) => {
                    self.reject_row(report, &raw, &err);
                    continue;
                }
            }

            if self.batch.len() >= batch_size {
                self.flush(report).await;
                if self.ctx.is_cancelled() {
                    return FileOutcome::Cancelled;
                }
            }
        }

        self.flush(report).await;
        info!(entity = %self.schema.name, file = %self.key, "File processed");
        FileOutcome::Completed
    }

    /// Commits the pending batch and starts the next one.
    async fn flush(&mut self, report: &mut IngestionReport) {
        if self.batch.is_empty() {
            return;
        }

        let next = Batch::new(&self.schema.name, self.key, self.batch.number + 1);
        let batch = std::mem::replace(&mut self.batch, next);
        self.upsert.reset();

        match self.committer.commit(self.schema, &batch).await {
            Ok(result) => report.record_committed(result.inserted, result.updated),
            Err(err) => report.record_batch_failure(
                self.key,
                batch.number,
                batch.writes.iter().map(|w| &w.raw),
                &err,
            ),
        }
    }

    fn reject_row(&self, report: &mut IngestionReport, raw: &RawRow, err: &IngestError) {
        report.record_row_failure(
            ErrorEntry::from_error(err)
                .with_file(self.key)
                .with_row(raw),
        );
        self.ctx.emit(IngestEvent::RowRejected {
            run_id: self.ctx.run_id.clone(),
            entity: self.schema.name.clone(),
            file: self.key.to_string(),
            line: raw.line,
            error: err.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn fail_file(&self, report: &mut IngestionReport, err: &IngestError) {
        warn!(entity = %self.schema.name, file = %self.key, error = %err, "Skipping file");
        report.record_error(ErrorEntry::from_error(err).with_file(self.key));
        self.ctx.emit(IngestEvent::FileFailed {
            run_id: self.ctx.run_id.clone(),
            entity: self.schema.name.clone(),
            file: self.key.to_string(),
            error: err.to_string(),
            timestamp: Utc::now(),
        });
    }
}
