use crate::execution::file::{FileIngestor, FileOutcome};
use chrono::Utc;
use engine_core::{
    context::RunContext,
    error::IngestError,
    report::{
        entry::ErrorEntry,
        summary::{EntityStage, IngestionReport},
    },
};
use engine_processing::locator::SourceLocator;
use model::{entity::EntitySchema, events::ingest::IngestEvent};
use tracing::{info, warn};

/// Drives one entity through discovery and its files, in key order.
/// Failures are recorded in the returned report and never abort the run.
pub async fn ingest_entity(ctx: &RunContext, schema: &EntitySchema) -> IngestionReport {
    let mut report = IngestionReport::new(schema);
    ctx.emit(IngestEvent::EntityStarted {
        run_id: ctx.run_id.clone(),
        entity: schema.name.clone(),
        timestamp: Utc::now(),
    });

    report.advance(EntityStage::DiscoveringFiles);

    if ctx.is_cancelled() {
        cancel(ctx, schema, &mut report, None);
        report.advance(EntityStage::Complete);
        return finish(ctx, report);
    }

    let locator = SourceLocator::new(ctx);
    let files = match discover(&locator, schema).await {
        Ok(files) => files,
        Err(err) => {
            warn!(entity = %schema.name, error = %err, "Source unavailable");
            report.record_error(ErrorEntry::from_error(&err));
            ctx.emit(IngestEvent::SourceUnavailable {
                run_id: ctx.run_id.clone(),
                entity: schema.name.clone(),
                error: err.to_string(),
                timestamp: Utc::now(),
            });
            report.advance(EntityStage::Complete);
            return finish(ctx, report);
        }
    };

    if files.is_empty() {
        let prefix = schema.folder_prefix();
        info!(entity = %schema.name, prefix = %prefix, "No files found");
        report.record_error(ErrorEntry::from_error(&IngestError::NoFilesFound {
            prefix: prefix.clone(),
        }));
        ctx.emit(IngestEvent::NoFilesFound {
            run_id: ctx.run_id.clone(),
            entity: schema.name.clone(),
            prefix,
            timestamp: Utc::now(),
        });
        report.advance(EntityStage::NoFilesFound);
        return finish(ctx, report);
    }

    report.advance(EntityStage::ProcessingFiles);
    let count = files.len();

    for (i, key) in files.iter().enumerate() {
        if ctx.is_cancelled() {
            cancel(ctx, schema, &mut report, Some(key.as_str()));
            break;
        }

        info!(entity = %schema.name, file = %key, "Processing file {}/{}", i + 1, count);
        let outcome = FileIngestor::new(ctx, schema, key)
            .run(&locator, &mut report)
            .await;

        if outcome == FileOutcome::Cancelled {
            cancel(ctx, schema, &mut report, Some(key.as_str()));
            break;
        }
    }

    report.advance(EntityStage::Complete);
    finish(ctx, report)
}

async fn discover(
    locator: &SourceLocator,
    schema: &EntitySchema,
) -> Result<Vec<String>, IngestError> {
    locator.check_container().await?;
    locator.locate(schema).await
}

fn cancel(
    ctx: &RunContext,
    schema: &EntitySchema,
    report: &mut IngestionReport,
    file: Option<&str>,
) {
    warn!(entity = %schema.name, "Ingestion cancelled");
    let mut entry = ErrorEntry::from_error(&IngestError::cancelled());
    if let Some(file) = file {
        entry = entry.with_file(file);
    }
    report.record_error(entry);
    ctx.emit(IngestEvent::Cancelled {
        run_id: ctx.run_id.clone(),
        entity: schema.name.clone(),
        reason: "cancellation requested".to_string(),
        timestamp: Utc::now(),
    });
}

fn finish(ctx: &RunContext, report: IngestionReport) -> IngestionReport {
    info!(
        entity = %report.entity,
        total = report.total,
        inserted = report.inserted,
        updated = report.updated,
        failed = report.failed,
        "Entity finished"
    );
    ctx.emit(IngestEvent::EntityCompleted {
        run_id: ctx.run_id.clone(),
        entity: report.entity.clone(),
        total: report.total,
        inserted: report.inserted,
        updated: report.updated,
        failed: report.failed,
        errors: report.errors.len(),
        timestamp: Utc::now(),
    });
    report
}
