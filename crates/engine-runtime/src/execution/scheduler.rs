use crate::execution::entity::ingest_entity;
use engine_core::{
    context::RunContext,
    error::ErrorKind,
    report::{
        entry::ErrorEntry,
        summary::{EntityStage, IngestionReport},
    },
};
use futures::future::join_all;
use model::entity::EntitySchema;
use tracing::{error, info};

/// Runs dependency levels in order. Entities of one level run concurrently when
/// `parallel_entities` is set, otherwise one after another in catalog order.
pub async fn run_levels(ctx: &RunContext, levels: Vec<Vec<EntitySchema>>) -> Vec<IngestionReport> {
    let mut reports = Vec::new();
    let count = levels.len();

    for (i, level) in levels.into_iter().enumerate() {
        info!(
            entities = ?level.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            "Processing level {}/{}",
            i + 1,
            count
        );

        if ctx.settings.parallel_entities && level.len() > 1 {
            reports.extend(run_parallel(ctx, level).await);
        } else {
            for schema in &level {
                reports.push(ingest_entity(ctx, schema).await);
            }
        }
    }

    reports
}

async fn run_parallel(ctx: &RunContext, level: Vec<EntitySchema>) -> Vec<IngestionReport> {
    let handles = level.iter().map(|schema| {
        let ctx = ctx.clone();
        let schema = schema.clone();
        tokio::spawn(async move { ingest_entity(&ctx, &schema).await })
    });
    let results = join_all(handles).await;

    level
        .iter()
        .zip(results)
        .map(|(schema, result)| match result {
            Ok(report) => report,
            Err(err) => {
                error!(entity = %schema.name, error = %err, "Entity task failed");
                let mut report = IngestionReport::new(schema);
                report.advance(EntityStage::DiscoveringFiles);
                report.advance(EntityStage::Complete);
                report.record_error(ErrorEntry::new(
                    ErrorKind::UnexpectedFailure,
                    format!("entity task failed: {err}"),
                ));
                report
            }
        })
        .collect()
}
