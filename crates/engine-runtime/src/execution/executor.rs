use crate::{error::RuntimeError, execution::scheduler::run_levels};
use chrono::Utc;
use engine_core::{context::RunContext, report::summary::IngestionReport};
use model::events::ingest::IngestEvent;
use std::time::Instant;
use tracing::info;

/// Ingests the requested entities, dependencies first.
pub async fn run(ctx: RunContext, entities: &[&str]) -> Result<Vec<IngestionReport>, RuntimeError> {
    Orchestrator::new(ctx).ingest(entities).await
}

/// Entry point of an ingestion run over a shared [`RunContext`].
#[derive(Clone)]
pub struct Orchestrator {
    ctx: RunContext,
}

impl Orchestrator {
    pub fn new(ctx: RunContext) -> Self {
        Orchestrator { ctx }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Reports come back in processing order. Unknown entities and dependency
    /// cycles are rejected before anything is read.
    pub async fn ingest(&self, entities: &[&str]) -> Result<Vec<IngestionReport>, RuntimeError> {
        if entities.is_empty() {
            return Err(RuntimeError::NothingRequested);
        }

        let levels = self.ctx.catalog.dependency_levels(entities)?;
        let names: Vec<String> = levels.iter().flatten().map(|s| s.name.clone()).collect();

        info!("Ingestion run ID: {}", self.ctx.run_id);
        info!(entities = ?names, "Starting ingestion");
        self.ctx.emit(IngestEvent::RunStarted {
            run_id: self.ctx.run_id.clone(),
            entities: names,
            timestamp: Utc::now(),
        });

        let started = Instant::now();
        let reports = run_levels(&self.ctx, levels).await;

        let duration = started.elapsed();
        info!(
            entities = reports.len(),
            duration_ms = duration.as_millis() as u64,
            "Ingestion finished"
        );
        self.ctx.emit(IngestEvent::RunCompleted {
            run_id: self.ctx.run_id.clone(),
            entities: reports.len(),
            duration_ms: duration.as_millis() as u64,
            timestamp: Utc::now(),
        });

        Ok(reports)
    }

    pub async fn ingest_entity(&self, entity: &str) -> Result<IngestionReport, RuntimeError> {
        let mut reports = self.ingest(&[entity]).await?;
        reports.pop().ok_or(RuntimeError::NothingRequested)
    }

    /// Every entity of the catalog.
    pub async fn ingest_all(&self) -> Result<Vec<IngestionReport>, RuntimeError> {
        let catalog = self.ctx.catalog.clone();
        self.ingest(&catalog.names()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::{sql::memory::InMemoryStore, storage::memory::InMemoryObjectStore};
    use engine_core::{config::IngestSettings, events::CollectingSink};
    use model::entity::SchemaError;
    use std::sync::Arc;
    use tracing_test::traced_test;

    async fn orchestrator(sink: &CollectingSink, parallel: bool) -> Orchestrator {
        let objects = Arc::new(InMemoryObjectStore::new());
        objects.create_container("bucket").await;
        objects.put("bucket", "Job/jobs.csv", "1,Engineer\n").await;
        objects.put("bucket", "Department/d.csv", "1,Sales\n").await;
        let ctx = RunContext::new(
            Arc::new(InMemoryStore::new()),
            objects,
            IngestSettings::default()
                .with_container("bucket")
                .with_parallel_entities(parallel),
        )
        .with_sink(Arc::new(sink.clone()));
        Orchestrator::new(ctx)
    }

    #[tokio::test]
    async fn unknown_entity_is_rejected_before_processing() {
        let sink = CollectingSink::new();
        let err = orchestrator(&sink, false)
            .await
            .ingest(&["Department", "Salary"])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Schema(SchemaError::UnknownEntity(ref name)) if name == "Salary"
        ));
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn empty_request_is_rejected() {
        let sink = CollectingSink::new();
        let err = orchestrator(&sink, false).await.ingest(&[]).await.unwrap_err();
        assert!(matches!(err, RuntimeError::NothingRequested));
    }

    #[traced_test]
    #[tokio::test]
    async fn run_is_bracketed_by_start_and_completion() {
        let sink = CollectingSink::new();
        let reports = orchestrator(&sink, false).await.ingest_all().await.unwrap();

        let names: Vec<&str> = reports.iter().map(|r| r.entity.as_str()).collect();
        assert_eq!(names, vec!["Department", "Job", "Employee"]);

        let types = sink.event_types();
        assert_eq!(types.first(), Some(&"run.started"));
        assert_eq!(types.last(), Some(&"run.completed"));
        assert!(logs_contain("Ingestion finished"));
    }

    #[tokio::test]
    async fn parallel_level_keeps_catalog_order() {
        let sink = CollectingSink::new();
        let reports = orchestrator(&sink, true)
            .await
            .ingest(&["Job", "Department"])
            .await
            .unwrap();

        let names: Vec<&str> = reports.iter().map(|r| r.entity.as_str()).collect();
        assert_eq!(names, vec!["Department", "Job"]);
        assert!(reports.iter().all(|r| r.inserted == 1));
    }

    #[tokio::test]
    async fn single_entity_run_returns_its_report() {
        let sink = CollectingSink::new();
        let report = orchestrator(&sink, false)
            .await
            .ingest_entity("job")
            .await
            .unwrap();
        assert_eq!(report.entity, "Job");
        assert_eq!(report.inserted, 1);
    }
}
