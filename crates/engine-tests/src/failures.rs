#[cfg(test)]
mod tests {
    use crate::{
        BUCKET, Harness, department,
        mocks::{CancelAfterCommits, FailingCommitStore, SlowLookupStore, UnreadableKeys},
        text,
    };
    use connectors::storage::{ObjectStore, local::LocalObjectStore, memory::InMemoryObjectStore};
    use engine_core::{
        error::ErrorKind,
        events::{CollectingSink, EventSink},
        report::summary::EntityStage,
    };
    use engine_runtime::Orchestrator;
    use model::{
        core::data_type::DataType,
        entity::{EntitySchema, SchemaCatalog},
    };
    use std::{sync::Arc, time::Duration};
    use tracing_test::traced_test;

    // Scenario: the second of three commits fails at the store.
    // Expected Outcome: only that batch is reported; the surrounding batches are kept.
    #[traced_test]
    #[tokio::test]
    async fn commit_failure_is_reported_per_row() {
        let h = Harness::new().await.with_settings(|s| s.with_batch_size(2));
        h.put(
            "Department/departments.csv",
            "1,Product\n2,Sales\n3,Legal\n4,Design\n5,Support\n",
        )
        .await;
        let store = Arc::new(FailingCommitStore::new(h.store.clone(), &[2]));

        let report = Orchestrator::new(h.context_with(store, h.objects.clone()))
            .ingest_entity("Department")
            .await
            .unwrap();

        assert_eq!((report.inserted, report.failed), (3, 2));
        assert!(report.errors.iter().all(|e| {
            e.kind == ErrorKind::CommitFailure
                && e.batch == Some(2)
                && e.error.contains("connection reset by peer")
        }));
        assert_eq!(h.store.count("Department").await, 3);
        assert!(h.sink.event_types().contains(&"batch.rolled_back"));
        assert!(logs_contain("Batch rolled back"));
    }

    // Scenario: every lookup outlasts the store timeout.
    // Expected Outcome: each row fails on its own and nothing is written.
    #[tokio::test]
    async fn slow_lookups_fail_rows() {
        let h = Harness::new()
            .await
            .with_settings(|s| s.with_store_timeout(Duration::from_millis(20)));
        h.put("Job/jobs.csv", "1,Recruiter\n2,Manager\n").await;
        let store = Arc::new(SlowLookupStore::new(
            h.store.clone(),
            Duration::from_millis(200),
        ));

        let report = Orchestrator::new(h.context_with(store, h.objects.clone()))
            .ingest_entity("Job")
            .await
            .unwrap();

        assert_eq!((report.total, report.failed), (2, 2));
        assert!(report.errors.iter().all(|e| {
            e.kind == ErrorKind::UnexpectedFailure && e.error == "lookup timed out after 20ms"
        }));
        assert_eq!(h.store.count("Job").await, 0);
    }

    // Scenario: one of two files cannot be read.
    // Expected Outcome: the failure names the file and the other file is still ingested.
    #[tokio::test]
    async fn unreadable_file_is_skipped() {
        let h = Harness::new().await;
        h.put("Job/a.csv", "1,Recruiter\n").await;
        h.put("Job/b.csv", "2,Manager\n").await;
        let objects = Arc::new(UnreadableKeys::new(h.objects.clone(), &["Job/a.csv"]));

        let report = Orchestrator::new(h.context_with(h.store.clone(), objects))
            .ingest_entity("Job")
            .await
            .unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.total, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, ErrorKind::SourceUnavailable);
        assert_eq!(report.errors[0].file.as_deref(), Some("Job/a.csv"));
        assert_eq!(report.processed_files, vec!["Job/b.csv"]);
    }

    // Scenario: the configured bucket does not exist.
    // Expected Outcome: every entity reports SourceUnavailable and the run still returns.
    #[tokio::test]
    async fn missing_bucket_is_source_unavailable() {
        let h = Harness::new()
            .await
            .with_settings(|s| s.with_container("does-not-exist"));

        let reports = h.run(&["Department", "Job"]).await;

        assert_eq!(reports.len(), 2);
        for report in reports {
            assert_eq!(report.stage, EntityStage::Complete);
            assert!(report.has_error_kind(ErrorKind::SourceUnavailable));
            assert_eq!(report.total, 0);
        }
    }

    // Scenario: a file with an unterminated quote next to a good one.
    // Expected Outcome: a ParseError names the bad file; the good file is ingested.
    #[tokio::test]
    async fn malformed_file_does_not_stop_entity() {
        let h = Harness::new().await;
        h.put("Department/a.csv", "1,\"Product\n2,Sales\n").await;
        h.put("Department/b.csv", "3,Legal\n").await;

        let report = h.run_one("Department").await;

        assert_eq!(report.inserted, 1);
        let entry = &report.errors[0];
        assert_eq!(entry.kind, ErrorKind::ParseError);
        assert_eq!(entry.file.as_deref(), Some("Department/a.csv"));
        assert!(entry.error.contains("line 1"));
    }

    // Scenario: shutdown is requested right after the first batch commits.
    // Expected Outcome: no further batch commits, the committed one stays, and
    // every report records the cancellation.
    #[tokio::test]
    async fn cancellation_stops_at_batch_boundary() {
        let h = Harness::new().await.with_settings(|s| s.with_batch_size(1));
        h.put("Department/departments.csv", "1,Product\n2,Sales\n3,Legal\n")
            .await;
        h.put("Job/jobs.csv", "1,Recruiter\n").await;

        let collecting = CollectingSink::new();
        let sinks: Vec<Arc<dyn EventSink>> = vec![
            Arc::new(collecting.clone()),
            Arc::new(CancelAfterCommits::new(h.cancel.clone(), 1)),
        ];
        let ctx = h.context().with_sink(Arc::new(sinks));

        let reports = Orchestrator::new(ctx)
            .ingest(&["Department", "Job"])
            .await
            .unwrap();

        assert_eq!(reports[0].inserted, 1);
        assert_eq!(h.store.count("Department").await, 1);
        assert_eq!(h.store.count("Job").await, 0);
        for report in &reports {
            assert_eq!(report.stage, EntityStage::Complete);
            assert!(report.errors.iter().any(|e| {
                e.kind == ErrorKind::UnexpectedFailure && e.error == "cancelled"
            }));
        }
        assert_eq!(
            collecting
                .event_types()
                .iter()
                .filter(|t| **t == "run.cancelled")
                .count(),
            2
        );
    }

    // Scenario: files live in a local directory tree instead of a bucket.
    // Expected Outcome: the local store behaves like the object store.
    #[tokio::test]
    async fn ingests_from_local_directory() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join(BUCKET).join("Department");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("departments.csv"), "1,Product\n2,Sales\n").unwrap();
        std::fs::write(folder.join("README.md"), "not data").unwrap();

        let h = Harness::new().await;
        h.seed("Department", vec![department(2, "Marketing")]).await;
        let objects: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(dir.path()));

        let report = Orchestrator::new(h.context_with(h.store.clone(), objects))
            .ingest_entity("Department")
            .await
            .unwrap();

        assert_eq!((report.inserted, report.updated), (1, 1));
        assert_eq!(report.processed_files, vec!["Department/departments.csv"]);
        assert_eq!(
            h.pairs("Department", "department").await,
            vec![(1, text("Product")), (2, text("Sales"))]
        );
    }

    // Scenario: a catalog loaded from JSON with a text key, a semicolon delimiter
    // and a custom extension.
    // Expected Outcome: the run follows the configured format.
    #[tokio::test]
    async fn custom_catalog_and_format() {
        let catalog = SchemaCatalog::new(vec![
            EntitySchema::new("Region", "region", "code")
                .field("code", DataType::String)
                .field("label", DataType::String)
                .field("active", DataType::Boolean),
        ])
        .unwrap();
        let h = Harness::new().await.with_catalog(catalog).with_settings(|s| {
            let mut s = s.with_extension("txt");
            s.csv = s.csv.with_delimiter(';').unwrap();
            s
        });
        h.put("Region/regions.txt", "EU;Europe;true\nAM;Americas;false\n")
            .await;
        h.put("Region/ignored.csv", "XX;Nowhere;true\n").await;

        let report = h.run_one("Region").await;

        assert_eq!((report.inserted, report.failed), (2, 0));
        assert_eq!(report.table, "region");
        assert_eq!(h.store.count("Region").await, 2);
    }

    // Scenario: two entities in one run, one of them unknown.
    // Expected Outcome: the request is refused before anything is read.
    #[tokio::test]
    async fn unknown_entity_refuses_the_run() {
        let h = Harness::new().await;
        h.put("Department/departments.csv", "1,Product\n").await;

        let result = Orchestrator::new(h.context())
            .ingest(&["Department", "Salaries"])
            .await;

        assert!(result.is_err());
        assert_eq!(h.store.count("Department").await, 0);
        assert!(h.sink.events().is_empty());
    }

    #[tokio::test]
    async fn empty_bucket_reports_every_entity() {
        let h = Harness::new().await;
        let objects: Arc<dyn ObjectStore> = {
            let store = InMemoryObjectStore::new();
            store.create_container(BUCKET).await;
            Arc::new(store)
        };

        let reports = Orchestrator::new(h.context_with(h.store.clone(), objects))
            .ingest_all()
            .await
            .unwrap();

        assert_eq!(reports.len(), 3);
        assert!(reports
            .iter()
            .all(|r| r.stage == EntityStage::NoFilesFound && r.total == 0));
    }
}
