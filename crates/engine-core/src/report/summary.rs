use crate::{
    error::{ErrorKind, IngestError},
    report::entry::ErrorEntry,
};
use model::{entity::EntitySchema, records::row::RawRow};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Lifecycle of one entity within a run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityStage {
    #[default]
    Pending,
    DiscoveringFiles,
    NoFilesFound,
    ProcessingFiles,
    Complete,
}

impl EntityStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, EntityStage::NoFilesFound | EntityStage::Complete)
    }

    pub fn can_advance_to(self, next: EntityStage) -> bool {
        use EntityStage::*;
        matches!(
            (self, next),
            (Pending, DiscoveringFiles)
                | (DiscoveringFiles, NoFilesFound)
                | (DiscoveringFiles, ProcessingFiles)
                | (DiscoveringFiles, Complete)
                | (ProcessingFiles, Complete)
        )
    }
}

/// Aggregate result of ingesting one entity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IngestionReport {
    pub entity: String,
    pub table: String,
    pub stage: EntityStage,
    pub total: usize,
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
    pub errors: Vec<ErrorEntry>,
    pub processed_files: Vec<String>,
}

impl IngestionReport {
    pub fn new(schema: &EntitySchema) -> Self {
        IngestionReport {
            entity: schema.name.clone(),
            table: schema.table.clone(),
            stage: EntityStage::Pending,
            total: 0,
            inserted: 0,
            updated: 0,
            failed: 0,
            errors: Vec::new(),
            processed_files: Vec::new(),
        }
    }

    /// Moves to `next` if the transition is allowed; returns whether it was.
    pub fn advance(&mut self, next: EntityStage) -> bool {
        if !self.stage.can_advance_to(next) {
            warn!(entity = %self.entity, from = ?self.stage, to = ?next, "Ignoring invalid stage transition");
            return false;
        }
        self.stage = next;
        true
    }

    pub fn record_committed(&mut self, inserted: usize, updated: usize) {
        self.inserted += inserted;
        self.updated += updated;
        self.total += inserted + updated;
    }

    /// A row that was rejected on its own; counts towards `failed`.
    pub fn record_row_failure(&mut self, entry: ErrorEntry) {
        self.failed += 1;
        self.total += 1;
        self.errors.push(entry);
    }

    /// Every row of a rolled-back batch fails with the same reason.
    pub fn record_batch_failure<'a>(
        &mut self,
        file: &str,
        batch: usize,
        rows: impl IntoIterator<Item = &'a RawRow>,
        err: &IngestError,
    ) {
        let reason = err.to_string();
        for row in rows {
            self.record_row_failure(
                ErrorEntry::new(ErrorKind::CommitFailure, reason.clone())
                    .with_file(file)
                    .with_batch(batch)
                    .with_row(row),
            );
        }
    }

    /// A failure that does not belong to a single row; counters are untouched.
    pub fn record_error(&mut self, entry: ErrorEntry) {
        self.errors.push(entry);
    }

    pub fn record_file(&mut self, file: &str) {
        self.processed_files.push(file.to_string());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_balanced(&self) -> bool {
        self.total == self.inserted + self.updated + self.failed
    }

    pub fn has_error_kind(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::entity::SchemaCatalog;

    fn report() -> IngestionReport {
        IngestionReport::new(SchemaCatalog::builtin().get("Department").unwrap())
    }

    #[test]
    fn stage_machine_rejects_skips() {
        let mut report = report();
        assert!(!report.advance(EntityStage::ProcessingFiles));
        assert!(report.advance(EntityStage::DiscoveringFiles));
        assert!(report.advance(EntityStage::NoFilesFound));
        assert!(report.stage.is_terminal());
        assert!(!report.advance(EntityStage::Complete));
        assert_eq!(report.stage, EntityStage::NoFilesFound);
    }

    #[test]
    fn batch_failure_fails_every_row_with_shared_reason() {
        let mut report = report();
        report.record_committed(2, 1);
        let rows = vec![
            RawRow::new(4, vec!["4".into(), "Ops".into()]),
            RawRow::new(5, vec!["5".into(), "Legal".into()]),
        ];
        report.record_batch_failure(
            "Department/d.csv",
            2,
            &rows,
            &IngestError::Commit("connection reset".into()),
        );

        assert_eq!(report.total, 5);
        assert_eq!(report.failed, 2);
        assert!(report.is_balanced());
        assert!(report
            .errors
            .iter()
            .all(|e| e.error == "batch failed: connection reset" && e.batch == Some(2)));
        assert_eq!(report.errors[1].line, Some(5));
    }

    #[test]
    fn file_errors_do_not_touch_counters() {
        let mut report = report();
        report.record_error(
            ErrorEntry::new(ErrorKind::ParseError, "unterminated quote").with_file("Department/x.csv"),
        );
        assert_eq!(report.total, 0);
        assert!(report.has_errors());
        assert!(report.has_error_kind(ErrorKind::ParseError));
    }

    #[test]
    fn serializes_like_the_api_response() {
        let mut report = report();
        report.record_row_failure(
            ErrorEntry::new(ErrorKind::ValidationError, "row has 3 field(s), expected 2")
                .with_row(&RawRow::new(2, vec!["2".into(), "Sales".into(), "ExtraField".into()])),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stage"], "PENDING");
        assert_eq!(json["errors"][0]["kind"], "ValidationError");
        assert_eq!(json["errors"][0]["row"][2], "ExtraField");
        assert!(json["errors"][0].get("file").is_none());
    }
}
