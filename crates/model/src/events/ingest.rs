use crate::events::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle events of one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngestEvent {
    RunStarted {
        run_id: String,
        entities: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    EntityStarted {
        run_id: String,
        entity: String,
        timestamp: DateTime<Utc>,
    },

    FilesDiscovered {
        run_id: String,
        entity: String,
        files: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    NoFilesFound {
        run_id: String,
        entity: String,
        prefix: String,
        timestamp: DateTime<Utc>,
    },

    SourceUnavailable {
        run_id: String,
        entity: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    FileStarted {
        run_id: String,
        entity: String,
        file: String,
        timestamp: DateTime<Utc>,
    },

    FileFailed {
        run_id: String,
        entity: String,
        file: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    RowRejected {
        run_id: String,
        entity: String,
        file: String,
        line: usize,
        error: String,
        timestamp: DateTime<Utc>,
    },

    BatchCommitted {
        run_id: String,
        entity: String,
        file: String,
        batch_id: String,
        batch: usize,
        inserted: usize,
        updated: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    BatchRolledBack {
        run_id: String,
        entity: String,
        file: String,
        batch_id: String,
        batch: usize,
        rows: usize,
        error: String,
        timestamp: DateTime<Utc>,
    },

    EntityCompleted {
        run_id: String,
        entity: String,
        total: usize,
        inserted: usize,
        updated: usize,
        failed: usize,
        errors: usize,
        timestamp: DateTime<Utc>,
    },

    Cancelled {
        run_id: String,
        entity: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    RunCompleted {
        run_id: String,
        entities: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl IngestEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            IngestEvent::RunStarted { .. } => "run.started",
            IngestEvent::EntityStarted { .. } => "entity.started",
            IngestEvent::FilesDiscovered { .. } => "files.discovered",
            IngestEvent::NoFilesFound { .. } => "files.none_found",
            IngestEvent::SourceUnavailable { .. } => "source.unavailable",
            IngestEvent::FileStarted { .. } => "file.started",
            IngestEvent::FileFailed { .. } => "file.failed",
            IngestEvent::RowRejected { .. } => "row.rejected",
            IngestEvent::BatchCommitted { .. } => "batch.committed",
            IngestEvent::BatchRolledBack { .. } => "batch.rolled_back",
            IngestEvent::EntityCompleted { .. } => "entity.completed",
            IngestEvent::Cancelled { .. } => "run.cancelled",
            IngestEvent::RunCompleted { .. } => "run.completed",
        }
    }

    pub fn run_id(&self) -> &str {
        match self {
            IngestEvent::RunStarted { run_id, .. }
            | IngestEvent::EntityStarted { run_id, .. }
            | IngestEvent::FilesDiscovered { run_id, .. }
            | IngestEvent::NoFilesFound { run_id, .. }
            | IngestEvent::SourceUnavailable { run_id, .. }
            | IngestEvent::FileStarted { run_id, .. }
            | IngestEvent::FileFailed { run_id, .. }
            | IngestEvent::RowRejected { run_id, .. }
            | IngestEvent::BatchCommitted { run_id, .. }
            | IngestEvent::BatchRolledBack { run_id, .. }
            | IngestEvent::EntityCompleted { run_id, .. }
            | IngestEvent::Cancelled { run_id, .. }
            | IngestEvent::RunCompleted { run_id, .. } => run_id,
        }
    }

    /// The entity the event belongs to; `None` for run-wide events.
    pub fn entity(&self) -> Option<&str> {
        match self {
            IngestEvent::EntityStarted { entity, .. }
            | IngestEvent::FilesDiscovered { entity, .. }
            | IngestEvent::NoFilesFound { entity, .. }
            | IngestEvent::SourceUnavailable { entity, .. }
            | IngestEvent::FileStarted { entity, .. }
            | IngestEvent::FileFailed { entity, .. }
            | IngestEvent::RowRejected { entity, .. }
            | IngestEvent::BatchCommitted { entity, .. }
            | IngestEvent::BatchRolledBack { entity, .. }
            | IngestEvent::EntityCompleted { entity, .. }
            | IngestEvent::Cancelled { entity, .. } => Some(entity),
            IngestEvent::RunStarted { .. } | IngestEvent::RunCompleted { .. } => None,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            IngestEvent::RunStarted { timestamp, .. }
            | IngestEvent::EntityStarted { timestamp, .. }
            | IngestEvent::FilesDiscovered { timestamp, .. }
            | IngestEvent::NoFilesFound { timestamp, .. }
            | IngestEvent::SourceUnavailable { timestamp, .. }
            | IngestEvent::FileStarted { timestamp, .. }
            | IngestEvent::FileFailed { timestamp, .. }
            | IngestEvent::RowRejected { timestamp, .. }
            | IngestEvent::BatchCommitted { timestamp, .. }
            | IngestEvent::BatchRolledBack { timestamp, .. }
            | IngestEvent::EntityCompleted { timestamp, .. }
            | IngestEvent::Cancelled { timestamp, .. }
            | IngestEvent::RunCompleted { timestamp, .. } => *timestamp,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            IngestEvent::NoFilesFound { .. }
                | IngestEvent::SourceUnavailable { .. }
                | IngestEvent::FileFailed { .. }
                | IngestEvent::RowRejected { .. }
                | IngestEvent::BatchRolledBack { .. }
        )
    }
}

impl fmt::Display for IngestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ts = self.timestamp().format("%Y-%m-%d %H:%M:%S");
        match self {
            IngestEvent::RunStarted {
                run_id, entities, ..
            } => write!(
                f,
                "[{ts}] Run started for [{}] (run={run_id})",
                entities.join(", ")
            ),
            IngestEvent::EntityStarted { entity, .. } => {
                write!(f, "[{ts}] {entity}: started")
            }
            IngestEvent::FilesDiscovered { entity, files, .. } => {
                write!(f, "[{ts}] {entity}: {} file(s) found", files.len())
            }
            IngestEvent::NoFilesFound { entity, prefix, .. } => {
                write!(f, "[{ts}] {entity}: no files under '{prefix}'")
            }
            IngestEvent::SourceUnavailable { entity, error, .. } => {
                write!(f, "[{ts}] {entity}: source unavailable: {error}")
            }
            IngestEvent::FileStarted { entity, file, .. } => {
                write!(f, "[{ts}] {entity}: processing {file}")
            }
            IngestEvent::FileFailed {
                entity, file, error, ..
            } => write!(f, "[{ts}] {entity}: file {file} failed: {error}"),
            IngestEvent::RowRejected {
                entity,
                file,
                line,
                error,
                ..
            } => write!(f, "[{ts}] {entity}: {file}:{line} rejected: {error}"),
            IngestEvent::BatchCommitted {
                entity,
                batch,
                inserted,
                updated,
                duration_ms,
                ..
            } => write!(
                f,
                "[{ts}] {entity}: batch {batch} committed ({inserted} inserted, {updated} updated) in {duration_ms}ms"
            ),
            IngestEvent::BatchRolledBack {
                entity,
                batch,
                rows,
                error,
                ..
            } => write!(
                f,
                "[{ts}] {entity}: batch {batch} rolled back, {rows} row(s) failed: {error}"
            ),
            IngestEvent::EntityCompleted {
                entity,
                total,
                inserted,
                updated,
                failed,
                ..
            } => write!(
                f,
                "[{ts}] {entity}: completed total={total} inserted={inserted} updated={updated} failed={failed}"
            ),
            IngestEvent::Cancelled { entity, reason, .. } => {
                write!(f, "[{ts}] {entity}: cancelled ({reason})")
            }
            IngestEvent::RunCompleted {
                run_id,
                entities,
                duration_ms,
                ..
            } => write!(
                f,
                "[{ts}] Run completed: {entities} entit(ies) in {duration_ms}ms (run={run_id})"
            ),
        }
    }
}

impl Event for IngestEvent {
    fn event_type(&self) -> &'static str {
        self.event_type()
    }
}
