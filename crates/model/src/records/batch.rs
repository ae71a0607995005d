use crate::{
    core::value::{FieldValue, Value},
    records::row::{RawRow, RowData},
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteKind {
    Insert,
    Update,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert the full record; unset fields are left to the store's defaults.
    Insert(RowData),
    /// Partial update: only fields present in the source, never the key itself.
    Update { key: Value, changes: Vec<FieldValue> },
}

/// A write decision that is not durable until its batch commits.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedWrite {
    pub op: WriteOp,
    /// The source row the decision was made for, kept for error reporting.
    pub raw: RawRow,
}

impl StagedWrite {
    pub fn insert(record: RowData, raw: RawRow) -> Self {
        StagedWrite {
            op: WriteOp::Insert(record),
            raw,
        }
    }

    pub fn update(key: Value, changes: Vec<FieldValue>, raw: RawRow) -> Self {
        StagedWrite {
            op: WriteOp::Update { key, changes },
            raw,
        }
    }

    pub fn kind(&self) -> WriteKind {
        match self.op {
            WriteOp::Insert(_) => WriteKind::Insert,
            WriteOp::Update { .. } => WriteKind::Update,
        }
    }
}

/// Staged writes of one file and one entity, committed or rolled back as a whole.
#[derive(Debug, Clone)]
pub struct Batch {
    pub id: String,
    pub entity: String,
    pub source_key: String,
    /// 1-based position of the batch within its file.
    pub number: usize,
    pub writes: Vec<StagedWrite>,
}

impl Batch {
    pub fn new(entity: &str, source_key: &str, number: usize) -> Self {
        Batch {
            id: uuid::Uuid::new_v4().to_string(),
            entity: entity.to_string(),
            source_key: source_key.to_string(),
            number,
            writes: Vec::new(),
        }
    }

    pub fn push(&mut self, write: StagedWrite) {
        self.writes.push(write);
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// `(inserts, updates)` staged in this batch.
    pub fn counts(&self) -> (usize, usize) {
        self.writes
            .iter()
            .fold((0, 0), |(ins, upd), w| match w.kind() {
                WriteKind::Insert => (ins + 1, upd),
                WriteKind::Update => (ins, upd + 1),
            })
    }
}
