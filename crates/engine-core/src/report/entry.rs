use crate::error::{ErrorKind, IngestError};
use model::records::row::RawRow;
use serde::{Deserialize, Serialize};

/// One failure recorded in an ingestion report.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// 1-based batch number within the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// The raw fields of the failed row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<Vec<String>>,
    pub error: String,
}

impl ErrorEntry {
    pub fn new(kind: ErrorKind, error: impl Into<String>) -> Self {
        ErrorEntry {
            kind,
            file: None,
            batch: None,
            line: None,
            row: None,
            error: error.into(),
        }
    }

    pub fn from_error(err: &IngestError) -> Self {
        Self::new(err.kind(), err.to_string())
    }

    pub fn with_file(mut self, file: &str) -> Self {
        self.file = Some(file.to_string());
        self
    }

    pub fn with_batch(mut self, batch: usize) -> Self {
        self.batch = Some(batch);
        self
    }

    pub fn with_row(mut self, row: &RawRow) -> Self {
        self.line = Some(row.line);
        self.row = Some(row.fields.clone());
        self
    }
}
