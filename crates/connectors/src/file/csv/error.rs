use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("File is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("Unterminated quoted field starting at line {line}")]
    UnterminatedQuote { line: usize },
    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Invalid CSV settings: {0}")]
    InvalidSettings(String),
}
