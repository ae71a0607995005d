use crate::file::csv::error::FileError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvSettings {
    pub delimiter: u8,
    pub quote: u8,
    /// Extension (with the leading dot) a key must end with to be read.
    pub extension: String,
}

impl Default for CsvSettings {
    fn default() -> Self {
        CsvSettings {
            delimiter: b',',
            quote: b'"',
            extension: ".csv".to_string(),
        }
    }
}

impl CsvSettings {
    pub fn with_delimiter(mut self, delimiter: char) -> Result<Self, FileError> {
        self.delimiter = ascii_byte(delimiter)?;
        Ok(self)
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        let ext = extension.trim();
        self.extension = if ext.starts_with('.') {
            ext.to_string()
        } else {
            format!(".{ext}")
        };
        self
    }

    pub fn matches(&self, key: &str) -> bool {
        key.len() > self.extension.len()
            && key
                .to_ascii_lowercase()
                .ends_with(&self.extension.to_ascii_lowercase())
    }
}

fn ascii_byte(c: char) -> Result<u8, FileError> {
    if c.is_ascii() && c != '\n' && c != '\r' {
        Ok(c as u8)
    } else {
        Err(FileError::InvalidSettings(format!(
            "delimiter must be a single ASCII character, got {c:?}"
        )))
    }
}
