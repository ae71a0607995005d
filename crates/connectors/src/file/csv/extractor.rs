use crate::file::csv::{error::FileError, settings::CsvSettings};
use bytes::Bytes;
use model::records::row::RawRow;
use std::io::Cursor;

/// Splits the bytes of one delimited file into raw rows.
///
/// The content is checked once up front (UTF-8 and quote balance), so iteration
/// only yields errors for problems the `csv` reader itself reports. `rows()` can
/// be called any number of times and always starts from the first record.
#[derive(Debug, Clone)]
pub struct RowExtractor {
    data: Bytes,
    settings: CsvSettings,
}

impl RowExtractor {
    pub fn new(data: Bytes, settings: &CsvSettings) -> Result<Self, FileError> {
        std::str::from_utf8(&data)?;
        check_quotes(&data, settings)?;
        Ok(RowExtractor {
            data,
            settings: settings.clone(),
        })
    }

    pub fn rows(&self) -> Rows {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.settings.delimiter)
            .quote(self.settings.quote)
            .from_reader(Cursor::new(self.data.clone()));
        Rows {
            records: reader.into_records(),
        }
    }
}

/// Lazy iterator over the records of one file.
pub struct Rows {
    records: csv::StringRecordsIntoIter<Cursor<Bytes>>,
}

impl Iterator for Rows {
    type Item = Result<RawRow, FileError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(err) => return Some(Err(FileError::CsvError(err))),
            };

            if is_blank(&record) {
                continue;
            }

            let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
            let fields = record.iter().map(str::to_string).collect();
            return Some(Ok(RawRow::new(line, fields)));
        }
    }
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.len() <= 1 && record.get(0).is_none_or(|f| f.trim().is_empty())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Fails when a quoted field is still open at the end of the input.
fn check_quotes(data: &[u8], settings: &CsvSettings) -> Result<(), FileError> {
    let mut state = QuoteState::FieldStart;
    let mut line = 1;
    let mut opened_at = 1;

    for &byte in data {
        state = match state {
            QuoteState::FieldStart if byte == settings.quote => {
                opened_at = line;
                QuoteState::Quoted
            }
            // `""` inside a quoted field is an escaped quote.
            QuoteState::QuoteInQuoted if byte == settings.quote => QuoteState::Quoted,
            QuoteState::FieldStart | QuoteState::Unquoted | QuoteState::QuoteInQuoted => {
                if byte == settings.delimiter || byte == b'\n' || byte == b'\r' {
                    QuoteState::FieldStart
                } else {
                    QuoteState::Unquoted
                }
            }
            QuoteState::Quoted if byte == settings.quote => QuoteState::QuoteInQuoted,
            QuoteState::Quoted => QuoteState::Quoted,
        };

        if byte == b'\n' {
            line += 1;
        }
    }

    if state == QuoteState::Quoted {
        return Err(FileError::UnterminatedQuote { line: opened_at });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(content: &str) -> Result<Vec<RawRow>, FileError> {
        let extractor = RowExtractor::new(
            Bytes::from(content.to_string()),
            &CsvSettings::default(),
        )?;
        extractor.rows().collect()
    }

    #[test]
    fn splits_rows_and_fields() {
        let rows = extract("1,Engineering\n2,Sales\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fields, vec!["1", "Engineering"]);
        assert_eq!(rows[1].line, 2);
    }

    #[test]
    fn quoted_delimiters_do_not_split() {
        let rows = extract("1,\"Sales, EMEA\"\n2,\"He said \"\"hi\"\"\"\n").unwrap();
        assert_eq!(rows[0].fields, vec!["1", "Sales, EMEA"]);
        assert_eq!(rows[1].fields, vec!["2", "He said \"hi\""]);
    }

    #[test]
    fn quoted_newline_keeps_one_record() {
        let rows = extract("1,\"line one\nline two\"\n2,Sales\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fields[1], "line one\nline two");
        assert_eq!(rows[1].line, 3);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let rows = extract("1,Engineering\n\n   \n2,Sales\r\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].line, 4);
        assert_eq!(rows[1].fields, vec!["2", "Sales"]);
    }

    #[test]
    fn ragged_rows_flow_through() {
        let rows = extract("1,Engineering\n2,Sales,ExtraField\n3\n").unwrap();
        assert_eq!(rows[1].len(), 3);
        assert_eq!(rows[2].len(), 1);
    }

    #[test]
    fn unterminated_quote_is_a_parse_error() {
        let err = extract("1,Engineering\n2,\"Sales\n3,Ops\n").unwrap_err();
        assert!(matches!(err, FileError::UnterminatedQuote { line: 2 }));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let data = Bytes::from_static(&[b'1', b',', 0xff, 0xfe, b'\n']);
        let err = RowExtractor::new(data, &CsvSettings::default()).unwrap_err();
        assert!(matches!(err, FileError::Encoding(_)));
    }

    #[test]
    fn rows_can_be_restarted() {
        let extractor = RowExtractor::new(
            Bytes::from_static(b"1,a\n2,b\n"),
            &CsvSettings::default(),
        )
        .unwrap();
        let first: Vec<_> = extractor.rows().take(1).collect();
        let all: Vec<_> = extractor.rows().collect();
        assert_eq!(first.len(), 1);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn custom_delimiter() {
        let settings = CsvSettings::default().with_delimiter('|').unwrap();
        let extractor = RowExtractor::new(Bytes::from_static(b"1|a,b\n"), &settings).unwrap();
        let rows: Vec<_> = extractor.rows().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows[0].fields, vec!["1", "a,b"]);
    }
}
