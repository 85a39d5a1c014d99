//! BRT data file parsing: delimiter detection, header handling and row
//! extraction into `RawDataRecord`s.

pub mod detect;

use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{BrtError, Result};
use crate::observability::metrics;
use crate::types::RawDataRecord;

pub use detect::{detect_delimiter, detect_file_type, BrtFileKind};

/// Field separator of a data file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    Comma,
    Tab,
}

impl Delimiter {
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
        }
    }

    pub fn as_char(self) -> char {
        self.as_byte() as char
    }
}

/// A fully parsed data file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDataFile {
    pub headers: Vec<String>,
    pub delimiter: Delimiter,
    pub records: Vec<RawDataRecord>,
    /// Row numbers dropped because their field count did not match the header
    pub skipped_rows: Vec<usize>,
}

pub trait Parser {
    fn parse(&self, content: &str) -> Result<ParsedDataFile>;
}

/// A wrapper that adds metrics to any parser implementation
pub struct MetricsParser<P: Parser> {
    inner: P,
}

impl<P: Parser> MetricsParser<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

impl<P: Parser> Parser for MetricsParser<P> {
    fn parse(&self, content: &str) -> Result<ParsedDataFile> {
        match self.inner.parse(content) {
            Ok(parsed) => {
                metrics::data::parse_success(parsed.records.len());
                metrics::data::rows_skipped(parsed.skipped_rows.len());
                Ok(parsed)
            }
            Err(e) => {
                metrics::data::parse_error();
                Err(e)
            }
        }
    }
}

/// CSV / TSV parser for BRT exports. Quoted fields may contain delimiters
/// and doubled quotes; values are trimmed.
#[derive(Debug, Clone, Default)]
pub struct CsvDataParser;

impl CsvDataParser {
    pub fn new() -> Self {
        Self
    }
}

impl Parser for CsvDataParser {
    fn parse(&self, content: &str) -> Result<ParsedDataFile> {
        let lines: Vec<&str> = content.lines().filter(|line| !line.trim().is_empty()).collect();
        if lines.len() < 2 {
            return Err(BrtError::NoDataRows { lines: lines.len() });
        }

        let delimiter = detect_delimiter(lines[0]);
        debug!("CsvDataParser: start lines={} delimiter={:?}", lines.len(), delimiter);

        // The reader skips empty lines itself, inside quotes they stay part of the field
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter.as_byte())
            .trim(Trim::All)
            .flexible(true)
            .has_headers(true)
            .from_reader(content.trim_start().as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(clean_header).collect();

        let mut records = Vec::new();
        let mut skipped_rows = Vec::new();
        let mut row_number = 0;
        for result in reader.records() {
            let row = match result {
                // whitespace-only or all-blank lines
                Ok(row) if row.iter().all(str::is_empty) => continue,
                Ok(row) => {
                    row_number += 1;
                    row
                }
                Err(e) => {
                    row_number += 1;
                    warn!("Row {} could not be read, skipping: {}", row_number, e);
                    skipped_rows.push(row_number);
                    continue;
                }
            };

            if row.len() != headers.len() {
                warn!(
                    "Row {} has {} values but {} headers - skipping",
                    row_number,
                    row.len(),
                    headers.len()
                );
                skipped_rows.push(row_number);
                continue;
            }

            records.push(RawDataRecord::from_pairs(
                row_number,
                headers.iter().cloned().zip(row.iter()),
            ));
        }

        if records.is_empty() {
            return Err(BrtError::NoDataRows { lines: lines.len() });
        }

        info!(
            "Parsed {} records with {} columns ({} skipped)",
            records.len(),
            headers.len(),
            skipped_rows.len()
        );
        Ok(ParsedDataFile {
            headers,
            delimiter,
            records,
            skipped_rows,
        })
    }
}

fn clean_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().trim_matches('"').trim().to_string()
}

/// Parse a data file with the default parser and metrics
pub fn parse_data_file(content: &str) -> Result<ParsedDataFile> {
    MetricsParser::new(CsvDataParser::new()).parse(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_csv() {
        let content = "BLOCK,LOT,QUALIFIER,INFOBY\n1,2,,6\n3, 4 ,C01, 7\n";
        let parsed = parse_data_file(content).unwrap();

        assert_eq!(parsed.headers, vec!["BLOCK", "LOT", "QUALIFIER", "INFOBY"]);
        assert_eq!(parsed.delimiter, Delimiter::Comma);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[1].get("LOT"), Some("4"));
        assert_eq!(parsed.records[1].get("INFOBY"), Some("7"));
        assert_eq!(parsed.records[0].get("QUALIFIER"), Some(""));
        assert_eq!(parsed.records[1].row_number, 2);
    }

    #[test]
    fn test_quoted_fields_keep_embedded_commas() {
        let content = "BLOCK,LOT,OWNER_OWNER\n\"1\",\"2\",\"SMITH, JOHN \"\"JACK\"\"\"\n";
        let parsed = parse_data_file(content).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].get("OWNER_OWNER"), Some("SMITH, JOHN \"JACK\""));
        assert_eq!(parsed.records[0].get("BLOCK"), Some("1"));
    }

    #[test]
    fn test_quoted_headers_are_cleaned() {
        let content = "\u{feff}\"BLOCK\", \"LOT\"\n1,2\n";
        let parsed = parse_data_file(content).unwrap();
        assert_eq!(parsed.headers, vec!["BLOCK", "LOT"]);
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let content = "\n\nBLOCK,LOT\n\n1,2\n   \n3,4\n";
        let parsed = parse_data_file(content).unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert!(parsed.skipped_rows.is_empty());
    }

    #[test]
    fn test_quoted_field_keeps_blank_lines() {
        let content = "BLOCK,LOT,NOTES\n1,2,\"first\n\nsecond\"\n\n3,4,plain\n";
        let parsed = parse_data_file(content).unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].get("NOTES"), Some("first\n\nsecond"));
        assert_eq!(parsed.records[1].get("NOTES"), Some("plain"));
        assert_eq!(parsed.records[1].row_number, 2);
        assert!(parsed.skipped_rows.is_empty());
    }

    #[test]
    fn test_mismatched_rows_are_skipped() {
        let content = "BLOCK,LOT,QUALIFIER\n1,2,\n3,4\n5,6,7,8\n9,10,C\n";
        let parsed = parse_data_file(content).unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.skipped_rows, vec![2, 3]);
        assert_eq!(parsed.records[1].get("QUALIFIER"), Some("C"));
    }

    #[test]
    fn test_header_only_is_no_data_rows() {
        let err = parse_data_file("BLOCK,LOT,QUALIFIER\n\n").unwrap_err();
        assert!(matches!(err, BrtError::NoDataRows { lines: 1 }));
        assert!(matches!(parse_data_file("").unwrap_err(), BrtError::NoDataRows { lines: 0 }));
    }

    #[test]
    fn test_all_rows_malformed_is_no_data_rows() {
        let err = parse_data_file("BLOCK,LOT,QUALIFIER\n1\n2\n").unwrap_err();
        assert!(matches!(err, BrtError::NoDataRows { .. }));
    }

    #[test]
    fn test_tab_separated() {
        let headers: Vec<String> = (0..12).map(|i| format!("COL{}", i)).collect();
        let values: Vec<String> = (0..12).map(|i| format!("v{}", i)).collect();
        let content = format!("{}\n{}\n", headers.join("\t"), values.join("\t"));
        let parsed = parse_data_file(&content).unwrap();
        assert_eq!(parsed.delimiter, Delimiter::Tab);
        assert_eq!(parsed.headers.len(), 12);
        assert_eq!(parsed.records[0].get("COL11"), Some("v11"));
    }
}
