use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Delimiter;
use crate::constants::DATA_FILE_SIGNATURE;

/// What kind of BRT file some content looks like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrtFileKind {
    DataFile,
    CodeFile,
    Unknown,
}

/// Tab when the header has more than 10 tabs and over twice as many tabs as commas
pub fn detect_delimiter(header_line: &str) -> Delimiter {
    let commas = header_line.matches(',').count();
    let tabs = header_line.matches('\t').count();

    if tabs > 10 && tabs > commas * 2 {
        debug!("Detected TAB-SEPARATED file: {} tabs vs {} commas", tabs, commas);
        Delimiter::Tab
    } else {
        debug!("Detected COMMA-SEPARATED file: {} commas vs {} tabs", commas, tabs);
        Delimiter::Comma
    }
}

/// Classify file content as a BRT data file (header carries the BRT signature
/// columns, comma or tab separated), a BRT code file (a marker line followed by
/// a JSON line), or neither.
pub fn detect_file_type(content: &str, residential_marker: &str) -> BrtFileKind {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let Some(first) = lines.first() else {
        return BrtFileKind::Unknown;
    };

    if has_data_signature(first, ',') || has_data_signature(first, '\t') {
        return BrtFileKind::DataFile;
    }

    let is_code_file = lines
        .windows(2)
        .any(|pair| pair[0].contains(residential_marker) && pair[1].starts_with('{'));
    if is_code_file {
        return BrtFileKind::CodeFile;
    }

    BrtFileKind::Unknown
}

fn has_data_signature(header_line: &str, separator: char) -> bool {
    let headers: Vec<&str> = header_line
        .split(separator)
        .map(|h| h.trim().trim_matches('"').trim_start_matches('\u{feff}'))
        .collect();
    DATA_FILE_SIGNATURE.iter().all(|required| headers.contains(required))
}
