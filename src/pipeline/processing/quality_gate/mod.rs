//! Pre-flight checks run before a caller commits to normalizing a full file:
//! a lookup sample over the first few data rows, and a check that the loaded
//! dictionary is usable at all.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::constants::{Characteristic, SMOKE_TEST_FIELDS};
use crate::error::{BrtError, Result};
use crate::pipeline::processing::codes::CodeLookupTable;
use crate::pipeline::processing::normalize::BrtNormalizer;
use crate::types::RawDataRecord;

/// Lookup outcome for one smoke-test field of one sampled row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleLookup {
    pub field: Characteristic,
    pub column: String,
    pub raw_value: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    pub row_number: usize,
    pub block: String,
    pub lot: String,
    pub qualifier: String,
    pub lookups: Vec<SampleLookup>,
}

impl SampleRow {
    pub fn resolved(&self) -> usize {
        self.lookups.iter().filter(|l| l.description.is_some()).count()
    }

    /// Lookups that had a value to resolve
    pub fn attempted(&self) -> usize {
        self.lookups.iter().filter(|l| !l.raw_value.is_empty()).count()
    }
}

/// Dictionary coverage observed over the sampled rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleDiagnostics {
    pub rows: Vec<SampleRow>,
    pub lookups_attempted: usize,
    pub lookups_resolved: usize,
}

impl SampleDiagnostics {
    /// Share of attempted lookups that resolved; `None` when nothing was attempted
    pub fn coverage(&self) -> Option<f64> {
        (self.lookups_attempted > 0)
            .then(|| self.lookups_resolved as f64 / self.lookups_attempted as f64)
    }
}

/// Exercise the smoke-test fields of the first `sample_rows` records
pub fn sample_lookups(
    table: &CodeLookupTable,
    records: &[RawDataRecord],
    sample_rows: usize,
) -> SampleDiagnostics {
    let normalizer = BrtNormalizer::new(table);

    let rows: Vec<SampleRow> = records
        .iter()
        .take(sample_rows)
        .map(|record| SampleRow {
            row_number: record.row_number,
            block: record.get_or_empty(crate::constants::BLOCK_COLUMN),
            lot: record.get_or_empty(crate::constants::LOT_COLUMN),
            qualifier: record.get_or_empty(crate::constants::QUALIFIER_COLUMN),
            lookups: SMOKE_TEST_FIELDS
                .iter()
                .map(|&field| {
                    let raw_value = record.get_or_empty(field.column());
                    let description = normalizer
                        .lookup(field.category(), &raw_value)
                        .map(|found| found.description);
                    SampleLookup {
                        field,
                        column: field.column().to_string(),
                        raw_value,
                        description,
                    }
                })
                .collect(),
        })
        .collect();

    let lookups_attempted = rows.iter().map(SampleRow::attempted).sum();
    let lookups_resolved = rows.iter().map(SampleRow::resolved).sum();
    let diagnostics = SampleDiagnostics {
        rows,
        lookups_attempted,
        lookups_resolved,
    };

    match diagnostics.coverage() {
        Some(coverage) if coverage < 0.5 => warn!(
            "Sample lookups resolved {}/{}; the code file may not match this data file",
            lookups_resolved, lookups_attempted
        ),
        Some(_) => info!("Sample lookups resolved {}/{}", lookups_resolved, lookups_attempted),
        None => warn!("Sampled rows carried no values for the smoke-test fields"),
    }
    diagnostics
}

/// Whether the loaded dictionary can support normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryValidation {
    pub total_codes: usize,
    pub categories_found: usize,
    /// Known categories with no rows; partial coverage is reported, not rejected
    pub empty_categories: Vec<String>,
}

pub fn validate_dictionary(table: &CodeLookupTable) -> Result<DictionaryValidation> {
    if table.is_empty() {
        return Err(BrtError::EmptyDictionary);
    }
    let empty_categories: Vec<String> = crate::constants::category_keys()
        .filter(|category| table.category_len(category) == 0)
        .map(str::to_string)
        .collect();
    if !empty_categories.is_empty() {
        info!("Dictionary has no codes for categories {:?}", empty_categories);
    }
    Ok(DictionaryValidation {
        total_codes: table.len(),
        categories_found: table.category_count(),
        empty_categories,
    })
}
