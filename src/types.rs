use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the vendor data file, keyed by column header
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDataRecord {
    /// 1-based data row number (the header is row 0)
    pub row_number: usize,
    pub values: BTreeMap<String, String>,
}

impl RawDataRecord {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            values: BTreeMap::new(),
        }
    }

    /// Build a record from `(column, value)` pairs; values are trimmed
    pub fn from_pairs<I, K, V>(row_number: usize, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.as_ref().trim().to_string()))
            .collect();
        Self { row_number, values }
    }

    /// Trimmed value of a column, `None` when the column is absent
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(|v| v.as_str())
    }

    /// Trimmed value of a column, `None` when absent or blank
    pub fn non_empty(&self, column: &str) -> Option<&str> {
        self.get(column).filter(|v| !v.is_empty())
    }

    /// Value of a column, empty string when absent
    pub fn get_or_empty(&self, column: &str) -> String {
        self.get(column).unwrap_or_default().to_string()
    }
}

/// A successful dictionary lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeMatch {
    /// The code as written in the dictionary
    pub code: String,
    pub description: String,
    pub category: String,
    /// Human-readable category name, or the raw key when unmapped
    pub category_name: String,
}

/// A coded characteristic after resolution; `description` is `None` on a miss
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodedValue {
    pub code: String,
    pub description: Option<String>,
}

impl CodedValue {
    pub fn is_resolved(&self) -> bool {
        self.description.is_some()
    }
}
