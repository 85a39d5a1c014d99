use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::search::{key_string, scalar_string, CategorySearch, SearchStrategy};
use super::CodeLookupTable;
use crate::config::ProcessorConfig;
use crate::constants;
use crate::error::{BrtError, Result};
use crate::observability::metrics;

/// Outcome of a successful code file load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeFileSummary {
    /// Lookup rows added to the table
    pub codes_extracted: usize,
    /// Categories that contributed at least one row
    pub categories_found: usize,
    /// Rows per category key, for every category that was located
    pub category_counts: BTreeMap<String, usize>,
    /// How each located category was found
    pub strategies: BTreeMap<String, SearchStrategy>,
    /// Known categories that contributed no rows
    pub missing_categories: Vec<String>,
    /// 0-based index (among non-blank lines) of the marker line
    pub marker_line: usize,
    /// SHA-256 of the code file content
    pub fingerprint: String,
}

/// Parses the residential section of a BRT code file into a `CodeLookupTable`
#[derive(Debug, Clone)]
pub struct CodeFileLoader {
    marker: String,
    search: CategorySearch,
}

impl Default for CodeFileLoader {
    fn default() -> Self {
        Self::from_config(&ProcessorConfig::default())
    }
}

impl CodeFileLoader {
    pub fn from_config(config: &ProcessorConfig) -> Self {
        Self {
            marker: config.residential_marker.clone(),
            search: CategorySearch::new(config.max_search_depth, config.numbered_wrapper_max),
        }
    }

    /// Load `content` into a fresh table
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub fn load(&self, content: &str) -> Result<(CodeLookupTable, CodeFileSummary)> {
        let start = Instant::now();
        let result = self.load_inner(content);
        metrics::codes::duration(start.elapsed().as_secs_f64());

        match &result {
            Ok((_, summary)) => {
                metrics::codes::load_success(summary.codes_extracted, summary.categories_found);
                info!(
                    codes = summary.codes_extracted,
                    categories = summary.categories_found,
                    "Loaded BRT code dictionary"
                );
            }
            Err(e) => {
                metrics::codes::load_error();
                warn!("BRT code file rejected: {}", e);
            }
        }
        result
    }

    fn load_inner(&self, content: &str) -> Result<(CodeLookupTable, CodeFileSummary)> {
        let (marker_line, data_line) = self.residential_data_line(content)?;
        let root: Value = serde_json::from_str(data_line)?;

        let mut table = CodeLookupTable::new();
        let mut category_counts = BTreeMap::new();
        let mut strategies = BTreeMap::new();
        let mut missing_categories = Vec::new();

        for category in constants::category_keys() {
            let added = match self.search.find(&root, category) {
                Some(found) => {
                    debug!(category, strategy = ?found.strategy, depth = found.depth, "Located category");
                    strategies.insert(category.to_string(), found.strategy);
                    let added = extract_codes(&mut table, category, found.node);
                    category_counts.insert(category.to_string(), added);
                    added
                }
                None => {
                    debug!(category, "Category not present in code file");
                    0
                }
            };
            if added == 0 {
                missing_categories.push(category.to_string());
            }
        }

        let summary = CodeFileSummary {
            codes_extracted: table.len(),
            categories_found: table.category_count(),
            category_counts,
            strategies,
            missing_categories,
            marker_line,
            fingerprint: fingerprint(content),
        };
        Ok((table, summary))
    }

    /// The line after the first marker line, among non-blank lines
    fn residential_data_line<'a>(&self, content: &'a str) -> Result<(usize, &'a str)> {
        let lines: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        let marker_line = lines
            .iter()
            .position(|line| line.contains(self.marker.as_str()))
            .ok_or_else(|| BrtError::MarkerNotFound { marker: self.marker.clone() })?;

        let data_line = lines
            .get(marker_line + 1)
            .ok_or_else(|| BrtError::MissingDataLine { marker: self.marker.clone() })?;

        Ok((marker_line, data_line))
    }
}

/// Adds every complete `{KEY, DATA.VALUE}` entry under the node's `MAP`;
/// a blank `DATA.VALUE` counts as incomplete.
/// Returns the number of new rows.
fn extract_codes(table: &mut CodeLookupTable, category: &str, node: &Value) -> usize {
    let entries: Vec<&Value> = match node.get("MAP") {
        Some(Value::Object(map)) => map.values().collect(),
        Some(Value::Array(items)) => items.iter().collect(),
        _ => Vec::new(),
    };

    let mut added = 0;
    for entry in entries {
        let Some(code) = key_string(entry) else { continue };
        let Some(description) = entry
            .get("DATA")
            .and_then(|data| data.get("VALUE"))
            .and_then(scalar_string)
            .filter(|description| !description.is_empty())
        else {
            continue;
        };
        if table.insert(category, &code, &description) {
            added += 1;
        }
    }
    added
}

fn fingerprint(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
