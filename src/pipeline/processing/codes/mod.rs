//! Code dictionary: the `(category, code) -> description` table built from a BRT
//! code file, plus the exact and canonical code forms used by loading and lookup.

pub mod loader;
pub mod search;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::warn;

use crate::constants;
use crate::types::CodeMatch;

pub use loader::{CodeFileLoader, CodeFileSummary};
pub use search::{CategoryMatch, CategorySearch, SearchStrategy};

/// "2 - CONC PATIO" style values: a code token, a spaced dash, then a label
static CODE_WITH_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z0-9]+)(?:\s+-\s*|\s*-\s+)\S.*$").expect("valid code label regex")
});

/// Exact dictionary key of a vendor code: trimmed and uppercased.
/// Returns `None` for blank input.
pub fn exact_code(raw: &str) -> Option<String> {
    let upper = raw.trim().to_uppercase();
    (!upper.is_empty()).then_some(upper)
}

/// Canonical form of a vendor code, the fallback key when no exact key matches.
/// Returns `None` for blank input.
///
/// Trims and uppercases, reduces `"<code> - <label>"` to `<code>`, and drops
/// leading zeros from purely numeric codes so `"02"` and `"2"` meet.
pub fn canonical_code(raw: &str) -> Option<String> {
    let upper = exact_code(raw)?;
    let token = match CODE_WITH_LABEL.captures(&upper) {
        Some(caps) => caps[1].to_string(),
        None => upper,
    };

    if token.chars().all(|c| c.is_ascii_digit()) {
        let stripped = token.trim_start_matches('0');
        return Some(if stripped.is_empty() { "0".to_string() } else { stripped.to_string() });
    }
    Some(token)
}

/// Display form of a dictionary key, `category_code`
pub fn composite_key(category: &str, code: &str) -> String {
    format!("{}_{}", category, code)
}

/// One dictionary row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeEntry {
    /// The code as written in the code file (trimmed)
    pub code: String,
    pub description: String,
}

/// Codes of one category: rows keyed by exact code, plus a canonical index
/// that points at the first exact key sharing each canonical form.
#[derive(Debug, Clone, Default)]
struct CategoryCodes {
    rows: HashMap<String, CodeEntry>,
    canonical: HashMap<String, String>,
}

/// Two-level lookup table: category key -> code -> entry.
/// Populated by the loader, read-only afterward.
#[derive(Debug, Clone, Default)]
pub struct CodeLookupTable {
    categories: HashMap<String, CategoryCodes>,
}

impl CodeLookupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row. Returns `true` when it created a new key; blank codes are ignored
    /// and a repeated code overwrites the earlier description.
    pub fn insert(&mut self, category: &str, code: &str, description: &str) -> bool {
        let (Some(exact), Some(canonical)) = (exact_code(code), canonical_code(code)) else {
            return false;
        };
        let codes = self.categories.entry(category.to_string()).or_default();

        match codes.canonical.entry(canonical) {
            Entry::Occupied(first) => {
                if *first.get() != exact {
                    warn!(
                        category,
                        code = %exact,
                        "Codes share canonical form '{}'; fallback lookups resolve to '{}'",
                        first.key(),
                        first.get()
                    );
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(exact.clone());
            }
        }

        let entry = CodeEntry {
            code: code.trim().to_string(),
            description: description.to_string(),
        };
        codes.rows.insert(exact, entry).is_none()
    }

    /// Exact key first, then the label-stripped token, then the canonical form
    pub fn get(&self, category: &str, raw_value: &str) -> Option<&CodeEntry> {
        let codes = self.categories.get(category)?;
        let exact = exact_code(raw_value)?;
        if let Some(entry) = codes.rows.get(&exact) {
            return Some(entry);
        }
        if let Some(caps) = CODE_WITH_LABEL.captures(&exact) {
            if let Some(entry) = codes.rows.get(&caps[1]) {
                return Some(entry);
            }
        }
        let first = codes.canonical.get(&canonical_code(raw_value)?)?;
        codes.rows.get(first)
    }

    /// Resolve a raw value; blank values and unknown codes are `None`, never errors
    pub fn lookup(&self, category: &str, raw_value: &str) -> Option<CodeMatch> {
        self.get(category, raw_value).map(|entry| CodeMatch {
            code: entry.code.clone(),
            description: entry.description.clone(),
            category: category.to_string(),
            category_name: constants::category_name(category)
                .unwrap_or(category)
                .to_string(),
        })
    }

    /// Total number of rows across all categories
    pub fn len(&self) -> usize {
        self.categories.values().map(|codes| codes.rows.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of categories holding at least one row
    pub fn category_count(&self) -> usize {
        self.categories.values().filter(|codes| !codes.rows.is_empty()).count()
    }

    pub fn category_len(&self, category: &str) -> usize {
        self.categories.get(category).map_or(0, |codes| codes.rows.len())
    }

    /// Rows of one category sorted by code
    pub fn entries(&self, category: &str) -> Vec<&CodeEntry> {
        let mut entries: Vec<&CodeEntry> = self
            .categories
            .get(category)
            .map(|codes| codes.rows.values().collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| a.code.cmp(&b.code));
        entries
    }

    /// Category keys present in the table, sorted
    pub fn categories(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .categories
            .iter()
            .filter(|(_, codes)| !codes.rows.is_empty())
            .map(|(k, _)| k.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }

    pub fn clear(&mut self) {
        self.categories.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_code_trims_and_uppercases() {
        assert_eq!(canonical_code(" ab "), Some("AB".to_string()));
        assert_eq!(canonical_code("AB"), Some("AB".to_string()));
    }

    #[test]
    fn test_canonical_code_blank_is_none() {
        assert_eq!(canonical_code(""), None);
        assert_eq!(canonical_code("   \t"), None);
    }

    #[test]
    fn test_canonical_code_numeric_padding() {
        assert_eq!(canonical_code("02"), Some("2".to_string()));
        assert_eq!(canonical_code("012"), Some("12".to_string()));
        assert_eq!(canonical_code("00"), Some("0".to_string()));
        assert_eq!(canonical_code("0A"), Some("0A".to_string()));
    }

    #[test]
    fn test_canonical_code_strips_label() {
        assert_eq!(canonical_code("2 - CONC PATIO"), Some("2".to_string()));
        assert_eq!(canonical_code("02 -  Conc Patio"), Some("2".to_string()));
        // hyphenated codes without spacing are left alone
        assert_eq!(canonical_code("A-1"), Some("A-1".to_string()));
    }

    #[test]
    fn test_lookup_hit_and_miss() {
        let mut table = CodeLookupTable::new();
        assert!(table.insert("27", "12", "Concrete"));

        let hit = table.lookup("27", "12").unwrap();
        assert_eq!(hit.code, "12");
        assert_eq!(hit.description, "Concrete");
        assert_eq!(hit.category_name, "Foundation");

        assert_eq!(table.lookup("27", "012").unwrap().description, "Concrete");
        assert!(table.lookup("27", "AB").is_none());
        assert!(table.lookup("28", "12").is_none());
        assert!(table.lookup("27", "  ").is_none());
    }

    #[test]
    fn test_lookup_is_case_and_whitespace_insensitive() {
        let mut table = CodeLookupTable::new();
        table.insert("21", "AB", "Two family");
        assert_eq!(table.lookup("21", "ab"), table.lookup("21", " AB "));
        assert!(table.lookup("21", "ab").is_some());
    }

    #[test]
    fn test_unmapped_category_falls_back_to_key() {
        let mut table = CodeLookupTable::new();
        table.insert("99", "1", "Other");
        assert_eq!(table.lookup("99", "1").unwrap().category_name, "99");
    }

    #[test]
    fn test_counts() {
        let mut table = CodeLookupTable::new();
        table.insert("21", "1", "Single family");
        table.insert("21", "2", "Two family");
        assert!(!table.insert("21", "2 ", "Two family (dup)"));
        assert!(!table.insert("53", " ", "Blank"));
        table.insert("53", "6", "Owner");

        assert_eq!(table.len(), 3);
        assert_eq!(table.category_count(), 2);
        assert_eq!(table.category_len("21"), 2);
        assert_eq!(table.categories(), vec!["21", "53"]);
        assert_eq!(table.lookup("21", "2").unwrap().description, "Two family (dup)");
        assert_eq!(composite_key("21", "2"), "21_2");
    }

    #[test]
    fn test_padded_and_unpadded_codes_are_distinct_rows() {
        let mut table = CodeLookupTable::new();
        assert!(table.insert("VCS", "01", "North"));
        assert!(table.insert("VCS", "1", "South"));

        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("VCS", "01").unwrap().description, "North");
        assert_eq!(table.lookup("VCS", "1").unwrap().description, "South");
        // no exact key: the first code inserted under the canonical form wins
        assert_eq!(table.lookup("VCS", "001").unwrap().description, "North");
        assert_eq!(table.lookup("VCS", "1 - SOUTH SIDE").unwrap().description, "South");
    }

    #[test]
    fn test_labelled_value_falls_back_to_canonical() {
        let mut table = CodeLookupTable::new();
        table.insert("23", "02", "Cape Cod");
        assert_eq!(table.lookup("23", "2 - CAPE").unwrap().code, "02");
        assert_eq!(exact_code("  ab "), Some("AB".to_string()));
        assert_eq!(exact_code(" "), None);
    }
}
