pub mod derived;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{self, Characteristic, CHARACTERISTIC_FIELDS};
use crate::observability::metrics;
use crate::pipeline::processing::codes::CodeLookupTable;
use crate::types::{CodeMatch, CodedValue, RawDataRecord};

pub use derived::{CamaValues, DerivedValues};

/// A vendor-neutral property record built from one raw BRT row.
/// Every characteristic is present even when its lookup missed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub block: String,
    pub lot: String,
    pub qualifier: String,
    pub card: Option<String>,
    pub property_location: Option<String>,
    pub characteristics: Characteristics,
    /// Valuation columns passed through as found in the raw row
    pub values: Valuation,
    pub derived: DerivedValues,
    pub vendor: String,
    pub normalized_at: DateTime<Utc>,
    pub raw: RawDataRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub land: String,
    pub improvement: String,
    pub total: String,
}

/// Resolved coded characteristics, one field per dictionary category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Characteristics {
    pub type_use: CodedValue,
    pub story_height: CodedValue,
    pub design: CodedValue,
    pub roof_type: CodedValue,
    pub roof_material: CodedValue,
    pub exterior_finish: CodedValue,
    pub foundation: CodedValue,
    pub interior_wall: CodedValue,
    pub basement: CodedValue,
    pub heat_source: CodedValue,
    pub heat_system: CodedValue,
    pub air_conditioning: CodedValue,
    pub info_by: CodedValue,
    pub neighborhood: CodedValue,
    pub exterior_condition: CodedValue,
    pub interior_condition: CodedValue,
}

impl Characteristics {
    pub fn get(&self, field: Characteristic) -> &CodedValue {
        match field {
            Characteristic::TypeUse => &self.type_use,
            Characteristic::StoryHeight => &self.story_height,
            Characteristic::Design => &self.design,
            Characteristic::RoofType => &self.roof_type,
            Characteristic::RoofMaterial => &self.roof_material,
            Characteristic::ExteriorFinish => &self.exterior_finish,
            Characteristic::Foundation => &self.foundation,
            Characteristic::InteriorWall => &self.interior_wall,
            Characteristic::Basement => &self.basement,
            Characteristic::HeatSource => &self.heat_source,
            Characteristic::HeatSystem => &self.heat_system,
            Characteristic::AirConditioning => &self.air_conditioning,
            Characteristic::InfoBy => &self.info_by,
            Characteristic::Neighborhood => &self.neighborhood,
            Characteristic::ExteriorCondition => &self.exterior_condition,
            Characteristic::InteriorCondition => &self.interior_condition,
        }
    }

    fn get_mut(&mut self, field: Characteristic) -> &mut CodedValue {
        match field {
            Characteristic::TypeUse => &mut self.type_use,
            Characteristic::StoryHeight => &mut self.story_height,
            Characteristic::Design => &mut self.design,
            Characteristic::RoofType => &mut self.roof_type,
            Characteristic::RoofMaterial => &mut self.roof_material,
            Characteristic::ExteriorFinish => &mut self.exterior_finish,
            Characteristic::Foundation => &mut self.foundation,
            Characteristic::InteriorWall => &mut self.interior_wall,
            Characteristic::Basement => &mut self.basement,
            Characteristic::HeatSource => &mut self.heat_source,
            Characteristic::HeatSystem => &mut self.heat_system,
            Characteristic::AirConditioning => &mut self.air_conditioning,
            Characteristic::InfoBy => &mut self.info_by,
            Characteristic::Neighborhood => &mut self.neighborhood,
            Characteristic::ExteriorCondition => &mut self.exterior_condition,
            Characteristic::InteriorCondition => &mut self.interior_condition,
        }
    }

    /// All characteristics in dictionary category order
    pub fn iter(&self) -> impl Iterator<Item = (Characteristic, &CodedValue)> {
        CHARACTERISTIC_FIELDS.iter().map(move |f| (f.field, self.get(f.field)))
    }

    /// Number of characteristics that resolved to a description
    pub fn resolved_count(&self) -> usize {
        self.iter().filter(|(_, value)| value.is_resolved()).count()
    }
}

impl NormalizedRecord {
    /// Job-scoped key: `{year}{ccdd}-{block}-{lot}_{qualifier}-{card}-{location}`,
    /// with `NONE` standing in for absent parts
    pub fn composite_key(&self, year: i32, ccdd: &str) -> String {
        let or_none = |value: Option<&str>| -> String {
            value.filter(|v| !v.is_empty()).unwrap_or("NONE").to_string()
        };
        format!(
            "{}{}-{}-{}_{}-{}-{}",
            year,
            ccdd,
            self.block,
            self.lot,
            or_none(Some(self.qualifier.as_str())),
            or_none(self.card.as_deref()),
            or_none(self.property_location.as_deref()),
        )
    }
}

/// Trait for turning raw vendor rows into normalized records
pub trait Normalizer {
    fn normalize(&self, record: &RawDataRecord) -> NormalizedRecord;

    fn vendor(&self) -> &str;
}

/// Normalizer for BRT rows, resolving codes against a loaded dictionary
pub struct BrtNormalizer<'a> {
    table: &'a CodeLookupTable,
    vendor: &'a str,
}

impl<'a> BrtNormalizer<'a> {
    pub fn new(table: &'a CodeLookupTable) -> Self {
        Self::with_vendor(table, constants::BRT_VENDOR)
    }

    pub fn with_vendor(table: &'a CodeLookupTable, vendor: &'a str) -> Self {
        Self { table, vendor }
    }

    /// Dictionary lookup; blank values and unknown codes are `None`
    pub fn lookup(&self, category: &str, raw_value: &str) -> Option<CodeMatch> {
        if raw_value.trim().is_empty() {
            return None;
        }
        let found = self.table.lookup(category, raw_value);
        metrics::normalize::lookup(category, found.is_some());
        if found.is_none() {
            debug!(category, value = raw_value, "No dictionary entry");
        }
        found
    }

    /// Resolve one characteristic column of a raw row. On a miss the raw value
    /// is kept as the code (empty when the column is absent).
    pub fn resolve(&self, record: &RawDataRecord, field: Characteristic) -> CodedValue {
        let raw_value = record.get(field.column()).unwrap_or_default();
        match self.lookup(field.category(), raw_value) {
            Some(found) => CodedValue {
                code: found.code,
                description: Some(found.description),
            },
            None => CodedValue {
                code: raw_value.to_string(),
                description: None,
            },
        }
    }
}

impl Normalizer for BrtNormalizer<'_> {
    fn normalize(&self, record: &RawDataRecord) -> NormalizedRecord {
        let mut characteristics = Characteristics::default();
        for definition in CHARACTERISTIC_FIELDS.iter() {
            *characteristics.get_mut(definition.field) = self.resolve(record, definition.field);
        }
        metrics::normalize::record_processed();

        NormalizedRecord {
            block: record.get_or_empty(constants::BLOCK_COLUMN),
            lot: record.get_or_empty(constants::LOT_COLUMN),
            qualifier: record.get_or_empty(constants::QUALIFIER_COLUMN),
            card: record.non_empty(constants::CARD_COLUMN).map(str::to_string),
            property_location: record
                .non_empty(constants::PROPERTY_LOCATION_COLUMN)
                .map(str::to_string),
            characteristics,
            values: Valuation {
                land: record.get_or_empty(constants::LAND_VALUE_COLUMN),
                improvement: record.get_or_empty(constants::IMPROVEMENT_VALUE_COLUMN),
                total: record.get_or_empty(constants::TOTAL_VALUE_COLUMN),
            },
            derived: DerivedValues::from_raw(record),
            vendor: self.vendor.to_string(),
            normalized_at: Utc::now(),
            raw: record.clone(),
        }
    }

    fn vendor(&self) -> &str {
        self.vendor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CodeLookupTable {
        let mut table = CodeLookupTable::new();
        table.insert("53", "6", "Owner");
        table.insert("21", "1", "Single Family");
        table.insert("27", "12", "Concrete");
        table.insert("VCS", "A1", "Downtown");
        table
    }

    fn record(pairs: &[(&str, &str)]) -> RawDataRecord {
        RawDataRecord::from_pairs(1, pairs.iter().copied())
    }

    #[test]
    fn test_normalize_resolves_codes() {
        let table = table();
        let normalizer = BrtNormalizer::new(&table);
        let raw = record(&[
            ("BLOCK", "101"),
            ("LOT", "7"),
            ("QUALIFIER", "C01"),
            ("INFOBY", "6"),
            ("TYPEUSE", "01"),
            ("FOUNDATION_1", "12"),
            ("VCS", "a1"),
            ("VALUES_LANDTAXABLEVALUE", "125,000"),
        ]);

        let normalized = normalizer.normalize(&raw);
        assert_eq!(normalized.block, "101");
        assert_eq!(normalized.qualifier, "C01");
        assert_eq!(
            normalized.characteristics.info_by,
            CodedValue { code: "6".to_string(), description: Some("Owner".to_string()) }
        );
        assert_eq!(normalized.characteristics.type_use.code, "1");
        assert_eq!(normalized.characteristics.type_use.description.as_deref(), Some("Single Family"));
        assert_eq!(normalized.characteristics.neighborhood.description.as_deref(), Some("Downtown"));
        assert_eq!(normalized.characteristics.resolved_count(), 4);
        assert_eq!(normalized.values.land, "125,000");
        assert_eq!(normalized.vendor, "BRT");
        assert_eq!(normalized.raw, raw);
    }

    #[test]
    fn test_misses_keep_raw_code() {
        let table = table();
        let normalizer = BrtNormalizer::new(&table);
        let normalized = normalizer.normalize(&record(&[("DESIGN", " CL "), ("INFOBY", "9")]));

        assert_eq!(normalized.characteristics.design, CodedValue { code: "CL".to_string(), description: None });
        assert_eq!(normalized.characteristics.info_by.code, "9");
        assert!(normalized.characteristics.info_by.description.is_none());
    }

    #[test]
    fn test_every_field_present_for_empty_record() {
        let table = table();
        let normalized = BrtNormalizer::new(&table).normalize(&RawDataRecord::new(1));

        assert_eq!(normalized.characteristics.iter().count(), CHARACTERISTIC_FIELDS.len());
        for (_, value) in normalized.characteristics.iter() {
            assert_eq!(value, &CodedValue::default());
        }
        assert_eq!(normalized.block, "");
        assert_eq!(normalized.values, Valuation::default());
        assert!(normalized.card.is_none());
    }

    #[test]
    fn test_serialized_shape_is_complete() {
        let table = CodeLookupTable::new();
        let normalized = BrtNormalizer::new(&table).normalize(&RawDataRecord::new(1));
        let json = serde_json::to_value(&normalized).unwrap();

        let characteristics = json["characteristics"].as_object().unwrap();
        assert_eq!(characteristics.len(), CHARACTERISTIC_FIELDS.len());
        assert!(characteristics["info_by"]["description"].is_null());
        assert_eq!(characteristics["info_by"]["code"], "");
    }

    #[test]
    fn test_lookup_blank_is_none_for_any_category() {
        let table = table();
        let normalizer = BrtNormalizer::new(&table);
        for category in constants::category_keys() {
            assert!(normalizer.lookup(category, "").is_none());
            assert!(normalizer.lookup(category, "   ").is_none());
        }
    }

    #[test]
    fn test_composite_key() {
        let table = table();
        let normalizer = BrtNormalizer::with_vendor(&table, "BRT");
        let with_parts = normalizer.normalize(&record(&[
            ("BLOCK", "101"),
            ("LOT", "7"),
            ("QUALIFIER", "C01"),
            ("CARD", "1"),
            ("PROPERTY_LOCATION", "12 MAIN ST"),
        ]));
        assert_eq!(with_parts.composite_key(2025, "1306"), "20251306-101-7_C01-1-12 MAIN ST");

        let bare = normalizer.normalize(&record(&[("BLOCK", "5"), ("LOT", "2")]));
        assert_eq!(bare.composite_key(2025, "1306"), "20251306-5-2_NONE-NONE-NONE");
        assert_eq!(normalizer.vendor(), "BRT");
    }
}
