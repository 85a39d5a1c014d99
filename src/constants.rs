//! Vendor category keys, their human-readable names and the CSV columns that carry them.
//! This table is the single source of truth for both the category mapping and the
//! field-to-column mapping; the normalizer reads columns through it.

/// Literal vendor tag attached to every normalized record
pub const BRT_VENDOR: &str = "BRT";

/// Identification and valuation columns of the BRT export
pub const BLOCK_COLUMN: &str = "BLOCK";
pub const LOT_COLUMN: &str = "LOT";
pub const QUALIFIER_COLUMN: &str = "QUALIFIER";
pub const CARD_COLUMN: &str = "CARD";
pub const PROPERTY_LOCATION_COLUMN: &str = "PROPERTY_LOCATION";
pub const LAND_VALUE_COLUMN: &str = "VALUES_LANDTAXABLEVALUE";
pub const IMPROVEMENT_VALUE_COLUMN: &str = "VALUES_IMPROVTAXABLEVALUE";
pub const TOTAL_VALUE_COLUMN: &str = "VALUES_NETTAXABLEVALUE";

/// Columns whose presence identifies a BRT data file header
pub const DATA_FILE_SIGNATURE: [&str; 4] = [BLOCK_COLUMN, LOT_COLUMN, QUALIFIER_COLUMN, "BATHTOT"];

/// Property characteristic resolved through the code dictionary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Characteristic {
    TypeUse,
    StoryHeight,
    Design,
    RoofType,
    RoofMaterial,
    ExteriorFinish,
    Foundation,
    InteriorWall,
    Basement,
    HeatSource,
    HeatSystem,
    AirConditioning,
    InfoBy,
    Neighborhood,
    ExteriorCondition,
    InteriorCondition,
}

#[derive(Debug, Clone, Copy)]
pub struct CharacteristicField {
    pub field: Characteristic,
    pub category: &'static str,
    pub category_name: &'static str,
    pub column: &'static str,
}

const fn field(
    field: Characteristic,
    category: &'static str,
    category_name: &'static str,
    column: &'static str,
) -> CharacteristicField {
    CharacteristicField { field, category, category_name, column }
}

pub const CHARACTERISTIC_FIELDS: [CharacteristicField; 16] = [
    field(Characteristic::TypeUse, "21", "Type and Use", "TYPEUSE"),
    field(Characteristic::StoryHeight, "22", "Story Height", "STORYHGT"),
    field(Characteristic::Design, "23", "Design", "DESIGN"),
    field(Characteristic::RoofType, "24", "Roof Type", "ROOFTYPE"),
    field(Characteristic::RoofMaterial, "25", "Roof Material", "ROOFMATERIAL"),
    field(Characteristic::ExteriorFinish, "26", "Exterior Finish", "EXTERIORFINISH_1"),
    field(Characteristic::Foundation, "27", "Foundation", "FOUNDATION_1"),
    field(Characteristic::InteriorWall, "28", "Interior Wall", "INTERIORWALL_1"),
    field(Characteristic::Basement, "29", "Basement", "BASEMENT"),
    field(Characteristic::HeatSource, "30", "Heat Source", "HEATSOURCE"),
    field(Characteristic::HeatSystem, "31", "Heat System", "HEATSYSTEM"),
    field(Characteristic::AirConditioning, "32", "Air Conditioning", "AIRCOND"),
    field(Characteristic::InfoBy, "53", "InfoBy", "INFOBY"),
    field(Characteristic::Neighborhood, "VCS", "Neighborhood", "VCS"),
    field(Characteristic::ExteriorCondition, "60", "Exterior Condition", "EXTERIORNC"),
    field(Characteristic::InteriorCondition, "61", "Interior Condition", "INTERIORNC"),
];

/// Fields exercised by the data file pre-flight sample
pub const SMOKE_TEST_FIELDS: [Characteristic; 5] = [
    Characteristic::TypeUse,
    Characteristic::Design,
    Characteristic::Foundation,
    Characteristic::InfoBy,
    Characteristic::Neighborhood,
];

impl Characteristic {
    /// Table entries are declared in enum order
    pub fn definition(self) -> &'static CharacteristicField {
        &CHARACTERISTIC_FIELDS[self as usize]
    }

    pub fn category(self) -> &'static str {
        self.definition().category
    }

    pub fn column(self) -> &'static str {
        self.definition().column
    }
}

/// Every vendor category key the loader searches for
pub fn category_keys() -> impl Iterator<Item = &'static str> {
    CHARACTERISTIC_FIELDS.iter().map(|f| f.category)
}

/// Human-readable name for a vendor category key
pub fn category_name(category: &str) -> Option<&'static str> {
    CHARACTERISTIC_FIELDS
        .iter()
        .find(|f| f.category == category)
        .map(|f| f.category_name)
}

/// CSV column expected for a human-readable category name
pub fn column_for_category_name(name: &str) -> Option<&'static str> {
    CHARACTERISTIC_FIELDS
        .iter()
        .find(|f| f.category_name == name)
        .map(|f| f.column)
}
