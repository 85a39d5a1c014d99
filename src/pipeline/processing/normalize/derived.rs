//! Numeric and date values derived from raw BRT columns.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::RawDataRecord;

const SQUARE_FEET_PER_ACRE: f64 = 43_560.0;

/// BRT repeats land columns as `<PREFIX>_1` through `<PREFIX>_6`
const LAND_LINES: std::ops::RangeInclusive<usize> = 1..=6;

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)").expect("valid number regex"));

static LEADING_INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+").expect("valid integer regex"));

/// Two-digit years first: `%Y` would also accept "21" as the year 21
const DATE_FORMATS: [&str; 4] = ["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d"];

/// Values computed from the raw row; `None` when the inputs are absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedValues {
    pub total_baths: Option<f64>,
    pub lot_frontage: Option<f64>,
    pub lot_depth: Option<f64>,
    pub lot_acres: Option<f64>,
    pub lot_sf: Option<i64>,
    pub year_built: Option<i64>,
    pub sale_date: Option<NaiveDate>,
    pub sale_price: Option<f64>,
    pub owner_csz: Option<String>,
    /// Total square feet of living area
    pub sfla: Option<f64>,
    pub list_date: Option<NaiveDate>,
    pub measure_date: Option<NaiveDate>,
    pub price_date: Option<NaiveDate>,
    pub cama: CamaValues,
}

/// Valuation figures computed by the vendor's CAMA engine, alongside the
/// taxable values carried as text in `Valuation`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CamaValues {
    pub land: Option<f64>,
    pub improvement: Option<f64>,
    pub total: Option<f64>,
    pub base_replacement_cost: Option<f64>,
    pub detached_items: Option<f64>,
    pub replacement_cost_new: Option<f64>,
}

impl CamaValues {
    pub fn from_raw(raw: &RawDataRecord) -> Self {
        Self {
            land: numeric(raw, "TOTALLANDVALUE"),
            improvement: numeric(raw, "TOTALIMPROVVALUE"),
            total: numeric(raw, "TOTNETVALUE"),
            base_replacement_cost: numeric(raw, "BASEREPLCOST"),
            detached_items: numeric(raw, "DETACHEDITEMS"),
            replacement_cost_new: numeric(raw, "REPLCOSTNEW"),
        }
    }
}

impl DerivedValues {
    pub fn from_raw(raw: &RawDataRecord) -> Self {
        let lot_acres = lot_acres(raw);
        Self {
            total_baths: total_baths(raw),
            lot_frontage: lot_frontage(raw),
            lot_depth: lot_depth(raw),
            lot_acres,
            lot_sf: lot_acres.map(|acres| (acres * SQUARE_FEET_PER_ACRE).round() as i64),
            year_built: raw.get("YEARBUILT").and_then(parse_integer),
            sale_date: date(raw, "CURRENTSALE_DATE"),
            sale_price: raw.get("CURRENTSALE_PRICE").and_then(parse_numeric),
            owner_csz: owner_csz(raw),
            sfla: numeric(raw, "SFLA_TOTAL"),
            list_date: date(raw, "LISTDT"),
            measure_date: date(raw, "MEASUREDT"),
            price_date: date(raw, "PRICEDT"),
            cama: CamaValues::from_raw(raw),
        }
    }
}

/// Leading number of a value after stripping `,` and `$`; `"1.25AC"` reads as 1.25
pub fn parse_numeric(value: &str) -> Option<f64> {
    let cleaned: String = value.trim().chars().filter(|c| *c != ',' && *c != '$').collect();
    LEADING_NUMBER.find(&cleaned)?.as_str().parse().ok()
}

pub fn parse_integer(value: &str) -> Option<i64> {
    LEADING_INTEGER.find(value.trim())?.as_str().parse().ok()
}

/// Date part of a vendor date, in any of the formats BRT exports emit
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let date_part = value.trim().split(|c: char| c.is_whitespace() || c == 'T').next()?;
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn numeric(raw: &RawDataRecord, column: &str) -> Option<f64> {
    raw.get(column).and_then(parse_numeric)
}

fn date(raw: &RawDataRecord, column: &str) -> Option<NaiveDate> {
    raw.get(column).and_then(parse_date)
}

/// BRT's BATHTOT counts half baths as full ones
fn total_baths(raw: &RawDataRecord) -> Option<f64> {
    let bath_total = numeric(raw, "BATHTOT").unwrap_or(0.0);
    let two_fixture = numeric(raw, "PLUMBING2FIX").unwrap_or(0.0);
    let adjusted = bath_total - two_fixture * 0.5;
    (adjusted > 0.0).then_some(adjusted)
}

fn land_values(raw: &RawDataRecord, prefix: &str) -> Vec<f64> {
    LAND_LINES
        .filter_map(|i| numeric(raw, &format!("{}_{}", prefix, i)))
        .filter(|v| *v != 0.0)
        .collect()
}

fn lot_frontage(raw: &RawDataRecord) -> Option<f64> {
    let values = land_values(raw, "LANDFF");
    (!values.is_empty()).then(|| values.iter().sum())
}

fn lot_depth(raw: &RawDataRecord) -> Option<f64> {
    let depths = land_values(raw, "LANDAVGDEP");
    if depths.is_empty() {
        return None;
    }
    Some(round_to(depths.iter().sum::<f64>() / depths.len() as f64, 2))
}

/// Sum of `LANDUR_n` units tagged `AC`; failing that, `SF` units converted to acres
fn lot_acres(raw: &RawDataRecord) -> Option<f64> {
    let tagged_sum = |unit: &str| -> f64 {
        LAND_LINES
            .filter_map(|i| raw.non_empty(&format!("LANDUR_{}", i)))
            .filter(|value| value.to_uppercase().contains(unit))
            .filter_map(parse_numeric)
            .sum()
    };

    let mut acres = tagged_sum("AC");
    if acres == 0.0 {
        acres = tagged_sum("SF") / SQUARE_FEET_PER_ACRE;
    }
    (acres > 0.0).then(|| round_to(acres, 3))
}

fn owner_csz(raw: &RawDataRecord) -> Option<String> {
    match (raw.non_empty("OWNER_CITYSTATE"), raw.non_empty("OWNER_ZIP")) {
        (None, None) => None,
        (Some(city), None) => Some(city.to_string()),
        (None, Some(zip)) => Some(zip.to_string()),
        (Some(city), Some(zip)) => Some(format!("{} {}", city, zip)),
    }
}
