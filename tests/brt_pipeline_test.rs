use anyhow::Result;
use serde_json::json;
use std::io::Write;

use brt_pipeline::config::Config;
use brt_pipeline::pipeline::codes::SearchStrategy;
use brt_pipeline::pipeline::parser::{BrtFileKind, Delimiter};
use brt_pipeline::{BrtError, BrtProcessor, RawDataRecord, Stage};

const CODE_FILE: &str = include_str!("fixtures/brt_codes.txt");
const DATA_FILE: &str = include_str!("fixtures/brt_data.csv");

fn loaded_processor() -> Result<BrtProcessor> {
    let mut processor = BrtProcessor::new();
    processor.process_code_file(CODE_FILE)?;
    Ok(processor)
}

#[test]
fn test_code_file_tolerates_nested_layouts() -> Result<()> {
    let mut processor = BrtProcessor::new();
    let summary = processor.process_code_file(CODE_FILE)?;

    assert_eq!(summary.codes_extracted, 9);
    assert_eq!(summary.categories_found, 5);
    assert_eq!(summary.strategies.get("21"), Some(&SearchStrategy::DirectKey));
    assert_eq!(summary.strategies.get("23"), Some(&SearchStrategy::MapWrapped));
    assert_eq!(summary.strategies.get("27"), Some(&SearchStrategy::NumberedWrapper));
    assert_eq!(summary.strategies.get("53"), Some(&SearchStrategy::NumberedWrapper));
    assert_eq!(summary.strategies.get("VCS"), Some(&SearchStrategy::DirectKey));

    // Commercial section codes never leak into the residential dictionary
    assert!(processor.lookup_code("21", "9").is_none());
    Ok(())
}

#[test]
fn test_info_by_resolves_end_to_end() -> Result<()> {
    let processor = loaded_processor()?;
    let record = RawDataRecord::from_pairs(1, [("INFOBY", "6")]);

    let normalized = processor.normalize_record(&record);
    let info_by = serde_json::to_value(&normalized.characteristics.info_by)?;
    assert_eq!(info_by, json!({ "code": "6", "description": "Owner" }));
    Ok(())
}

#[test]
fn test_lookup_is_case_and_whitespace_insensitive() -> Result<()> {
    let processor = loaded_processor()?;

    assert_eq!(processor.lookup_code("23", "ra"), processor.lookup_code("23", " RA "));
    assert_eq!(processor.lookup_code("21", "2"), processor.lookup_code("21", "02"));
    assert_eq!(processor.lookup_code("27", "12").map(|m| m.description), Some("Concrete".to_string()));
    assert!(processor.lookup_code("27", "AB").is_none());
    for blank in ["", "   ", "\t"] {
        assert!(processor.lookup_code("53", blank).is_none());
    }
    Ok(())
}

#[test]
fn test_header_only_data_file_fails() -> Result<()> {
    let processor = loaded_processor()?;
    let err = processor
        .process_data_file("BLOCK,LOT,QUALIFIER,BATHTOT\n\n")
        .unwrap_err();
    assert!(matches!(err, BrtError::NoDataRows { .. }));
    assert!(err.to_string().contains("no data rows"));
    Ok(())
}

#[test]
fn test_empty_data_file_fails_at_data_stage() {
    let mut processor = BrtProcessor::new();
    let report = processor.process_brt_files("BLOCK,LOT,QUALIFIER\n", CODE_FILE);

    assert!(!report.success);
    assert_eq!(report.failed_stage, Some(Stage::DataFile));
    assert!(report.error.unwrap_or_default().contains("no data rows"));
    assert!(report.code_file.is_some());
    assert!(report.validation.is_none());
}

#[test]
fn test_full_run_reports_every_stage() -> Result<()> {
    let mut processor = BrtProcessor::new();
    let report = processor.process_brt_files(DATA_FILE, CODE_FILE);

    assert!(report.success, "run failed: {:?}", report.error);
    assert!(report.failed_stage.is_none());

    let data = report.data_file.expect("data stage output");
    assert_eq!(data.total_records, 3);
    assert_eq!(data.column_count, 16);
    assert_eq!(data.skipped_rows, 1);
    assert_eq!(data.delimiter, Delimiter::Comma);
    assert_eq!(data.sample.rows.len(), 3);
    assert_eq!(data.sample.lookups_attempted, 15);
    assert_eq!(data.sample.lookups_resolved, 11);

    let validation = report.validation.expect("validation output");
    assert_eq!(validation.total_codes, 9);
    Ok(())
}

#[test]
fn test_normalize_all() -> Result<()> {
    let processor = loaded_processor()?;
    let records = processor.normalize_all(DATA_FILE)?;
    assert_eq!(records.len(), 3);

    let first = &records[0];
    assert_eq!(first.characteristics.type_use.description.as_deref(), Some("Single Family"));
    assert_eq!(first.characteristics.design.description.as_deref(), Some("Colonial"));
    assert_eq!(first.characteristics.foundation.description.as_deref(), Some("Concrete"));
    assert_eq!(first.characteristics.neighborhood.description.as_deref(), Some("Downtown"));
    assert_eq!(first.derived.total_baths, Some(1.5));
    assert_eq!(first.derived.year_built, Some(1954));
    assert_eq!(first.values.land, "125,000");
    assert_eq!(first.composite_key(2025, "1306"), "20251306-101-7_NONE-1-12 MAIN ST");

    let second = &records[1];
    assert_eq!(second.property_location.as_deref(), Some("14 MAIN ST, UNIT 2"));
    assert_eq!(second.characteristics.info_by.description.as_deref(), Some("Tenant"));

    let third = &records[2];
    assert_eq!(third.characteristics.design.code, "ZZ");
    assert!(third.characteristics.design.description.is_none());
    Ok(())
}

#[test]
fn test_tab_delimited_data_file() -> Result<()> {
    let processor = loaded_processor()?;
    let headers = "BLOCK\tLOT\tQUALIFIER\tCARD\tPROPERTY_LOCATION\tTYPEUSE\tDESIGN\tFOUNDATION_1\tINFOBY\tVCS\tBATHTOT\tYEARBUILT";
    let row = "5\t2\t\t1\t1 OAK ST\t1\tCL\t12\t6\tA1\t1\t1920";
    let summary = processor.process_data_file(&format!("{}\n{}\n", headers, row))?;

    assert_eq!(summary.delimiter, Delimiter::Tab);
    assert_eq!(summary.total_records, 1);
    assert_eq!(summary.sample.lookups_resolved, 5);
    Ok(())
}

#[test]
fn test_detect_file_types() -> Result<()> {
    let processor = BrtProcessor::new();
    assert_eq!(processor.detect_file_type(DATA_FILE), BrtFileKind::DataFile);
    assert_eq!(processor.detect_file_type(CODE_FILE), BrtFileKind::CodeFile);
    assert_eq!(processor.detect_file_type("name,age\nbob,3\n"), BrtFileKind::Unknown);
    Ok(())
}

#[test]
fn test_config_file_drives_processor() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "[processor]\nresidential_marker = \"RESIDENTIAL CODES\"\nvendor_tag = \"BRT-7\"")?;
    let config = Config::load(Some(file.path()))?;

    let mut processor = BrtProcessor::with_config(config.processor);
    let err = processor.process_code_file(CODE_FILE).unwrap_err();
    assert!(matches!(err, BrtError::MarkerNotFound { .. }));

    let content = format!(
        "RESIDENTIAL CODES\n{}\n",
        json!({ "53": { "MAP": { "1": { "KEY": "6", "DATA": { "VALUE": "Owner" } } } } })
    );
    processor.process_code_file(&content)?;
    let normalized = processor.normalize_record(&RawDataRecord::from_pairs(1, [("INFOBY", "6")]));
    assert_eq!(normalized.vendor, "BRT-7");
    assert!(normalized.characteristics.info_by.is_resolved());
    Ok(())
}
