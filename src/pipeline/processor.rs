use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, instrument};
use uuid::Uuid;

use crate::config::ProcessorConfig;
use crate::error::Result;
use crate::pipeline::processing::codes::{CodeFileLoader, CodeFileSummary, CodeLookupTable};
use crate::pipeline::processing::normalize::{BrtNormalizer, NormalizedRecord, Normalizer};
use crate::pipeline::processing::parser::{self, BrtFileKind, Delimiter};
use crate::pipeline::processing::quality_gate::{self, DictionaryValidation, SampleDiagnostics};
use crate::types::{CodeMatch, RawDataRecord};

/// Pre-flight result for a data file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFileSummary {
    pub total_records: usize,
    pub column_count: usize,
    pub headers: Vec<String>,
    pub delimiter: Delimiter,
    pub skipped_rows: usize,
    pub sample: SampleDiagnostics,
}

/// Stages of `process_brt_files`, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CodeFile,
    DataFile,
    Validation,
}

/// Combined outcome of a file pair run. Stages after a failure are `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrtRunReport {
    pub session_id: Uuid,
    pub success: bool,
    pub failed_stage: Option<Stage>,
    pub error: Option<String>,
    pub code_file: Option<CodeFileSummary>,
    pub data_file: Option<DataFileSummary>,
    pub validation: Option<DictionaryValidation>,
}

impl BrtRunReport {
    fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            success: false,
            failed_stage: None,
            error: None,
            code_file: None,
            data_file: None,
            validation: None,
        }
    }

    fn fail(mut self, stage: Stage, message: String) -> Self {
        error!(?stage, "BRT processing failed: {}", message);
        self.failed_stage = Some(stage);
        self.error = Some(message);
        self
    }
}

/// One BRT import session. Owns the code dictionary for its lifetime; run
/// concurrent imports on separate instances.
#[derive(Debug, Clone)]
pub struct BrtProcessor {
    config: ProcessorConfig,
    table: CodeLookupTable,
    session_id: Uuid,
}

impl Default for BrtProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl BrtProcessor {
    pub fn new() -> Self {
        Self::with_config(ProcessorConfig::default())
    }

    pub fn with_config(config: ProcessorConfig) -> Self {
        Self {
            config,
            table: CodeLookupTable::new(),
            session_id: Uuid::new_v4(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn table(&self) -> &CodeLookupTable {
        &self.table
    }

    /// Rebuild the dictionary from a code file. On failure the dictionary is left empty.
    #[instrument(skip_all, fields(session = %self.session_id))]
    pub fn process_code_file(&mut self, content: &str) -> Result<CodeFileSummary> {
        self.table.clear();
        let (table, summary) = CodeFileLoader::from_config(&self.config).load(content)?;
        self.table = table;
        Ok(summary)
    }

    pub fn lookup_code(&self, category: &str, raw_value: &str) -> Option<CodeMatch> {
        self.normalizer().lookup(category, raw_value)
    }

    pub fn normalize_record(&self, record: &RawDataRecord) -> NormalizedRecord {
        self.normalizer().normalize(record)
    }

    /// Parse a data file and sample dictionary coverage over its first rows
    #[instrument(skip_all, fields(session = %self.session_id))]
    pub fn process_data_file(&self, content: &str) -> Result<DataFileSummary> {
        let parsed = parser::parse_data_file(content)?;
        let sample = quality_gate::sample_lookups(&self.table, &parsed.records, self.config.sample_rows);

        info!(
            "Data file has {} records across {} columns",
            parsed.records.len(),
            parsed.headers.len()
        );
        Ok(DataFileSummary {
            total_records: parsed.records.len(),
            column_count: parsed.headers.len(),
            skipped_rows: parsed.skipped_rows.len(),
            delimiter: parsed.delimiter,
            headers: parsed.headers,
            sample,
        })
    }

    pub fn validate_dictionary(&self) -> Result<DictionaryValidation> {
        quality_gate::validate_dictionary(&self.table)
    }

    /// Code file, data file pre-flight, dictionary validation; stops at the first failure
    pub fn process_brt_files(&mut self, data_content: &str, code_content: &str) -> BrtRunReport {
        let span = info_span!("process_brt_files", session = %self.session_id);
        let _enter = span.enter();
        let mut report = BrtRunReport::new(self.session_id);

        match self.process_code_file(code_content) {
            Ok(summary) => report.code_file = Some(summary),
            Err(e) => return report.fail(Stage::CodeFile, e.to_string()),
        }

        match self.process_data_file(data_content) {
            Ok(summary) => report.data_file = Some(summary),
            Err(e) => return report.fail(Stage::DataFile, e.to_string()),
        }

        match self.validate_dictionary() {
            Ok(validation) => report.validation = Some(validation),
            Err(e) => return report.fail(Stage::Validation, e.to_string()),
        }

        report.success = true;
        info!("BRT file pair passed all checks");
        report
    }

    /// Normalize every row of a data file against the loaded dictionary
    #[instrument(skip_all, fields(session = %self.session_id))]
    pub fn normalize_all(&self, data_content: &str) -> Result<Vec<NormalizedRecord>> {
        let parsed = parser::parse_data_file(data_content)?;
        let normalizer = self.normalizer();
        let records: Vec<NormalizedRecord> = parsed.records.iter().map(|r| normalizer.normalize(r)).collect();
        info!("Normalized {} records", records.len());
        Ok(records)
    }

    pub fn detect_file_type(&self, content: &str) -> BrtFileKind {
        parser::detect_file_type(content, &self.config.residential_marker)
    }

    fn normalizer(&self) -> BrtNormalizer<'_> {
        BrtNormalizer::with_vendor(&self.table, &self.config.vendor_tag)
    }
}
