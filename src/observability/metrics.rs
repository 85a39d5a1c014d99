//! Metrics for the BRT decode pipeline
//!
//! Recording goes through the `metrics` facade; without an installed recorder
//! every call is a no-op, so library users pay nothing unless they opt in.

use std::fmt;
use std::sync::OnceLock;

/// Enum representing all metric names used in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Code dictionary metrics
    CodesLoadSuccess,
    CodesLoadError,
    CodesExtracted,
    CodesCategoriesFound,
    CodesLoadDuration,

    // Data file metrics
    DataParseSuccess,
    DataParseError,
    DataRecordsParsed,
    DataRowsSkipped,

    // Lookup and normalize metrics
    LookupHits,
    LookupMisses,
    NormalizeRecordsProcessed,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::CodesLoadSuccess => "brt_codes_load_success_total",
            MetricName::CodesLoadError => "brt_codes_load_error_total",
            MetricName::CodesExtracted => "brt_codes_extracted",
            MetricName::CodesCategoriesFound => "brt_codes_categories_found",
            MetricName::CodesLoadDuration => "brt_codes_load_duration_seconds",

            MetricName::DataParseSuccess => "brt_data_parse_success_total",
            MetricName::DataParseError => "brt_data_parse_error_total",
            MetricName::DataRecordsParsed => "brt_data_records_parsed_total",
            MetricName::DataRowsSkipped => "brt_data_rows_skipped_total",

            MetricName::LookupHits => "brt_lookup_hits_total",
            MetricName::LookupMisses => "brt_lookup_misses_total",
            MetricName::NormalizeRecordsProcessed => "brt_normalize_records_processed_total",
        }
    }

    /// Get all metric names as an iterator
    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            CodesLoadSuccess,
            CodesLoadError,
            CodesExtracted,
            CodesCategoriesFound,
            CodesLoadDuration,
            DataParseSuccess,
            DataParseError,
            DataRecordsParsed,
            DataRowsSkipped,
            LookupHits,
            LookupMisses,
            NormalizeRecordsProcessed,
        ]
        .into_iter()
    }
}

static METRICS_HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Install a Prometheus recorder for this process. Safe to call more than once.
pub fn init() -> Result<(), String> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    let _ = METRICS_HANDLE.set(handle);
    tracing::debug!("Metrics recorder installed");
    Ok(())
}

/// Render the current metrics snapshot in Prometheus text format
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

// ============================================================================
// Code Dictionary Metrics
// ============================================================================

pub mod codes {
    use super::MetricName;

    pub fn load_success(codes: usize, categories: usize) {
        ::metrics::counter!(MetricName::CodesLoadSuccess.as_str()).increment(1);
        ::metrics::gauge!(MetricName::CodesExtracted.as_str()).set(codes as f64);
        ::metrics::gauge!(MetricName::CodesCategoriesFound.as_str()).set(categories as f64);
    }

    pub fn load_error() {
        ::metrics::counter!(MetricName::CodesLoadError.as_str()).increment(1);
    }

    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::CodesLoadDuration.as_str()).record(secs);
    }
}

// ============================================================================
// Data File Metrics
// ============================================================================

pub mod data {
    use super::MetricName;

    pub fn parse_success(records: usize) {
        ::metrics::counter!(MetricName::DataParseSuccess.as_str()).increment(1);
        ::metrics::counter!(MetricName::DataRecordsParsed.as_str()).increment(records as u64);
    }

    pub fn parse_error() {
        ::metrics::counter!(MetricName::DataParseError.as_str()).increment(1);
    }

    pub fn rows_skipped(count: usize) {
        if count > 0 {
            ::metrics::counter!(MetricName::DataRowsSkipped.as_str()).increment(count as u64);
        }
    }
}

// ============================================================================
// Lookup / Normalize Metrics
// ============================================================================

pub mod normalize {
    use super::MetricName;

    pub fn lookup(category: &str, hit: bool) {
        let name = if hit { MetricName::LookupHits } else { MetricName::LookupMisses };
        ::metrics::counter!(name.as_str(), "category" => category.to_string()).increment(1);
    }

    pub fn record_processed() {
        ::metrics::counter!(MetricName::NormalizeRecordsProcessed.as_str()).increment(1);
    }
}
