// BRT decode pipeline: code dictionary, data file parsing, normalization and checks

pub mod processing;
pub mod processor;

pub use processing::{codes, normalize, parser, quality_gate};
pub use processor::{BrtProcessor, BrtRunReport, DataFileSummary, Stage};
