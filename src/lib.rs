pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod types;

pub use error::{BrtError, Result};
pub use pipeline::{BrtProcessor, BrtRunReport, DataFileSummary, Stage};
pub use types::{CodeMatch, CodedValue, RawDataRecord};
