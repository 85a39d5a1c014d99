use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrtError {
    #[error("Code file has no '{marker}' section")]
    MarkerNotFound { marker: String },

    #[error("Code file '{marker}' section has no data line after it")]
    MissingDataLine { marker: String },

    #[error("Code file JSON could not be parsed: {0}")]
    CodeJson(#[from] serde_json::Error),

    #[error("Data file has no data rows (found {lines} non-blank line(s))")]
    NoDataRows { lines: usize },

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Code dictionary is empty: no codes were extracted from the code file")]
    EmptyDictionary,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BrtError>;
