use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read source '{}': {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not decode '{}' with any of the encodings {tried:?}", path.display())]
    Decode { path: PathBuf, tried: Vec<String> },

    #[error("Malformed delimited content: {0}")]
    Csv(#[from] csv::Error),

    #[error("Dataframe error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("Spreadsheet error in '{}': {message}", path.display())]
    Spreadsheet { path: PathBuf, message: String },

    #[error("Column '{column}' is required in table '{table}' but is missing")]
    MissingColumn { table: String, column: String },

    #[error("Could not parse '{value}' in column '{column}' (row {row}) as a date")]
    DateParse {
        column: String,
        row: usize,
        value: String,
    },

    #[error("{count} row(s) have no match in dimension '{dimension}'")]
    UnmatchedKeys { dimension: String, count: usize },

    #[error("Sink error: {0}")]
    Sink(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Database not found at '{}', run the ETL first", .0.display())]
    DatabaseMissing(PathBuf),
}

pub type Result<T> = std::result::Result<T, EtlError>;
