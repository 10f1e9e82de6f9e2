use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::table::Table;

/// Loads a source file into an in-memory table
pub trait TabularSource {
    fn read(&self, path: &Path) -> Result<Table>;
}

/// Persists a finished table under its own name, replacing earlier contents
pub trait TableSink {
    fn write(&self, table: &Table) -> Result<SinkReceipt>;
}

/// What a sink wrote, for the run summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkReceipt {
    pub table: String,
    pub rows: usize,
    pub curated_path: Option<PathBuf>,
}
