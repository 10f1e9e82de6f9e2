use std::path::Path;

use crate::app::ports::TabularSource;
use crate::config::EtlConfig;
use crate::error::Result;
use crate::pipeline::ingestion::{DelimitedReader, SourceFormat, SpreadsheetReader};
use crate::table::Table;

/// File-system implementation of TabularSource, choosing the reader by extension
pub struct FileSource {
    delimited: DelimitedReader,
    spreadsheet: SpreadsheetReader,
}

impl FileSource {
    pub fn new(delimited: DelimitedReader) -> Self {
        Self {
            delimited,
            spreadsheet: SpreadsheetReader,
        }
    }

    pub fn from_config(etl: &EtlConfig) -> Result<Self> {
        Ok(Self::new(DelimitedReader::new(&etl.encodings, etl.delimiter)?))
    }
}

impl TabularSource for FileSource {
    fn read(&self, path: &Path) -> Result<Table> {
        match SourceFormat::detect(path) {
            SourceFormat::Spreadsheet => self.spreadsheet.read_path(path),
            SourceFormat::Delimited => self.delimited.read_path(path),
        }
    }
}
