// Source readers: delimited text and spreadsheets into in-memory tables

pub mod delimited;
pub mod spreadsheet;

pub use delimited::DelimitedReader;
pub use spreadsheet::SpreadsheetReader;

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Spreadsheet,
    Delimited,
}

impl SourceFormat {
    /// Picks the reader from the file extension; unknown extensions are read as delimited text
    pub fn detect(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("xlsx" | "xlsm" | "xls" | "xlsb" | "xla" | "xlam" | "ods") => SourceFormat::Spreadsheet,
            _ => SourceFormat::Delimited,
        }
    }
}
