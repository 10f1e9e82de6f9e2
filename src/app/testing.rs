use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::app::ports::{SinkReceipt, TableSink, TabularSource};
use crate::error::{EtlError, Result};
use crate::table::Table;

/// Serves pre-built tables by path
#[derive(Default)]
pub struct MemorySource {
    tables: HashMap<PathBuf, Table>,
}

impl MemorySource {
    pub fn insert(&mut self, path: PathBuf, table: Table) {
        self.tables.insert(path, table);
    }
}

impl TabularSource for MemorySource {
    fn read(&self, path: &Path) -> Result<Table> {
        self.tables.get(path).cloned().ok_or_else(|| EtlError::SourceRead {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such fixture"),
        })
    }
}

/// Keeps every written table in write order
#[derive(Default)]
pub struct RecordingSink {
    tables: RefCell<Vec<Table>>,
}

impl RecordingSink {
    pub fn written(&self) -> Vec<String> {
        self.tables.borrow().iter().map(|t| t.name().to_string()).collect()
    }

    /// Last table written under `name`
    pub fn table(&self, name: &str) -> Option<Table> {
        self.tables
            .borrow()
            .iter()
            .rev()
            .find(|t| t.name() == name)
            .cloned()
    }
}

impl TableSink for RecordingSink {
    fn write(&self, table: &Table) -> Result<SinkReceipt> {
        self.tables.borrow_mut().push(table.clone());
        Ok(SinkReceipt {
            table: table.name().to_string(),
            rows: table.row_count(),
            curated_path: None,
        })
    }
}
