use std::path::{Path, PathBuf};
use tracing::info;

use crate::app::ports::{SinkReceipt, TableSink};
use crate::error::Result;
use crate::pipeline::storage::{export_csv, SqliteStore};
use crate::table::Table;

/// Writes each table to SQLite (full replace) and mirrors it as a curated CSV
pub struct WarehouseSink {
    store: SqliteStore,
    curated_dir: PathBuf,
}

impl WarehouseSink {
    pub fn new(store: SqliteStore, curated_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            curated_dir: curated_dir.into(),
        }
    }

    pub fn open(database: &Path, curated_dir: &Path) -> Result<Self> {
        Ok(Self::new(SqliteStore::open(database)?, curated_dir))
    }
}

impl TableSink for WarehouseSink {
    fn write(&self, table: &Table) -> Result<SinkReceipt> {
        let rows = self.store.replace_table(table)?;
        let path = export_csv(&self.curated_dir, table)?;
        info!("{} loaded ({} rows) and exported to {}", table.name(), rows, path.display());
        println!("✅ {} loaded and exported ({} rows)", table.name(), rows);
        Ok(SinkReceipt {
            table: table.name().to_string(),
            rows,
            curated_path: Some(path),
        })
    }
}
