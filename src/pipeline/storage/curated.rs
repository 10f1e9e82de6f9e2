use polars::prelude::{CsvWriter, SerWriter};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;
use crate::table::{Table, DATETIME_FORMAT};

/// Writes `table` to `<dir>/<table name>.csv` with a header row and no index
/// column, replacing any previous file. Nulls become empty fields.
pub fn export_csv(dir: &Path, table: &Table) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.csv", table.name()));

    let mut file = File::create(&path)?;
    let mut frame = table.frame().clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_datetime_format(Some(DATETIME_FORMAT.to_string()))
        .finish(&mut frame)?;

    debug!("Exported {} rows to {}", table.row_count(), path.display());
    Ok(path)
}
