use chrono::{DateTime, NaiveDate};
use polars::prelude::{AnyValue, DataType, TimeUnit};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::table::{Table, DATETIME_FORMAT};

/// SQLite-backed relational store with full-replace table writes
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        info!("Opening SQLite database at {}", path.display());
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Drops `table` if present, recreates it from the column contents and
    /// inserts every row. No index column is written. Returns the row count.
    #[instrument(skip_all, fields(table = table.name()))]
    pub fn replace_table(&self, table: &Table) -> Result<usize> {
        let name = quote_ident(table.name());
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {name};"))?;

        if table.column_count() == 0 {
            warn!("{} has no columns, nothing to create", table.name());
            return Ok(0);
        }

        let frame = table.frame();
        let column_defs: Vec<String> = frame
            .get_columns()
            .iter()
            .map(|c| format!("{} {}", quote_ident(c.name()), column_affinity(c.dtype())))
            .collect();
        let create = format!("CREATE TABLE {} ({})", name, column_defs.join(", "));
        debug!("{}", create);
        self.conn.execute_batch(&create)?;

        let placeholders = vec!["?"; table.column_count()].join(", ");
        let insert = format!("INSERT INTO {name} VALUES ({placeholders})");

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&insert)?;
            for i in 0..frame.height() {
                let row = frame
                    .get_columns()
                    .iter()
                    .map(|c| c.get(i).map(sql_value))
                    .collect::<polars::prelude::PolarsResult<Vec<_>>>()?;
                stmt.execute(params_from_iter(row))?;
            }
        }
        tx.commit()?;

        Ok(table.row_count())
    }
}

/// SQL type for a column of the given dataframe type
fn column_affinity(dtype: &DataType) -> &'static str {
    match dtype {
        DataType::Boolean => "BIGINT",
        DataType::Date | DataType::Datetime(_, _) => "TIMESTAMP",
        d if d.is_integer() => "BIGINT",
        d if d.is_float() => "FLOAT",
        _ => "TEXT",
    }
}

fn sql_value(value: AnyValue<'_>) -> SqlValue {
    match value {
        AnyValue::Null => SqlValue::Null,
        AnyValue::Boolean(b) => SqlValue::Integer(i64::from(b)),
        AnyValue::Float32(f) if f.is_nan() => SqlValue::Null,
        AnyValue::Float64(f) if f.is_nan() => SqlValue::Null,
        AnyValue::Float32(f) => SqlValue::Real(f64::from(f)),
        AnyValue::Float64(f) => SqlValue::Real(f),
        AnyValue::String(s) => SqlValue::Text(s.to_string()),
        AnyValue::StringOwned(s) => SqlValue::Text(s.to_string()),
        AnyValue::Datetime(v, unit, _) => timestamp_text(v, unit),
        AnyValue::Date(days) => NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| SqlValue::Text(dt.format(DATETIME_FORMAT).to_string()))
            .unwrap_or(SqlValue::Null),
        other if other.dtype().is_integer() => other
            .extract::<i64>()
            .map(SqlValue::Integer)
            .unwrap_or_else(|| SqlValue::Text(other.to_string())),
        other => SqlValue::Text(other.to_string()),
    }
}

const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn timestamp_text(value: i64, unit: TimeUnit) -> SqlValue {
    let parsed = match unit {
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
    };
    match parsed {
        Some(dt) => SqlValue::Text(dt.naive_utc().format(DATETIME_FORMAT).to_string()),
        None => SqlValue::Null,
    }
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
