use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::error::{EtlError, Result};
use crate::table::{unique_column_names, Table};

/// Integers above this cannot round-trip through an f64
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Reads the first worksheet of an xlsx/xls/xlsb/ods workbook. The first row is the header.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetReader;

impl SpreadsheetReader {
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn read_path(&self, path: &Path) -> Result<Table> {
        fs::metadata(path).map_err(|source| EtlError::SourceRead {
            path: path.to_path_buf(),
            source,
        })?;

        let spreadsheet_err = |message: String| EtlError::Spreadsheet {
            path: path.to_path_buf(),
            message,
        };

        let mut workbook = open_workbook_auto(path).map_err(|e| spreadsheet_err(e.to_string()))?;
        let sheet_names = workbook.sheet_names();
        let sheet = sheet_names
            .first()
            .ok_or_else(|| spreadsheet_err("workbook has no sheets".to_string()))?;
        let range = workbook
            .worksheet_range(sheet)
            .map_err(|e| spreadsheet_err(e.to_string()))?;

        let (height, width) = range.get_size();
        info!("Reading sheet '{}' ({} rows x {} columns)", sheet, height, width);

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sheet");
        table_from_cells(name, range.rows())
    }
}

/// Builds a table from raw cell rows; the first row becomes the header
pub fn table_from_cells<'a>(name: &str, mut rows: impl Iterator<Item = &'a [Data]>) -> Result<Table> {
    let headers: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell {
                Data::Empty => format!("Unnamed: {i}"),
                Data::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        None => return Ok(Table::empty(name)),
    };
    let headers = unique_column_names(headers);

    let mut cells: Vec<Vec<AnyValue<'static>>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (i, column) in cells.iter_mut().enumerate() {
            column.push(row.get(i).map(cell_value).unwrap_or(AnyValue::Null));
        }
    }

    let columns = headers
        .iter()
        .zip(&cells)
        .map(|(header, values)| {
            let series = Series::from_any_values(header.as_str().into(), values, false)?;
            Ok(narrow_integral_floats(series)?.into_column())
        })
        .collect::<Result<Vec<Column>>>()?;
    Ok(Table::new(name, DataFrame::new(columns)?))
}

fn cell_value(cell: &Data) -> AnyValue<'static> {
    match cell {
        Data::Empty | Data::Error(_) => AnyValue::Null,
        Data::Int(i) => AnyValue::Int64(*i),
        Data::Float(f) => AnyValue::Float64(*f),
        Data::Bool(b) => AnyValue::Boolean(*b),
        Data::String(s) => AnyValue::StringOwned(s.as_str().into()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => datetime_value(value),
            None => AnyValue::Float64(dt.as_f64()),
        },
        Data::DateTimeIso(s) => match parse_iso(s) {
            Some(value) => datetime_value(value),
            None => AnyValue::StringOwned(s.as_str().into()),
        },
        Data::DurationIso(s) => AnyValue::StringOwned(s.as_str().into()),
    }
}

fn datetime_value(value: NaiveDateTime) -> AnyValue<'static> {
    AnyValue::Datetime(value.and_utc().timestamp_millis(), TimeUnit::Milliseconds, None)
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Spreadsheets store every number as a float; columns holding only whole
/// numbers are narrowed back to integers.
fn narrow_integral_floats(series: Series) -> Result<Series> {
    if series.dtype() != &DataType::Float64 || series.null_count() == series.len() {
        return Ok(series);
    }
    let integral = series
        .f64()?
        .into_iter()
        .flatten()
        .all(|f| f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_EXACT_INTEGER);
    if !integral {
        return Ok(series);
    }
    debug!(column = %series.name(), "narrowing integral float column");
    Ok(series.cast(&DataType::Int64)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    fn fixture(file: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(file)
    }

    #[test]
    fn test_header_and_typed_cells() {
        let rows = vec![
            vec![s("IdSeller"), s("Name"), s("Wage"), Data::Empty],
            vec![Data::Float(1.0), s("Ana"), Data::Float(500.5), Data::Empty],
            vec![Data::Float(2.0), Data::Empty, Data::Float(900.0), Data::Bool(true)],
        ];
        let table = table_from_cells("Consultores", rows.iter().map(|r| r.as_slice())).unwrap();

        assert_eq!(table.columns(), vec!["IdSeller", "Name", "Wage", "Unnamed: 3"]);
        // whole-number column narrowed, fractional one kept
        assert_eq!(table.dtype("IdSeller"), DataType::Int64);
        assert_eq!(table.dtype("Wage"), DataType::Float64);
        assert_eq!(table.texts("Name"), vec![Some("Ana".to_string()), None]);
        assert_eq!(table.dtype("Unnamed: 3"), DataType::Boolean);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let rows = vec![vec![s("IdStore"), s("Name")], vec![Data::Float(1.0)]];
        let table = table_from_cells("Lojas", rows.iter().map(|r| r.as_slice())).unwrap();
        assert_eq!(table.ints("IdStore"), vec![Some(1)]);
        assert_eq!(table.texts("Name"), vec![None]);
    }

    #[test]
    fn test_iso_dates_become_datetimes() {
        let rows = vec![
            vec![s("Date")],
            vec![Data::DateTimeIso("2024-01-15T10:30:00".to_string())],
            vec![Data::DateTimeIso("2024-02-01".to_string())],
        ];
        let table = table_from_cells("Vendas", rows.iter().map(|r| r.as_slice())).unwrap();

        assert!(matches!(table.dtype("Date"), DataType::Datetime(_, _)));
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(
            table.ints("Date")[0],
            Some(expected.and_utc().timestamp_millis())
        );
    }

    #[test]
    fn test_empty_sheet_gives_empty_table() {
        let rows: Vec<Vec<Data>> = Vec::new();
        let table = table_from_cells("Metas", rows.iter().map(|r| r.as_slice())).unwrap();
        assert_eq!(table.column_count(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_reads_first_sheet_of_a_workbook() {
        let table = SpreadsheetReader.read_path(&fixture("Lojas.xlsx")).unwrap();

        assert_eq!(table.name(), "Lojas");
        assert_eq!(table.columns(), vec!["IdStore", "Name", "Opened", "Area"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.dtype("IdStore"), DataType::Int64);
        assert_eq!(table.ints("IdStore"), vec![Some(1), Some(2)]);
        assert_eq!(
            table.texts("Name"),
            vec![Some("Centro".to_string()), Some("Norte".to_string())]
        );
        assert_eq!(table.dtype("Area"), DataType::Float64);

        assert!(matches!(table.dtype("Opened"), DataType::Datetime(_, _)));
        let opened = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(table.ints("Opened")[0], Some(opened.and_utc().timestamp_millis()));
    }

    #[test]
    fn test_missing_workbook_is_a_source_read_error() {
        let err = SpreadsheetReader
            .read_path(Path::new("/nonexistent/Lojas.xlsx"))
            .unwrap_err();
        assert!(matches!(err, EtlError::SourceRead { .. }));
    }
}
