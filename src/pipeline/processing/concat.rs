use chrono::{Duration, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::{debug, info, instrument};

use crate::error::{EtlError, Result};
use crate::table::Table;

/// Unions tables top to bottom in the given order.
///
/// The output columns are the union of the input columns in first-seen order;
/// rows from a table lacking a column get null there. No deduplication.
#[instrument(skip(tables), fields(inputs = tables.len()))]
pub fn concat(name: &str, tables: Vec<Table>) -> Result<Table> {
    let frames: Vec<LazyFrame> = tables
        .into_iter()
        .filter(|t| t.column_count() > 0)
        .map(|t| {
            debug!("Appending {} rows from {}", t.row_count(), t.name());
            t.into_frame().lazy()
        })
        .collect();
    if frames.is_empty() {
        return Ok(Table::empty(name));
    }

    let args = UnionArgs {
        to_supertypes: true,
        rechunk: true,
        ..Default::default()
    };
    let frame = concat_lf_diagonal(frames, args)?.collect()?;

    info!("Concatenated into {} ({} rows)", name, frame.height());
    Ok(Table::new(name, frame))
}

/// Unambiguous layouts, accepted in any column
const ISO_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y",
];

/// Slash layouts in preference order. One is chosen per column.
const SLASH_CONVENTIONS: &[&[&str]] = &[
    &["%m/%d/%Y %H:%M:%S", "%m/%d/%Y"],
    &["%d/%m/%Y %H:%M:%S", "%d/%m/%Y"],
];

/// Parses `column` into date-times in place, if the column exists.
///
/// Accepts existing date-times, ISO text, slash-separated text and
/// spreadsheet serial day numbers. Slash dates are read month first unless
/// some value in the column only parses day first; the choice holds for the
/// whole column. Nulls and blanks stay null; anything else is a fatal
/// `DateParse` error.
pub fn parse_date_column(table: &mut Table, column: &str) -> Result<()> {
    if !table.has_column(column) {
        debug!(table = table.name(), column, "date column absent, nothing to parse");
        return Ok(());
    }

    let series = table.frame().column(column)?.as_materialized_series().clone();
    let target = DataType::Datetime(TimeUnit::Milliseconds, None);
    let millis = match series.dtype() {
        DataType::Datetime(_, _) | DataType::Date | DataType::Null => {
            table.frame_mut().with_column(series.cast(&target)?)?;
            return Ok(());
        }
        DataType::String => text_millis(&series, column)?,
        dtype if dtype.is_integer() || dtype.is_float() => serial_millis(&series, column)?,
        _ => match (0..series.len()).find(|&i| series.get(i).is_ok_and(|v| !v.is_null())) {
            Some(row) => return Err(date_error(column, row, series.get(row)?.to_string())),
            None => vec![None; series.len()],
        },
    };

    let parsed = Series::new(column.into(), millis).cast(&target)?;
    table.frame_mut().with_column(parsed)?;
    Ok(())
}

fn text_millis(series: &Series, column: &str) -> Result<Vec<Option<i64>>> {
    let cells: Vec<Option<&str>> = series
        .str()?
        .into_iter()
        .map(|v| v.map(str::trim).filter(|s| !s.is_empty()))
        .collect();

    let attempts: Vec<std::result::Result<Vec<Option<i64>>, usize>> = SLASH_CONVENTIONS
        .iter()
        .map(|convention| parse_cells(&cells, convention))
        .collect();
    let mut last_failure = 0;
    for attempt in attempts {
        match attempt {
            Ok(millis) => return Ok(millis),
            Err(row) => last_failure = last_failure.max(row),
        }
    }
    // no convention fits every value; report where the best one stopped
    let value = cells[last_failure].unwrap_or_default().to_string();
    Err(date_error(column, last_failure, value))
}

fn parse_cells(cells: &[Option<&str>], convention: &[&str]) -> std::result::Result<Vec<Option<i64>>, usize> {
    cells
        .iter()
        .enumerate()
        .map(|(row, cell)| match cell {
            None => Ok(None),
            Some(s) => parse_text(s, convention)
                .map(|dt| Some(dt.and_utc().timestamp_millis()))
                .ok_or(row),
        })
        .collect()
}

fn parse_text(s: &str, convention: &[&str]) -> Option<NaiveDateTime> {
    ISO_FORMATS
        .iter()
        .chain(convention)
        .find_map(|fmt| {
            NaiveDateTime::parse_from_str(s, fmt).ok().or_else(|| {
                NaiveDate::parse_from_str(s, fmt)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
        })
}

fn serial_millis(series: &Series, column: &str) -> Result<Vec<Option<i64>>> {
    let days = series.cast(&DataType::Float64)?;
    days.f64()?
        .into_iter()
        .enumerate()
        .map(|(row, day)| match day {
            None => Ok(None),
            Some(d) => from_serial(d)
                .map(|dt| Some(dt.and_utc().timestamp_millis()))
                .ok_or_else(|| date_error(column, row, d.to_string())),
        })
        .collect()
}

/// Spreadsheet serial date: days since 1899-12-30, fraction is time of day
fn from_serial(days: f64) -> Option<NaiveDateTime> {
    if !days.is_finite() || days < 0.0 || days > 2_958_465.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (days * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

fn date_error(column: &str, row: usize, value: String) -> EtlError {
    EtlError::DateParse {
        column: column.to_string(),
        row,
        value,
    }
}
