use polars::prelude::*;
use std::collections::HashMap;

use crate::error::{EtlError, Result};

/// Text layout used whenever a date-time leaves the pipeline (SQLite, CSV, console)
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A named dataframe. The name follows the table from the source file stem
/// to the destination table in the store.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    frame: DataFrame,
}

impl Table {
    pub fn new(name: impl Into<String>, frame: DataFrame) -> Self {
        Self {
            name: name.into(),
            frame,
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, DataFrame::empty())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut DataFrame {
        &mut self.frame
    }

    pub fn into_parts(self) -> (String, DataFrame) {
        (self.name, self.frame)
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn row_count(&self) -> usize {
        self.frame.height()
    }

    pub fn column_count(&self) -> usize {
        self.frame.width()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn columns(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.get_column_index(name).is_some()
    }

    /// Fails with `MissingColumn` when the caller cannot proceed without `name`
    pub fn require_column(&self, name: &str) -> Result<()> {
        if self.has_column(name) {
            Ok(())
        } else {
            Err(EtlError::MissingColumn {
                table: self.name.clone(),
                column: name.to_string(),
            })
        }
    }
}

/// De-duplicates header names the way spreadsheet tools do: `a`, `a.1`, `a.2`
pub fn unique_column_names(names: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        if !seen.contains_key(&name) {
            seen.insert(name.clone(), 0);
            out.push(name);
            continue;
        }
        let mut candidate;
        loop {
            let n = seen.entry(name.clone()).or_insert(0);
            *n += 1;
            candidate = format!("{}.{}", name, n);
            if !seen.contains_key(&candidate) {
                break;
            }
        }
        seen.insert(candidate.clone(), 0);
        out.push(candidate);
    }
    out
}

#[cfg(test)]
impl Table {
    /// Column cast to integers, for assertions
    pub(crate) fn ints(&self, column: &str) -> Vec<Option<i64>> {
        let series = self
            .frame
            .column(column)
            .unwrap()
            .as_materialized_series()
            .cast(&DataType::Int64)
            .unwrap();
        series.i64().unwrap().into_iter().collect()
    }

    /// Column cast to text, for assertions
    pub(crate) fn texts(&self, column: &str) -> Vec<Option<String>> {
        let series = self
            .frame
            .column(column)
            .unwrap()
            .as_materialized_series()
            .cast(&DataType::String)
            .unwrap();
        series
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    pub(crate) fn dtype(&self, column: &str) -> DataType {
        self.frame.column(column).unwrap().dtype().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_column_names_suffixes_repeats() {
        let names = vec!["a", "b", "a", "a", "a.1"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(unique_column_names(names), vec!["a", "b", "a.1", "a.2", "a.1.1"]);
    }

    #[test]
    fn test_require_column_names_the_table() {
        let table = Table::new("Consultores", df!("IdSeller" => [1i64]).unwrap());

        assert!(table.require_column("IdSeller").is_ok());
        let err = table.require_column("Wage").unwrap_err();
        assert!(matches!(err, EtlError::MissingColumn { ref table, ref column }
            if table == "Consultores" && column == "Wage"));
    }

    #[test]
    fn test_with_name_keeps_the_frame() {
        let table = Table::new("Lojas", df!("IdStore" => [1i64, 2]).unwrap()).with_name("dim_lojas");
        assert_eq!(table.name(), "dim_lojas");
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.columns(), vec!["IdStore"]);
    }
}
